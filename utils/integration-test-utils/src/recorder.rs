/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::fixtures::WAIT_TIMEOUT;
use async_broadcast::{broadcast, InactiveReceiver, RecvError, Sender};
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

const WAKEUP_CAPACITY: usize = 64;

/// Append-only history that async waiters can block on.
pub(crate) struct Recorder<T> {
    label: String,
    history: Mutex<Vec<T>>,
    wakeups: Sender<()>,
    _keep_open: InactiveReceiver<()>,
}

impl<T: Clone + Debug> Recorder<T> {
    pub(crate) fn new(label: &str) -> Self {
        let (mut wakeups, receiver) = broadcast(WAKEUP_CAPACITY);
        wakeups.set_overflow(true);
        Self {
            label: label.to_string(),
            history: Mutex::new(Vec::new()),
            wakeups,
            _keep_open: receiver.deactivate(),
        }
    }

    pub(crate) fn record(&self, entry: T) {
        self.lock().push(entry);
        // No active waiter is fine.
        let _ = self.wakeups.try_broadcast(());
    }

    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub(crate) fn matching<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.lock()
            .iter()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect()
    }

    /// Waits until at least `count` recorded entries match, then returns all matches.
    pub(crate) async fn wait_for<F>(&self, count: usize, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut wakeups = self.wakeups.new_receiver();
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            let matches = self.matching(&predicate);
            if matches.len() >= count {
                return matches;
            }
            match timeout_at(deadline, wakeups.recv()).await {
                Ok(Ok(())) | Ok(Err(RecvError::Overflowed(_))) => {}
                Ok(Err(RecvError::Closed)) => panic!("{}: recorder closed", self.label),
                Err(_) => panic!(
                    "{}: timed out waiting for {count} matching entries, saw {}: {:#?}",
                    self.label,
                    matches.len(),
                    self.snapshot()
                ),
            }
        }
    }

    /// Asserts that no new matching entry shows up during `period`.
    pub(crate) async fn expect_quiet<F>(&self, period: Duration, predicate: F)
    where
        F: Fn(&T) -> bool,
    {
        let before = self.matching(&predicate).len();
        tokio::time::sleep(period).await;
        let after = self.matching(&predicate);
        assert_eq!(
            after.len(),
            before,
            "{}: unexpected entries: {:#?}",
            self.label,
            &after[before.min(after.len())..]
        );
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
