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

//! Timer bookkeeping for the sequencer.
//!
//! A timer is a tokio sleep that enqueues [`SessionEvent::Timer`] with its id.
//! Cancelling only forgets the id; a fired timer whose id is no longer live is
//! ignored by the core.

use crate::control_plane::channel_table::ChannelId;
use crate::message::Handle;
use crate::runtime::sequencer::SessionEvent;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TimerKind {
    Login,
    Directory(ChannelId),
    Reconnect(ChannelId),
    ReconnectWindow(ChannelId),
    Request(Handle),
}

/// Live timers; at most one per kind.
#[derive(Default)]
pub(crate) struct TimerTable {
    next_id: u64,
    live: HashMap<TimerId, TimerKind>,
    by_kind: HashMap<TimerKind, TimerId>,
}

impl TimerTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a timer of `kind`, replacing any live one of the same kind.
    pub(crate) fn start(&mut self, kind: TimerKind) -> TimerId {
        self.cancel(kind);
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.live.insert(id, kind);
        self.by_kind.insert(kind, id);
        id
    }

    pub(crate) fn is_running(&self, kind: TimerKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Consumes a fired timer; `None` when it was cancelled or replaced.
    pub(crate) fn fire(&mut self, id: TimerId) -> Option<TimerKind> {
        let kind = self.live.remove(&id)?;
        self.by_kind.remove(&kind);
        Some(kind)
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) {
        if let Some(id) = self.by_kind.remove(&kind) {
            self.live.remove(&id);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.live.clear();
        self.by_kind.clear();
    }
}

/// Schedules the wake-up for a registered timer on the current runtime.
pub(crate) fn schedule(id: TimerId, after: Duration, events: UnboundedSender<SessionEvent>) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        // The sequencer may already be gone during shutdown.
        let _ = events.send(SessionEvent::Timer(id));
    });
}

#[cfg(test)]
mod tests {
    use super::{schedule, TimerKind, TimerTable};
    use crate::control_plane::channel_table::ChannelId;
    use crate::message::Handle;
    use crate::runtime::sequencer::SessionEvent;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn restarting_a_kind_invalidates_the_previous_id() {
        let mut timers = TimerTable::new();
        let first = timers.start(TimerKind::Directory(ChannelId(0)));
        let second = timers.start(TimerKind::Directory(ChannelId(0)));

        assert_ne!(first, second);
        assert_eq!(timers.fire(first), None);
        assert_eq!(
            timers.fire(second),
            Some(TimerKind::Directory(ChannelId(0)))
        );
        assert_eq!(timers.fire(second), None);
    }

    #[test]
    fn cancel_only_affects_matching_kind() {
        let mut timers = TimerTable::new();
        let login = timers.start(TimerKind::Login);
        timers.start(TimerKind::Reconnect(ChannelId(1)));

        timers.cancel(TimerKind::Reconnect(ChannelId(1)));

        assert!(!timers.is_running(TimerKind::Reconnect(ChannelId(1))));
        assert_eq!(timers.fire(login), Some(TimerKind::Login));
    }

    #[test]
    fn fired_timer_is_no_longer_running() {
        let mut timers = TimerTable::new();
        let request = TimerKind::Request(Handle(7));
        let id = timers.start(request);
        assert!(timers.is_running(request));

        assert_eq!(timers.fire(id), Some(request));
        assert!(!timers.is_running(request));

        let restarted = timers.start(request);
        timers.cancel(request);
        assert_eq!(timers.fire(restarted), None);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_timer_enqueues_its_id() {
        let mut timers = TimerTable::new();
        let id = timers.start(TimerKind::Login);
        let (tx, mut rx) = mpsc::unbounded_channel();

        schedule(id, Duration::from_millis(50), tx);

        let Some(SessionEvent::Timer(fired)) = rx.recv().await else {
            panic!("timer event expected");
        };
        assert_eq!(fired, id);
    }
}
