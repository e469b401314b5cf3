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

//! Runtime helper for running a worker loop on its own thread.

use crate::observability::events;
use std::future::Future;
use std::thread;
use tokio::runtime::Builder;
use tracing::debug;

pub(crate) const DEFAULT_WORKER_THREAD_NAME: &str = "feed-worker";
/// Linux truncates thread names beyond this length.
pub(crate) const WORKER_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "worker_runtime";

/// Join handle plus the thread label used in logs.
pub(crate) struct WorkerHandle {
    worker_thread: String,
    join_handle: thread::JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    /// Blocks until the worker loop returns.
    pub(crate) fn join(self) {
        if self.join_handle.join().is_err() {
            tracing::error!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                worker_thread = self.worker_thread.as_str(),
                "worker thread panicked"
            );
        }
    }
}

/// Builds a Linux-safe thread name from a prefix and a free-form label.
pub(crate) fn worker_thread_name(prefix: &str, label: &str) -> String {
    let suffix: String = label
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
        .collect();
    let name: String = format!("{prefix}{suffix}")
        .chars()
        .take(WORKER_THREAD_NAME_MAX_LEN)
        .collect();
    if name.len() > prefix.len() {
        name
    } else {
        DEFAULT_WORKER_THREAD_NAME.to_string()
    }
}

/// Spawns a dedicated thread with a current-thread runtime and drives `run_loop` on it.
pub(crate) fn spawn_worker_loop<F, Fut>(thread_name: String, run_loop: F) -> WorkerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "spawning worker runtime thread"
    );

    let join_handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create worker Tokio runtime");

            runtime.block_on(run_loop());
        })
        .expect("Failed to spawn worker runtime thread");

    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "worker runtime thread started"
    );

    WorkerHandle {
        worker_thread: thread_name,
        join_handle,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        spawn_worker_loop, worker_thread_name, DEFAULT_WORKER_THREAD_NAME,
        WORKER_THREAD_NAME_MAX_LEN,
    };
    use std::sync::mpsc;

    #[test]
    fn thread_name_keeps_prefix_and_linux_safe_length() {
        let name = worker_thread_name("feed-egress-", "channel_with_a_long_name");

        assert!(name.starts_with("feed-egress-"));
        assert_eq!(name.len(), WORKER_THREAD_NAME_MAX_LEN);
    }

    #[test]
    fn thread_name_falls_back_when_label_has_no_usable_chars() {
        assert_eq!(worker_thread_name("feed-", "***"), DEFAULT_WORKER_THREAD_NAME);
    }

    #[test]
    fn worker_loop_runs_on_named_thread() {
        let (tx, rx) = mpsc::channel();

        let handle = spawn_worker_loop("feed-test".to_string(), move || async move {
            tx.send(std::thread::current().name().map(str::to_string))
                .expect("receiver alive");
        });

        assert_eq!(handle.worker_thread(), "feed-test");
        assert_eq!(
            rx.recv().expect("worker ran"),
            Some("feed-test".to_string())
        );
        handle.join();
    }
}
