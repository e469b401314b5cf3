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

//! Delivers session output to application callbacks on a dedicated worker.

use crate::client::{ConsumerClient, ConsumerEvent};
use crate::message::{Handle, ProviderMsg};
use crate::observability::{events, fields};
use crate::runtime::worker_runtime::{spawn_worker_loop, WorkerHandle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

const DISPATCH_THREAD_NAME: &str = "feed-dispatch";
const COMPONENT: &str = "notification_dispatcher";

/// One message for one application handle.
pub(crate) struct Notification {
    pub(crate) handle: Handle,
    pub(crate) client: Arc<dyn ConsumerClient>,
    pub(crate) message: ProviderMsg,
    pub(crate) event: ConsumerEvent,
    /// Last message the handle will ever receive.
    pub(crate) terminal: bool,
}

/// Handles the application may still receive callbacks for.
///
/// Shared between the facade, which drops a handle on unregister, and the
/// dispatcher, which drops it after a terminal message.
#[derive(Clone, Default)]
pub(crate) struct LiveHandles {
    inner: Arc<Mutex<HashSet<Handle>>>,
}

impl LiveHandles {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, handle: Handle) {
        self.lock().insert(handle);
    }

    pub(crate) fn remove(&self, handle: Handle) -> bool {
        self.lock().remove(&handle)
    }

    /// The login stream stays live for the whole session.
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        handle == Handle::LOGIN || self.lock().contains(&handle)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Handle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn spawn_notification_dispatcher(
    notifications: UnboundedReceiver<Notification>,
    live: LiveHandles,
) -> WorkerHandle {
    spawn_worker_loop(DISPATCH_THREAD_NAME.to_string(), move || {
        dispatch_loop(notifications, live)
    })
}

pub(crate) async fn dispatch_loop(
    mut notifications: UnboundedReceiver<Notification>,
    live: LiveHandles,
) {
    while let Some(notification) = notifications.recv().await {
        if !live.contains(notification.handle) {
            debug!(
                event = events::DISPATCH_DROP_UNREGISTERED,
                component = COMPONENT,
                handle = notification.handle.value(),
                kind = notification.message.kind(),
                "dropping message for handle that is no longer registered"
            );
            continue;
        }
        if notification.terminal && notification.handle != Handle::LOGIN {
            live.remove(notification.handle);
        }
        deliver(notification).await;
    }

    info!(
        event = events::DISPATCH_QUEUE_CLOSED,
        component = COMPONENT,
        reason = fields::REASON_QUEUE_CLOSED,
        "notification queue closed; stopping dispatcher"
    );
}

async fn deliver(notification: Notification) {
    let Notification {
        client,
        message,
        event,
        ..
    } = notification;
    match message {
        ProviderMsg::Refresh(msg) => client.on_refresh(msg, &event).await,
        ProviderMsg::Update(msg) => client.on_update(msg, &event).await,
        ProviderMsg::Status(msg) => client.on_status(msg, &event).await,
        ProviderMsg::Generic(msg) => client.on_generic(msg, &event).await,
        ProviderMsg::Ack(msg) => client.on_ack(msg, &event).await,
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch_loop, LiveHandles, Notification};
    use crate::client::{ConsumerClient, ConsumerEvent};
    use crate::message::{Handle, ProviderMsg, StatusMsg, StreamStatus, UpdateMsg};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingClient {
        seen: Mutex<Vec<(u64, &'static str)>>,
    }

    impl CountingClient {
        fn seen(&self) -> Vec<(u64, &'static str)> {
            self.seen.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl ConsumerClient for CountingClient {
        async fn on_update(&self, _msg: UpdateMsg, event: &ConsumerEvent) {
            let handle = event.handle.map(|handle| handle.value()).unwrap_or_default();
            self.seen.lock().expect("lock").push((handle, "update"));
        }

        async fn on_status(&self, _msg: StatusMsg, event: &ConsumerEvent) {
            let handle = event.handle.map(|handle| handle.value()).unwrap_or_default();
            self.seen.lock().expect("lock").push((handle, "status"));
        }
    }

    fn notification(
        client: &Arc<CountingClient>,
        handle: Handle,
        message: ProviderMsg,
        terminal: bool,
    ) -> Notification {
        Notification {
            handle,
            client: client.clone(),
            message,
            event: ConsumerEvent {
                handle: Some(handle),
                ..Default::default()
            },
            terminal,
        }
    }

    #[tokio::test]
    async fn unregistered_handles_receive_nothing() {
        let client = Arc::new(CountingClient::default());
        let live = LiveHandles::new();
        live.insert(Handle(2));
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(notification(&client, Handle(2), ProviderMsg::Update(UpdateMsg::default()), false))
            .expect("queue open");
        tx.send(notification(&client, Handle(3), ProviderMsg::Update(UpdateMsg::default()), false))
            .expect("queue open");
        drop(tx);
        dispatch_loop(rx, live).await;

        assert_eq!(client.seen(), vec![(2, "update")]);
    }

    #[tokio::test]
    async fn terminal_message_is_the_last_one_delivered() {
        let client = Arc::new(CountingClient::default());
        let live = LiveHandles::new();
        live.insert(Handle(2));
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = ProviderMsg::Status(StatusMsg {
            state: Some(StreamStatus::closed_suspect("gone")),
            ..Default::default()
        });

        tx.send(notification(&client, Handle(2), closed, true))
            .expect("queue open");
        tx.send(notification(&client, Handle(2), ProviderMsg::Update(UpdateMsg::default()), false))
            .expect("queue open");
        drop(tx);
        dispatch_loop(rx, live.clone()).await;

        assert_eq!(client.seen(), vec![(2, "status")]);
        assert!(!live.contains(Handle(2)));
    }

    #[test]
    fn login_handle_is_always_live() {
        let live = LiveHandles::new();

        assert!(live.contains(Handle::LOGIN));
        assert!(!live.remove(Handle::LOGIN));
        assert!(live.contains(Handle::LOGIN));
    }
}
