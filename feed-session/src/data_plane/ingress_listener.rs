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

//! Channel listener adapter that hands inbound traffic to the sequencer.

use crate::channel::ChannelListener;
use crate::control_plane::channel_table::ChannelId;
use crate::message::ChannelMessage;
use crate::observability::events;
use crate::runtime::sequencer::{ChannelEvent, SessionEvent};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, Level};

const COMPONENT: &str = "ingress_listener";

/// Listener bound to one connection attempt of one channel.
#[derive(Clone)]
pub(crate) struct ChannelIngressListener {
    channel: ChannelId,
    channel_name: String,
    epoch: u64,
    events: UnboundedSender<SessionEvent>,
}

impl ChannelIngressListener {
    pub(crate) fn new(
        channel: ChannelId,
        channel_name: &str,
        epoch: u64,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            channel,
            channel_name: channel_name.to_string(),
            epoch,
            events,
        }
    }

    fn enqueue(&self, event: ChannelEvent) {
        let sent = self.events.send(SessionEvent::Channel {
            channel: self.channel,
            epoch: self.epoch,
            event,
        });
        if let Err(err) = sent {
            error!(
                event = events::INGRESS_ENQUEUE_FAILED,
                component = COMPONENT,
                channel = self.channel_name.as_str(),
                epoch = self.epoch,
                err = %err,
                "unable to hand channel traffic to the sequencer"
            );
        }
    }
}

#[async_trait]
impl ChannelListener for ChannelIngressListener {
    async fn on_receive(&self, message: ChannelMessage) {
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::INGRESS_RECEIVE,
                component = COMPONENT,
                channel = self.channel_name.as_str(),
                epoch = self.epoch,
                message = ?message,
                "received channel message"
            );
        }
        self.enqueue(ChannelEvent::Message(message));
    }

    async fn on_disconnect(&self, reason: String) {
        self.enqueue(ChannelEvent::Down { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::ChannelIngressListener;
    use crate::channel::ChannelListener;
    use crate::control_plane::channel_table::ChannelId;
    use crate::message::{ChannelMessage, StreamStatus};
    use crate::runtime::sequencer::{ChannelEvent, SessionEvent};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn traffic_is_tagged_with_channel_and_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = ChannelIngressListener::new(ChannelId(1), "b", 7, tx);

        listener
            .on_receive(ChannelMessage::LoginRefresh(StreamStatus::open_ok("ok")))
            .await;
        listener.on_disconnect("reset".to_string()).await;

        let Some(SessionEvent::Channel {
            channel,
            epoch,
            event: ChannelEvent::Message(ChannelMessage::LoginRefresh(_)),
        }) = rx.recv().await
        else {
            panic!("login refresh expected");
        };
        assert_eq!((channel, epoch), (ChannelId(1), 7));
        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::Channel {
                event: ChannelEvent::Down { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn closed_sequencer_queue_is_tolerated() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let listener = ChannelIngressListener::new(ChannelId(0), "a", 1, tx);

        listener.on_disconnect("gone".to_string()).await;
    }
}
