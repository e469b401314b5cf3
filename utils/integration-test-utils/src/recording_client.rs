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

use crate::recorder::Recorder;
use async_trait::async_trait;
use feed_session::{
    AckMsg, ConsumerClient, ConsumerEvent, GenericMsg, Handle, ProviderMsg, RefreshMsg, StatusMsg,
    StreamStatus, UpdateMsg,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One callback as the application saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub message: ProviderMsg,
    pub event: ConsumerEvent,
}

impl RecordedEvent {
    pub fn handle(&self) -> Option<Handle> {
        self.event.handle
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self.message, ProviderMsg::Refresh(_))
    }

    pub fn is_status(&self) -> bool {
        matches!(self.message, ProviderMsg::Status(_))
    }

    pub fn is_update(&self) -> bool {
        matches!(self.message, ProviderMsg::Update(_))
    }

    pub fn state(&self) -> Option<&StreamStatus> {
        self.message.state()
    }

    pub fn text(&self) -> Option<&str> {
        self.state().map(|state| state.text.as_str())
    }

    pub fn refresh(&self) -> Option<&RefreshMsg> {
        match &self.message {
            ProviderMsg::Refresh(refresh) => Some(refresh),
            _ => None,
        }
    }
}

/// Consumer client that keeps every callback for later assertions.
pub struct RecordingClient {
    name: String,
    events: Recorder<RecordedEvent>,
}

impl RecordingClient {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            events: Recorder::new(name),
        })
    }

    pub fn history(&self) -> Vec<RecordedEvent> {
        self.events.snapshot()
    }

    pub fn history_for(&self, handle: Handle) -> Vec<RecordedEvent> {
        self.events
            .matching(|recorded| recorded.handle() == Some(handle))
    }

    /// Waits for the first event matching `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> RecordedEvent
    where
        F: Fn(&RecordedEvent) -> bool,
    {
        self.wait_for_count(1, predicate).await.remove(0)
    }

    /// Waits until `count` events match and returns all of them in order.
    pub async fn wait_for_count<F>(&self, count: usize, predicate: F) -> Vec<RecordedEvent>
    where
        F: Fn(&RecordedEvent) -> bool,
    {
        self.events.wait_for(count, predicate).await
    }

    pub async fn expect_quiet<F>(&self, period: Duration, predicate: F)
    where
        F: Fn(&RecordedEvent) -> bool,
    {
        self.events.expect_quiet(period, predicate).await
    }

    fn record(&self, message: ProviderMsg, event: &ConsumerEvent) {
        debug!("{} received {message:?} for {event:?}", self.name);
        self.events.record(RecordedEvent {
            message,
            event: event.clone(),
        });
    }
}

#[async_trait]
impl ConsumerClient for RecordingClient {
    async fn on_refresh(&self, msg: RefreshMsg, event: &ConsumerEvent) {
        self.record(ProviderMsg::Refresh(msg), event);
    }

    async fn on_update(&self, msg: UpdateMsg, event: &ConsumerEvent) {
        self.record(ProviderMsg::Update(msg), event);
    }

    async fn on_status(&self, msg: StatusMsg, event: &ConsumerEvent) {
        self.record(ProviderMsg::Status(msg), event);
    }

    async fn on_generic(&self, msg: GenericMsg, event: &ConsumerEvent) {
        self.record(ProviderMsg::Generic(msg), event);
    }

    async fn on_ack(&self, msg: AckMsg, event: &ConsumerEvent) {
        self.record(ProviderMsg::Ack(msg), event);
    }
}
