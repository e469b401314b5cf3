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

//! Application callback surface.

use crate::message::{AckMsg, GenericMsg, Handle, RefreshMsg, StatusMsg, UpdateMsg};
use async_trait::async_trait;

/// Context delivered with every callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumerEvent {
    pub handle: Option<Handle>,
    /// Session-wide service name, or the service list name the item was opened with.
    pub service_name: Option<String>,
    pub service_id: Option<u16>,
    pub channel_name: Option<String>,
}

/// Receives messages for the handles it was registered with.
///
/// Callbacks run on the session's dispatch thread, one at a time, in the
/// order the session produced them.
#[async_trait]
pub trait ConsumerClient: Send + Sync {
    async fn on_refresh(&self, _msg: RefreshMsg, _event: &ConsumerEvent) {}

    async fn on_update(&self, _msg: UpdateMsg, _event: &ConsumerEvent) {}

    async fn on_status(&self, _msg: StatusMsg, _event: &ConsumerEvent) {}

    async fn on_generic(&self, _msg: GenericMsg, _event: &ConsumerEvent) {}

    async fn on_ack(&self, _msg: AckMsg, _event: &ConsumerEvent) {}
}
