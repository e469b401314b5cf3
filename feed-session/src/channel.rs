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

//! Transport-facing seam for one channel.

use crate::error::TransportError;
use crate::message::{ChannelMessage, ChannelRequest};
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Session-side state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Initializing,
    Active,
    DownReconnecting,
    Closed,
}

impl Display for ChannelState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChannelState::Initializing => "initializing",
            ChannelState::Active => "active",
            ChannelState::DownReconnecting => "down_reconnecting",
            ChannelState::Closed => "closed",
        };
        write!(f, "{label}")
    }
}

/// Raw connection to one provider.
///
/// `connect` resolves once the connection is usable; later connection loss is
/// reported through [`ChannelListener::on_disconnect`]. Every call is made from
/// the channel's own worker thread, never concurrently.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn connect(&self, listener: Arc<dyn ChannelListener>) -> Result<(), TransportError>;

    async fn send(&self, request: ChannelRequest) -> Result<(), TransportError>;

    async fn close(&self);
}

/// Callbacks a transport uses to hand inbound traffic to the session.
#[async_trait]
pub trait ChannelListener: Send + Sync {
    async fn on_receive(&self, message: ChannelMessage);

    async fn on_disconnect(&self, reason: String);
}
