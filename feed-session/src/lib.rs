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

//! # feed-session
//!
//! `feed-session` is the consumer side of a market-data session that spans one
//! or more provider channels and presents them to the application as a single
//! logical source of services and item streams.
//!
//! Typical usage is API-first and centered on [`ConsumerSession`]: supply one
//! [`ChannelTransport`] per configured channel, connect, then open items with
//! [`ConsumerSession::subscribe`]. The session picks a channel for every item,
//! rewrites provider service identity to session-wide ids, and moves items to
//! another channel when their channel or service goes away.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use feed_session::{
//!     ChannelListener, ChannelRequest, ChannelTransport, ConsumerClient, ConsumerSession,
//!     Domain, ReqMsg, SessionConfig, TransportError,
//! };
//!
//! struct Transport;
//!
//! #[async_trait]
//! impl ChannelTransport for Transport {
//!     async fn connect(&self, _listener: Arc<dyn ChannelListener>) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!     async fn send(&self, _request: ChannelRequest) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!     async fn close(&self) {}
//! }
//!
//! struct Printer;
//! impl ConsumerClient for Printer {}
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = SessionConfig::from_json5_str(
//!     r#"{
//!         name: "quick-start",
//!         channels: [ { name: "channel_a" }, { name: "channel_b" } ],
//!         service_lists: [ { name: "FEEDS", services: ["IDN", "ELEKTRON"] } ],
//!     }"#,
//! )
//! .unwrap();
//!
//! let session = ConsumerSession::builder(config)
//!     .channel("channel_a", Arc::new(Transport))
//!     .channel("channel_b", Arc::new(Transport))
//!     .connect()
//!     .await
//!     .unwrap();
//!
//! let handle = session
//!     .subscribe(
//!         ReqMsg::new(Domain::MARKET_PRICE, "IBM.N").service_list("FEEDS"),
//!         Arc::new(Printer),
//!     )
//!     .unwrap();
//! session.unregister(handle);
//! session.close().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`ConsumerSession`] validates calls and enqueues them
//! - Session core: the one owner of session state, fed by the sequencer
//! - Control plane: channel table, login aggregation and warm standby groups
//! - Routing: directory aggregation, service lists, item table and recovery policy
//! - Data plane: per-channel egress workers, ingress listeners, callback dispatch
//! - Runtime: sequencer loop, timers and worker thread boundaries
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Every event carries an
//! `event` name from [`observability::events`] and a `component` field.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod channel;
pub use channel::{ChannelListener, ChannelState, ChannelTransport};

mod client;
pub use client::{ConsumerClient, ConsumerEvent};

mod config;
pub use config::{
    AdminControl, AdminControlConfig, ChannelConfig, LoginConfig, ReconnectConfig,
    ServiceListConfig, SessionConfig, StandbyMode, TimeoutConfig, WarmStandbyConfig,
};

mod consumer_session;
pub use consumer_session::{BatchHandles, ConsumerSession, ConsumerSessionBuilder};

mod control_plane;
pub use control_plane::channel_table::{ChannelInfo, ChannelLoginState};

mod data_plane;

mod error;
pub use error::{ConfigError, SessionError, TransportError, UsageError};

mod message;
pub use message::{
    AckMsg, ChannelMessage, ChannelRequest, DataState, Domain, GenericMsg, Handle, ItemRequest,
    LoginRequest, Payload, PostMsg, ProviderMsg, Qos, Rate, RefreshMsg, ReqMsg, StandbyRole,
    StatusCode, StatusMsg, StreamId, StreamState, StreamStatus, SubmitMsg, Timeliness, UpdateMsg,
};

#[doc(hidden)]
pub mod observability;
mod routing;
mod runtime;

mod service;
pub use service::{
    DirectoryEntry, DirectoryMsg, EntryAction, GroupStatus, ServiceAction, ServiceInfo,
    ServiceState, ServiceView,
};

mod session_core;
mod snapshot;
