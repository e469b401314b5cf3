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

//! Message model exchanged between the application, the session and providers.
//!
//! Payloads stay opaque: the session only looks at stream ids, service
//! identity and stream state. Every message kind is a closed sum type so the
//! session core can match it exhaustively.

use crate::service::DirectoryEntry;
use std::fmt::{Display, Formatter};

/// Application-visible stream handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) u64);

impl Handle {
    /// Handle of the aggregated login stream.
    pub const LOGIN: Handle = Handle(1);
    pub(crate) const FIRST_ITEM: u64 = 2;

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-local stream id. The same id is used on every channel an item is bound to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub i32);

impl StreamId {
    pub const LOGIN: StreamId = StreamId(1);
    pub const DIRECTORY: StreamId = StreamId(2);
    pub(crate) const FIRST_ITEM: i32 = 5;
}

impl Display for StreamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message-model domain of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Domain(pub u8);

impl Domain {
    pub const LOGIN: Domain = Domain(1);
    pub const SOURCE: Domain = Domain(4);
    pub const DICTIONARY: Domain = Domain(5);
    pub const MARKET_PRICE: Domain = Domain(6);
    pub const MARKET_BY_ORDER: Domain = Domain(7);
    pub const MARKET_BY_PRICE: Domain = Domain(8);
    pub const SYMBOL_LIST: Domain = Domain(10);
}

impl Default for Domain {
    fn default() -> Self {
        Domain::MARKET_PRICE
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StreamState {
    #[default]
    Open,
    NonStreaming,
    ClosedRecover,
    Closed,
    ClosedRedirected,
}

impl StreamState {
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            StreamState::ClosedRecover | StreamState::Closed | StreamState::ClosedRedirected
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataState {
    NoChange,
    #[default]
    Ok,
    Suspect,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatusCode {
    #[default]
    None,
    Timeout,
    NotFound,
    NotEntitled,
    NotAuthorized,
    SourceUnknown,
    UsageError,
    Preempted,
}

/// Stream state carried by refresh and status messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStatus {
    pub stream_state: StreamState,
    pub data_state: DataState,
    pub code: StatusCode,
    pub text: String,
}

impl StreamStatus {
    pub fn new(
        stream_state: StreamState,
        data_state: DataState,
        code: StatusCode,
        text: impl Into<String>,
    ) -> Self {
        Self {
            stream_state,
            data_state,
            code,
            text: text.into(),
        }
    }

    pub fn open_ok(text: impl Into<String>) -> Self {
        Self::new(StreamState::Open, DataState::Ok, StatusCode::None, text)
    }

    pub fn open_suspect(text: impl Into<String>) -> Self {
        Self::new(StreamState::Open, DataState::Suspect, StatusCode::None, text)
    }

    pub fn closed_suspect(text: impl Into<String>) -> Self {
        Self::new(StreamState::Closed, DataState::Suspect, StatusCode::None, text)
    }

    pub fn closed_recover(text: impl Into<String>) -> Self {
        Self::new(
            StreamState::ClosedRecover,
            DataState::Suspect,
            StatusCode::None,
            text,
        )
    }

    pub fn with_code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.stream_state.is_closed()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Timeliness {
    #[default]
    Realtime,
    Delayed(u32),
    DelayedUnknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rate {
    #[default]
    TickByTick,
    JitConflated,
    TimeConflated(u32),
}

/// Quality of service advertised by a service or required by a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Qos {
    pub timeliness: Timeliness,
    pub rate: Rate,
}

impl Qos {
    pub fn new(timeliness: Timeliness, rate: Rate) -> Self {
        Self { timeliness, rate }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    Empty,
    Opaque(Vec<u8>),
    /// Aggregated directory content delivered on source-domain streams.
    Directory(Vec<DirectoryEntry>),
}

/// Subscription request issued by the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReqMsg {
    pub domain: Domain,
    pub name: String,
    pub service_name: Option<String>,
    pub service_id: Option<u16>,
    pub service_list: Option<String>,
    pub qos: Option<Qos>,
    pub private_stream: bool,
    pub streaming: bool,
}

impl ReqMsg {
    pub fn new(domain: Domain, name: impl Into<String>) -> Self {
        Self {
            domain,
            name: name.into(),
            service_name: None,
            service_id: None,
            service_list: None,
            qos: None,
            private_stream: false,
            streaming: true,
        }
    }

    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn service_id(mut self, service_id: u16) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn service_list(mut self, service_list: impl Into<String>) -> Self {
        self.service_list = Some(service_list.into());
        self
    }

    pub fn qos(mut self, qos: Qos) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn private_stream(mut self, private_stream: bool) -> Self {
        self.private_stream = private_stream;
        self
    }

    pub fn non_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshMsg {
    pub stream_id: StreamId,
    pub domain: Domain,
    pub name: Option<String>,
    pub service_id: Option<u16>,
    pub service_name: Option<String>,
    pub state: StreamStatus,
    pub solicited: bool,
    pub complete: bool,
    pub qos: Option<Qos>,
    pub item_group: Option<Vec<u8>>,
    pub payload: Payload,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateMsg {
    pub stream_id: StreamId,
    pub domain: Domain,
    pub name: Option<String>,
    pub service_id: Option<u16>,
    pub service_name: Option<String>,
    pub payload: Payload,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusMsg {
    pub stream_id: StreamId,
    pub domain: Domain,
    pub name: Option<String>,
    pub service_id: Option<u16>,
    pub service_name: Option<String>,
    pub state: Option<StreamStatus>,
    pub item_group: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericMsg {
    pub stream_id: StreamId,
    pub domain: Domain,
    pub name: Option<String>,
    pub service_id: Option<u16>,
    pub service_name: Option<String>,
    pub payload: Payload,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostMsg {
    pub stream_id: StreamId,
    pub domain: Domain,
    pub name: Option<String>,
    pub service_id: Option<u16>,
    pub service_name: Option<String>,
    pub post_id: u32,
    pub ack: bool,
    pub payload: Payload,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AckMsg {
    pub stream_id: StreamId,
    pub ack_id: u32,
    pub nack_code: Option<StatusCode>,
    pub text: Option<String>,
    pub service_id: Option<u16>,
    pub service_name: Option<String>,
}

/// Messages a provider delivers on an item stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderMsg {
    Refresh(RefreshMsg),
    Update(UpdateMsg),
    Status(StatusMsg),
    Generic(GenericMsg),
    Ack(AckMsg),
}

impl ProviderMsg {
    pub fn stream_id(&self) -> StreamId {
        match self {
            ProviderMsg::Refresh(msg) => msg.stream_id,
            ProviderMsg::Update(msg) => msg.stream_id,
            ProviderMsg::Status(msg) => msg.stream_id,
            ProviderMsg::Generic(msg) => msg.stream_id,
            ProviderMsg::Ack(msg) => msg.stream_id,
        }
    }

    /// Stream state carried by the message, if any.
    pub fn state(&self) -> Option<&StreamStatus> {
        match self {
            ProviderMsg::Refresh(msg) => Some(&msg.state),
            ProviderMsg::Status(msg) => msg.state.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ProviderMsg::Refresh(_) => "refresh",
            ProviderMsg::Update(_) => "update",
            ProviderMsg::Status(_) => "status",
            ProviderMsg::Generic(_) => "generic",
            ProviderMsg::Ack(_) => "ack",
        }
    }

    /// Replaces provider-local service identity with the session-wide one.
    pub(crate) fn rewrite_service(&mut self, service_id: Option<u16>, service_name: Option<String>) {
        let (id_slot, name_slot) = match self {
            ProviderMsg::Refresh(msg) => (&mut msg.service_id, &mut msg.service_name),
            ProviderMsg::Update(msg) => (&mut msg.service_id, &mut msg.service_name),
            ProviderMsg::Status(msg) => (&mut msg.service_id, &mut msg.service_name),
            ProviderMsg::Generic(msg) => (&mut msg.service_id, &mut msg.service_name),
            ProviderMsg::Ack(msg) => (&mut msg.service_id, &mut msg.service_name),
        };
        *id_slot = service_id;
        *name_slot = service_name;
    }
}

/// Off-stream messages the application submits on an open handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitMsg {
    Post(PostMsg),
    Generic(GenericMsg),
}

impl SubmitMsg {
    pub(crate) fn service_selector(&self) -> (Option<&str>, Option<u16>) {
        match self {
            SubmitMsg::Post(msg) => (msg.service_name.as_deref(), msg.service_id),
            SubmitMsg::Generic(msg) => (msg.service_name.as_deref(), msg.service_id),
        }
    }

    /// Builds the wire request for one channel with the provider-local service id.
    pub(crate) fn to_channel_request(
        &self,
        stream_id: StreamId,
        provider_service_id: Option<u16>,
    ) -> ChannelRequest {
        match self {
            SubmitMsg::Post(msg) => ChannelRequest::Post(PostMsg {
                stream_id,
                service_id: provider_service_id,
                service_name: None,
                ..msg.clone()
            }),
            SubmitMsg::Generic(msg) => ChannelRequest::Generic(GenericMsg {
                stream_id,
                service_id: provider_service_id,
                service_name: None,
                ..msg.clone()
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StandbyRole {
    Active,
    Standby,
}

/// Login request sent to every channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginRequest {
    pub user_name: String,
    pub application_id: Option<String>,
    pub position: Option<String>,
    pub role: Option<StandbyRole>,
}

/// Item request as it travels on one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRequest {
    pub stream_id: StreamId,
    pub domain: Domain,
    pub name: String,
    pub service_id: Option<u16>,
    pub qos: Option<Qos>,
    pub private_stream: bool,
    pub streaming: bool,
}

/// Outbound traffic handed to a channel transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelRequest {
    Login(LoginRequest),
    Directory { stream_id: StreamId },
    Item(ItemRequest),
    Close { stream_id: StreamId },
    Post(PostMsg),
    Generic(GenericMsg),
    ConsumerStatus { service_id: u16, role: StandbyRole },
}

impl ChannelRequest {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ChannelRequest::Login(_) => "login",
            ChannelRequest::Directory { .. } => "directory",
            ChannelRequest::Item(_) => "item",
            ChannelRequest::Close { .. } => "close",
            ChannelRequest::Post(_) => "post",
            ChannelRequest::Generic(_) => "generic",
            ChannelRequest::ConsumerStatus { .. } => "consumer_status",
        }
    }
}

/// Inbound traffic reported by a channel transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelMessage {
    LoginRefresh(StreamStatus),
    LoginStatus(StreamStatus),
    Directory(crate::service::DirectoryMsg),
    Item(ProviderMsg),
}

#[cfg(test)]
mod tests {
    use super::{ProviderMsg, RefreshMsg, StreamId, StreamState, StreamStatus, SubmitMsg};
    use crate::message::{ChannelRequest, PostMsg};

    #[test]
    fn rewrite_service_replaces_provider_identity() {
        let mut msg = ProviderMsg::Refresh(RefreshMsg {
            stream_id: StreamId(5),
            service_id: Some(300),
            service_name: Some("PROVIDER_NAME".to_string()),
            ..Default::default()
        });

        msg.rewrite_service(Some(1), Some("ALIAS".to_string()));

        let ProviderMsg::Refresh(refresh) = msg else {
            panic!("variant should be preserved");
        };
        assert_eq!(refresh.service_id, Some(1));
        assert_eq!(refresh.service_name.as_deref(), Some("ALIAS"));
    }

    #[test]
    fn closed_states_are_reported_as_closed() {
        assert!(StreamStatus::closed_suspect("x").is_closed());
        assert!(StreamStatus::closed_recover("x").is_closed());
        assert!(!StreamStatus::open_suspect("x").is_closed());
        assert!(!StreamState::NonStreaming.is_closed());
    }

    #[test]
    fn submit_translation_drops_session_service_name() {
        let submit = SubmitMsg::Post(PostMsg {
            service_name: Some("IDN".to_string()),
            post_id: 7,
            ..Default::default()
        });

        let ChannelRequest::Post(post) = submit.to_channel_request(StreamId(9), Some(42)) else {
            panic!("post should stay a post");
        };
        assert_eq!(post.stream_id, StreamId(9));
        assert_eq!(post.service_id, Some(42));
        assert_eq!(post.service_name, None);
        assert_eq!(post.post_id, 7);
    }
}
