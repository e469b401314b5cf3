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
    ChannelListener, ChannelMessage, ChannelRequest, ChannelTransport, DataState, DirectoryMsg,
    ItemRequest, ProviderMsg, RefreshMsg, ServiceAction, ServiceInfo, StatusCode, StatusMsg,
    StreamId, StreamState, StreamStatus, TransportError, UpdateMsg,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

pub const LOGIN_ACCEPTED_TEXT: &str = "Login accepted";
pub const ITEM_OK_TEXT: &str = "All is well";

/// How the provider answers a login request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginReply {
    Accept,
    Suspect(String),
    Deny(String),
    Silent,
}

/// How the provider answers an item request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemReply {
    Refresh,
    Status(StreamStatus),
    Silent,
}

struct ProviderState {
    listener: Option<Arc<dyn ChannelListener>>,
    accepting: bool,
    connects: u32,
    login_reply: LoginReply,
    /// `None` leaves directory requests unanswered.
    directory: Option<Vec<ServiceInfo>>,
    item_reply: ItemReply,
    item_overrides: HashMap<String, ItemReply>,
    open_streams: HashMap<StreamId, ItemRequest>,
}

/// In-memory provider behind one channel.
///
/// Answers login, directory and item requests according to its settings and
/// records every request it receives. Tests drive connection loss and
/// unsolicited traffic through the `push_*` and `disconnect` methods.
pub struct SimulatedProvider {
    name: String,
    state: Mutex<ProviderState>,
    requests: Recorder<ChannelRequest>,
}

impl SimulatedProvider {
    pub fn new(name: &str, services: Vec<ServiceInfo>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::new(ProviderState {
                listener: None,
                accepting: true,
                connects: 0,
                login_reply: LoginReply::Accept,
                directory: Some(services),
                item_reply: ItemReply::Refresh,
                item_overrides: HashMap::new(),
                open_streams: HashMap::new(),
            }),
            requests: Recorder::new(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_login_reply(&self, reply: LoginReply) {
        self.lock().login_reply = reply;
    }

    pub fn set_item_reply(&self, reply: ItemReply) {
        self.lock().item_reply = reply;
    }

    pub fn set_item_reply_for(&self, item_name: &str, reply: ItemReply) {
        self.lock()
            .item_overrides
            .insert(item_name.to_string(), reply);
    }

    /// Replaces the services advertised in answer to later directory requests.
    pub fn set_directory_reply(&self, services: Option<Vec<ServiceInfo>>) {
        self.lock().directory = services;
    }

    /// While false, connection attempts fail.
    pub fn set_accepting(&self, accepting: bool) {
        self.lock().accepting = accepting;
    }

    pub fn connects(&self) -> u32 {
        self.lock().connects
    }

    pub fn is_connected(&self) -> bool {
        self.lock().listener.is_some()
    }

    pub fn requests(&self) -> Vec<ChannelRequest> {
        self.requests.snapshot()
    }

    pub fn item_requests(&self) -> Vec<ItemRequest> {
        self.requests
            .snapshot()
            .into_iter()
            .filter_map(|request| match request {
                ChannelRequest::Item(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    /// Waits until `count` recorded requests match and returns all matches.
    pub async fn wait_for_requests<F>(&self, count: usize, predicate: F) -> Vec<ChannelRequest>
    where
        F: Fn(&ChannelRequest) -> bool,
    {
        self.requests.wait_for(count, predicate).await
    }

    /// Waits for the `count`-th request for `item_name` and returns it.
    pub async fn wait_for_item_request(&self, item_name: &str, count: usize) -> ItemRequest {
        let matches = self
            .wait_for_requests(count, |request| {
                matches!(request, ChannelRequest::Item(item) if item.name == item_name)
            })
            .await;
        match &matches[count - 1] {
            ChannelRequest::Item(item) => item.clone(),
            other => panic!("{}: unexpected request {other:?}", self.name),
        }
    }

    pub async fn expect_no_requests<F>(&self, period: Duration, predicate: F)
    where
        F: Fn(&ChannelRequest) -> bool,
    {
        self.requests.expect_quiet(period, predicate).await
    }

    /// Stream id of the open stream for `item_name`.
    pub fn stream_for(&self, item_name: &str) -> Option<StreamId> {
        self.lock()
            .open_streams
            .values()
            .find(|request| request.name == item_name)
            .map(|request| request.stream_id)
    }

    /// Drops the connection and reports the loss to the session.
    pub async fn disconnect(&self, reason: &str) {
        let listener = {
            let mut state = self.lock();
            state.open_streams.clear();
            state.listener.take()
        };
        if let Some(listener) = listener {
            debug!("{}: disconnecting: {reason}", self.name);
            listener.on_disconnect(reason.to_string()).await;
        }
    }

    pub async fn push_login_status(&self, status: StreamStatus) {
        self.deliver(ChannelMessage::LoginStatus(status)).await;
    }

    pub async fn push_directory_refresh(&self, services: Vec<ServiceInfo>) {
        self.deliver(ChannelMessage::Directory(DirectoryMsg::Refresh(services)))
            .await;
    }

    pub async fn push_directory_update(&self, actions: Vec<ServiceAction>) {
        self.deliver(ChannelMessage::Directory(DirectoryMsg::Update(actions)))
            .await;
    }

    pub async fn push_directory_status(&self, status: StreamStatus) {
        self.deliver(ChannelMessage::Directory(DirectoryMsg::Status(status)))
            .await;
    }

    pub async fn push_item(&self, message: ProviderMsg) {
        self.deliver(ChannelMessage::Item(message)).await;
    }

    /// Sends an update on the open stream for `item_name`.
    pub async fn push_update(&self, item_name: &str) {
        let stream_id = self.expect_stream(item_name);
        self.push_item(ProviderMsg::Update(UpdateMsg {
            stream_id,
            name: Some(item_name.to_string()),
            ..Default::default()
        }))
        .await;
    }

    /// Sends a stream status on the open stream for `item_name`.
    pub async fn push_item_status(&self, item_name: &str, status: StreamStatus) {
        let stream_id = self.expect_stream(item_name);
        self.push_item(ProviderMsg::Status(StatusMsg {
            stream_id,
            name: Some(item_name.to_string()),
            state: Some(status),
            ..Default::default()
        }))
        .await;
    }

    fn expect_stream(&self, item_name: &str) -> StreamId {
        self.stream_for(item_name)
            .unwrap_or_else(|| panic!("{}: no open stream for {item_name}", self.name))
    }

    async fn deliver(&self, message: ChannelMessage) {
        let listener = self.lock().listener.clone();
        match listener {
            Some(listener) => listener.on_receive(message).await,
            None => debug!("{}: not connected, dropping {message:?}", self.name),
        }
    }

    /// Builds the provider's answer and updates stream bookkeeping.
    fn reply_to(state: &mut ProviderState, request: &ChannelRequest) -> Option<ChannelMessage> {
        match request {
            ChannelRequest::Login(_) => match &state.login_reply {
                LoginReply::Accept => Some(ChannelMessage::LoginRefresh(StreamStatus::open_ok(
                    LOGIN_ACCEPTED_TEXT,
                ))),
                LoginReply::Suspect(text) => Some(ChannelMessage::LoginRefresh(
                    StreamStatus::open_suspect(text.as_str()),
                )),
                LoginReply::Deny(text) => Some(ChannelMessage::LoginStatus(
                    StreamStatus::closed_suspect(text.as_str()).with_code(StatusCode::NotAuthorized),
                )),
                LoginReply::Silent => None,
            },
            ChannelRequest::Directory { .. } => state
                .directory
                .clone()
                .map(|services| ChannelMessage::Directory(DirectoryMsg::Refresh(services))),
            ChannelRequest::Item(item) => {
                state.open_streams.insert(item.stream_id, item.clone());
                let reply = state
                    .item_overrides
                    .get(&item.name)
                    .unwrap_or(&state.item_reply)
                    .clone();
                item_reply(item, reply)
            }
            ChannelRequest::Close { stream_id } => {
                state.open_streams.remove(stream_id);
                None
            }
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn item_reply(item: &ItemRequest, reply: ItemReply) -> Option<ChannelMessage> {
    let message = match reply {
        ItemReply::Refresh => {
            let stream_state = if item.streaming {
                StreamState::Open
            } else {
                StreamState::NonStreaming
            };
            ProviderMsg::Refresh(RefreshMsg {
                stream_id: item.stream_id,
                domain: item.domain,
                name: Some(item.name.clone()),
                service_id: item.service_id,
                state: StreamStatus::new(stream_state, DataState::Ok, StatusCode::None, ITEM_OK_TEXT),
                solicited: true,
                complete: true,
                qos: item.qos,
                ..Default::default()
            })
        }
        ItemReply::Status(status) => ProviderMsg::Status(StatusMsg {
            stream_id: item.stream_id,
            domain: item.domain,
            name: Some(item.name.clone()),
            service_id: item.service_id,
            state: Some(status),
            ..Default::default()
        }),
        ItemReply::Silent => return None,
    };
    Some(ChannelMessage::Item(message))
}

#[async_trait]
impl ChannelTransport for SimulatedProvider {
    async fn connect(&self, listener: Arc<dyn ChannelListener>) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.connects += 1;
        if !state.accepting {
            return Err(TransportError::ConnectFailed(format!(
                "{} refused connection",
                self.name
            )));
        }
        state.listener = Some(listener);
        state.open_streams.clear();
        Ok(())
    }

    async fn send(&self, request: ChannelRequest) -> Result<(), TransportError> {
        let (listener, reply) = {
            let mut state = self.lock();
            let Some(listener) = state.listener.clone() else {
                return Err(TransportError::NotConnected);
            };
            (listener, Self::reply_to(&mut state, &request))
        };
        debug!("{}: received {request:?}", self.name);
        self.requests.record(request);
        if let Some(reply) = reply {
            listener.on_receive(reply).await;
        }
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.lock();
        state.listener = None;
        state.open_streams.clear();
    }
}
