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

//! Synchronous session state machine.
//!
//! [`SessionCore`] owns the channel table, login aggregation, directory,
//! item table, standby groups and timers. It never performs I/O: every entry
//! point records [`Effect`]s that the sequencer executes afterwards. The flows
//! are split by concern into child modules that extend `SessionCore`.

mod directory_flow;
mod item_flow;
mod login_flow;
mod recovery_flow;
mod standby_flow;

use crate::channel::ChannelState;
use crate::client::{ConsumerClient, ConsumerEvent};
use crate::config::SessionConfig;
use crate::control_plane::channel_table::{ChannelId, ChannelInfo, ChannelTable};
use crate::control_plane::login::{LoginController, SESSION_CLOSED_TEXT};
use crate::control_plane::warm_standby::WarmStandbyGroups;
use crate::data_plane::notification_dispatcher::Notification;
use crate::error::{SessionError, UsageError};
use crate::message::{
    ChannelMessage, ChannelRequest, DataState, Handle, LoginRequest, ProviderMsg, ReqMsg,
    StatusCode, StatusMsg, StreamState, StreamStatus, SubmitMsg,
};
use crate::observability::{events, fields};
use crate::routing::directory::DirectoryAggregator;
use crate::routing::item_table::{ItemEntry, ItemTable};
use crate::routing::resolution::Selector;
use crate::routing::service_list::ServiceListResolver;
use crate::runtime::sequencer::ChannelEvent;
use crate::runtime::timers::{TimerId, TimerKind, TimerTable};
use crate::snapshot::SessionSnapshots;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const COMPONENT: &str = "session_core";
pub(crate) const BATCH_CLOSED_TEXT: &str = "Stream closed for batch";

/// Work the sequencer performs on behalf of the core.
pub(crate) enum Effect {
    Connect { channel: ChannelId, epoch: u64 },
    Send {
        channel: ChannelId,
        request: ChannelRequest,
    },
    CloseChannel(ChannelId),
    StartTimer { id: TimerId, after: Duration },
    Notify(Notification),
    ConnectComplete(Result<(), SessionError>),
    /// Stop every worker after the effects queued before it.
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConnectPhase {
    Idle,
    Pending,
    Done,
}

pub(crate) struct SessionCore {
    config: SessionConfig,
    channels: ChannelTable,
    login: LoginController,
    login_client: Option<Arc<dyn ConsumerClient>>,
    directory: DirectoryAggregator,
    service_lists: ServiceListResolver,
    standby: WarmStandbyGroups,
    items: ItemTable,
    timers: TimerTable,
    snapshots: SessionSnapshots,
    connect: ConnectPhase,
    closed: bool,
    effects: Vec<Effect>,
}

impl SessionCore {
    pub(crate) fn new(
        config: SessionConfig,
        login_client: Option<Arc<dyn ConsumerClient>>,
        snapshots: SessionSnapshots,
    ) -> Self {
        let channels = ChannelTable::new(&config.channels);
        let standby = WarmStandbyGroups::new(&config.warm_standby_groups, &channels);
        Self {
            login: LoginController::new(&config.login),
            directory: DirectoryAggregator::new(channels.len()),
            service_lists: ServiceListResolver::new(&config.service_lists),
            standby,
            channels,
            login_client,
            items: ItemTable::new(),
            timers: TimerTable::new(),
            snapshots,
            connect: ConnectPhase::Idle,
            closed: false,
            effects: Vec::new(),
            config,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Connects every channel and arms the login timeout.
    pub(crate) fn start(&mut self) {
        if self.connect != ConnectPhase::Idle {
            return;
        }
        self.connect = ConnectPhase::Pending;
        for channel in self.channels.ids() {
            self.connect_channel(channel);
        }
        let after = self.config.timeouts.login();
        self.start_timer(TimerKind::Login, after);
    }

    pub(crate) fn on_channel_event(&mut self, channel: ChannelId, epoch: u64, event: ChannelEvent) {
        if self.closed {
            return;
        }
        let entry = self.channels.get(channel);
        if entry.epoch != epoch || entry.is_closed() {
            debug!(
                event = events::CHANNEL_STALE_EVENT_DROPPED,
                component = COMPONENT,
                channel = entry.name.as_str(),
                epoch,
                current_epoch = entry.epoch,
                reason = fields::REASON_STALE_EPOCH,
                "dropping event from a previous connection"
            );
            return;
        }

        match event {
            ChannelEvent::Up => self.on_channel_up(channel),
            ChannelEvent::Down { reason } => self.on_channel_down(channel, reason),
            ChannelEvent::Message(message) => {
                if entry.state != ChannelState::Active {
                    debug!(
                        event = events::CHANNEL_STALE_EVENT_DROPPED,
                        component = COMPONENT,
                        channel = entry.name.as_str(),
                        state = %entry.state,
                        "dropping message for inactive channel"
                    );
                    return;
                }
                match message {
                    ChannelMessage::LoginRefresh(status) => {
                        self.on_login_response(channel, status, true)
                    }
                    ChannelMessage::LoginStatus(status) => {
                        self.on_login_response(channel, status, false)
                    }
                    ChannelMessage::Directory(msg) => self.on_directory_message(channel, msg),
                    ChannelMessage::Item(msg) => self.on_item_message(channel, msg),
                }
            }
        }
    }

    pub(crate) fn on_timer(&mut self, id: TimerId) {
        if self.closed {
            return;
        }
        let Some(kind) = self.timers.fire(id) else {
            return;
        };
        match kind {
            TimerKind::Login => self.on_login_timeout(),
            TimerKind::Directory(channel) => self.on_directory_timeout(channel),
            TimerKind::Reconnect(channel) => self.on_reconnect_timer(channel),
            TimerKind::ReconnectWindow(channel) => self.on_reconnect_window(channel),
            TimerKind::Request(handle) => self.on_request_timeout(handle),
        }
    }

    pub(crate) fn subscribe(
        &mut self,
        handle: Handle,
        request: ReqMsg,
        selector: Selector,
        client: Arc<dyn ConsumerClient>,
    ) {
        if self.closed {
            self.reject_closed(handle, &request, client);
            return;
        }
        self.open_item(handle, request, selector, client);
    }

    /// Splits a batch into independent items, then closes the batch stream.
    pub(crate) fn subscribe_batch(
        &mut self,
        batch: Handle,
        items: Vec<(Handle, ReqMsg)>,
        selector: Selector,
        client: Arc<dyn ConsumerClient>,
    ) {
        let domain = items
            .first()
            .map(|(_, request)| request.domain)
            .unwrap_or_default();
        for (handle, request) in items {
            self.subscribe(handle, request, selector.clone(), client.clone());
        }
        let status = ProviderMsg::Status(StatusMsg {
            domain,
            state: Some(StreamStatus::new(
                StreamState::Closed,
                DataState::Ok,
                StatusCode::None,
                BATCH_CLOSED_TEXT,
            )),
            ..Default::default()
        });
        self.notify_direct(batch, client, status, ConsumerEvent::default());
    }

    pub(crate) fn unregister(&mut self, handle: Handle) {
        if self.closed || handle == Handle::LOGIN {
            return;
        }
        self.close_item(handle);
    }

    pub(crate) fn submit(&mut self, handle: Handle, msg: SubmitMsg) -> Result<(), UsageError> {
        if handle == Handle::LOGIN {
            self.submit_on_login(msg)
        } else {
            self.submit_on_item(handle, msg)
        }
    }

    /// Replaces the login request and re-sends it on every active channel.
    pub(crate) fn reissue_login(&mut self, request: LoginRequest) {
        if self.closed {
            return;
        }
        self.login.replace_request(request);
        let active: Vec<ChannelId> = self
            .channels
            .iter()
            .filter(|entry| entry.state == ChannelState::Active)
            .map(|entry| entry.id)
            .collect();
        for channel in active {
            self.send_login(channel);
        }
    }

    /// Emits terminal statuses for every open stream and closes every channel.
    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        info!(
            event = events::SESSION_CLOSE,
            component = COMPONENT,
            open_items = self.items.len(),
            "closing consumer session"
        );

        for handle in self.items.handles() {
            self.notify_item_status(
                handle,
                StreamStatus::closed_suspect(SESSION_CLOSED_TEXT),
            );
        }
        let login_status = self.login.session_closed_status();
        self.notify_login(ProviderMsg::Status(login_status), None);

        for channel in self.channels.ids() {
            let entry = self.channels.get_mut(channel);
            if entry.state != ChannelState::Closed {
                entry.state = ChannelState::Closed;
                self.effects.push(Effect::CloseChannel(channel));
            }
        }
        self.timers.clear();

        if self.connect == ConnectPhase::Pending {
            self.effects
                .push(Effect::ConnectComplete(Err(SessionError::SessionClosed)));
        }
        self.connect = ConnectPhase::Done;
        self.closed = true;
        self.effects.push(Effect::Shutdown);
    }

    /// Publishes directory and channel views when they changed.
    pub(crate) fn publish_snapshots(&self) {
        let views = self.directory.views();
        if self.snapshots.directory.load().value != views {
            self.snapshots.directory.store(views);
        }
        let channels = self.channel_infos();
        if self.snapshots.channels.load().value != channels {
            self.snapshots.channels.store(channels);
        }
    }

    fn channel_infos(&self) -> Vec<ChannelInfo> {
        self.channels
            .iter()
            .map(|entry| ChannelInfo {
                name: entry.name.clone(),
                state: entry.state,
                login_state: entry.login,
                standby_role: self.standby.login_role(entry.id),
                services: if self.directory.is_refreshed(entry.id) {
                    self.directory.channel_service_names(entry.id)
                } else {
                    Vec::new()
                },
                reconnect_attempts: entry.reconnect_attempts,
            })
            .collect()
    }

    fn connect_channel(&mut self, channel: ChannelId) {
        let entry = self.channels.get_mut(channel);
        let epoch = entry.begin_connection();
        debug!(
            event = events::CHANNEL_CONNECT_START,
            component = COMPONENT,
            channel = entry.name.as_str(),
            epoch,
            "requesting channel connect"
        );
        self.effects.push(Effect::Connect { channel, epoch });
    }

    fn send(&mut self, channel: ChannelId, request: ChannelRequest) {
        self.effects.push(Effect::Send { channel, request });
    }

    fn start_timer(&mut self, kind: TimerKind, after: Duration) {
        let id = self.timers.start(kind);
        self.effects.push(Effect::StartTimer { id, after });
    }

    /// Channels that may carry items, with `prefer` moved to the front.
    fn candidates(&self, prefer: Option<ChannelId>) -> Vec<ChannelId> {
        let mut candidates: Vec<ChannelId> = self
            .channels
            .iter()
            .filter(|entry| entry.is_logged_in() && self.standby.carries_items(entry.id))
            .map(|entry| entry.id)
            .collect();
        if let Some(position) =
            prefer.and_then(|prefer| candidates.iter().position(|channel| *channel == prefer))
        {
            let preferred = candidates.remove(position);
            candidates.insert(0, preferred);
        }
        candidates
    }

    fn notify_login(&mut self, message: ProviderMsg, channel: Option<ChannelId>) {
        let Some(client) = self.login_client.clone() else {
            return;
        };
        let terminal = message.state().is_some_and(StreamStatus::is_closed);
        let event = ConsumerEvent {
            handle: Some(Handle::LOGIN),
            channel_name: channel.map(|channel| self.channels.name(channel).to_string()),
            ..Default::default()
        };
        self.effects.push(Effect::Notify(Notification {
            handle: Handle::LOGIN,
            client,
            message,
            event,
            terminal,
        }));
    }

    /// Delivers to an open item; a terminal message also forgets the item.
    fn notify_item(&mut self, handle: Handle, message: ProviderMsg, terminal: bool) {
        let Some(entry) = self.items.get(handle) else {
            return;
        };
        let event = self.item_event(entry);
        let client = entry.client.clone();
        if terminal {
            self.forget_item(handle);
        }
        self.effects.push(Effect::Notify(Notification {
            handle,
            client,
            message,
            event,
            terminal,
        }));
    }

    fn notify_item_status(&mut self, handle: Handle, state: StreamStatus) {
        let Some(entry) = self.items.get(handle) else {
            return;
        };
        let terminal = state.is_closed();
        let message = status_message(entry, state);
        self.notify_item(handle, message, terminal);
    }

    /// Delivers to a handle that has no item entry.
    fn notify_direct(
        &mut self,
        handle: Handle,
        client: Arc<dyn ConsumerClient>,
        message: ProviderMsg,
        event: ConsumerEvent,
    ) {
        self.effects.push(Effect::Notify(Notification {
            handle,
            client,
            message,
            event: ConsumerEvent {
                handle: Some(handle),
                ..event
            },
            terminal: true,
        }));
    }

    fn reject_closed(&mut self, handle: Handle, request: &ReqMsg, client: Arc<dyn ConsumerClient>) {
        let status = ProviderMsg::Status(StatusMsg {
            domain: request.domain,
            name: Some(request.name.clone()),
            state: Some(StreamStatus::closed_suspect(SESSION_CLOSED_TEXT)),
            ..Default::default()
        });
        self.notify_direct(handle, client, status, ConsumerEvent::default());
    }

    fn item_event(&self, entry: &ItemEntry) -> ConsumerEvent {
        ConsumerEvent {
            handle: Some(entry.handle),
            service_name: entry.display_service_name(),
            service_id: entry.session_service_id(),
            channel_name: entry
                .bound_channel()
                .map(|channel| self.channels.name(channel).to_string()),
        }
    }

    fn forget_item(&mut self, handle: Handle) -> Option<ItemEntry> {
        self.timers.cancel(TimerKind::Request(handle));
        self.items.remove(handle)
    }
}

/// Session-originated status for an item, carrying its session-wide service identity.
fn status_message(entry: &ItemEntry, state: StreamStatus) -> ProviderMsg {
    ProviderMsg::Status(StatusMsg {
        stream_id: entry.stream_id,
        domain: entry.request.domain,
        name: Some(entry.request.name.clone()),
        service_id: entry.session_service_id(),
        service_name: entry.display_service_name(),
        state: Some(state),
        item_group: None,
    })
}
