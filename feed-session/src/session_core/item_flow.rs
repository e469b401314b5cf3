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

//! Item open, routing, inbound item traffic and application submissions.

use super::{SessionCore, COMPONENT};
use crate::channel::ChannelState;
use crate::client::ConsumerClient;
use crate::control_plane::channel_table::ChannelId;
use crate::error::UsageError;
use crate::message::{
    ChannelRequest, DataState, Handle, ItemRequest, ProviderMsg, ReqMsg, StreamId, StreamState,
    StreamStatus, SubmitMsg,
};
use crate::observability::{events, fields};
use crate::routing::item_table::{ItemEntry, ItemPhase};
use crate::routing::recovery::RecoveryCause;
use crate::routing::resolution::{resolve, ResolveContext, ResolveRequest, Selector, Unresolved};
use crate::runtime::timers::TimerKind;
use std::sync::Arc;
use tracing::{debug, info};

impl SessionCore {
    pub(super) fn open_item(
        &mut self,
        handle: Handle,
        request: ReqMsg,
        selector: Selector,
        client: Arc<dyn ConsumerClient>,
    ) {
        let stream_id = self.items.allocate_stream_id();
        let entry = ItemEntry::new(handle, stream_id, request, selector, client);
        let source = entry.is_source();
        self.items.insert(entry);

        if source {
            self.open_source_item(handle);
            return;
        }
        if let Err(reason) = self.try_route(handle, None) {
            if let Some(entry) = self.items.get_mut(handle) {
                entry.pending_reason = Some(reason);
            }
            info!(
                event = events::ITEM_PENDING,
                component = COMPONENT,
                handle = %handle,
                stream_id = %stream_id,
                reason = reason.status_text(),
                "no route for item yet"
            );
            self.notify_item_status(handle, StreamStatus::open_suspect(reason.status_text()));
        }
    }

    /// Binds an unbound item and sends its request; the item stays Pending on failure.
    pub(super) fn try_route(
        &mut self,
        handle: Handle,
        prefer: Option<ChannelId>,
    ) -> Result<(), Unresolved> {
        self.route_with(handle, prefer, None)
    }

    /// Routes only to the named service, ignoring the rest of a service list.
    pub(super) fn try_route_pinned(
        &mut self,
        handle: Handle,
        service: Option<&str>,
    ) -> Result<(), Unresolved> {
        self.route_with(handle, None, service)
    }

    pub(super) fn route_with(
        &mut self,
        handle: Handle,
        prefer: Option<ChannelId>,
        pinned: Option<&str>,
    ) -> Result<(), Unresolved> {
        let Some(entry) = self.items.get(handle) else {
            return Ok(());
        };
        let pinned = pinned.map(|name| Selector::Name(name.to_string()));
        let candidates = self.candidates(prefer);
        let context = ResolveContext {
            directory: &self.directory,
            service_lists: &self.service_lists,
            standby: &self.standby,
            candidates: &candidates,
        };
        let resolved = resolve(
            &context,
            &ResolveRequest {
                selector: pinned.as_ref().unwrap_or(&entry.selector),
                domain: entry.request.domain,
                qos: entry.request.qos.as_ref(),
                excluded: &entry.excluded,
            },
        );

        let binding = match resolved {
            Ok(binding) => binding,
            Err(reason) => {
                if let Some(entry) = self.items.get_mut(handle) {
                    entry.phase = ItemPhase::Pending;
                }
                return Err(reason);
            }
        };

        let channel = binding.channel;
        let request = ItemRequest {
            stream_id: entry.stream_id,
            domain: entry.request.domain,
            name: entry.request.name.clone(),
            service_id: binding.service.as_ref().map(|service| service.provider_id),
            qos: entry.request.qos.clone(),
            private_stream: entry.request.private_stream,
            streaming: entry.request.streaming,
        };
        info!(
            event = events::ITEM_ROUTED,
            component = COMPONENT,
            handle = %handle,
            stream_id = %request.stream_id,
            channel = self.channels.name(channel),
            service = fields::format_optional(
                binding.service.as_ref().map(|service| service.name.as_str())
            ),
            "item routed"
        );

        if let Some(entry) = self.items.get_mut(handle) {
            entry.binding = Some(binding);
            entry.phase = ItemPhase::Routed;
            entry.pending_reason = None;
            entry.waiting_for = None;
        }
        self.send(channel, ChannelRequest::Item(request));
        if let Some(after) = self.config.timeouts.request() {
            self.start_timer(TimerKind::Request(handle), after);
        }
        Ok(())
    }

    /// Tries to route; a failure only records the reason.
    pub(super) fn route_quietly(&mut self, handle: Handle, prefer: Option<ChannelId>) {
        if let Err(reason) = self.try_route(handle, prefer) {
            if let Some(entry) = self.items.get_mut(handle) {
                entry.pending_reason = Some(reason);
            }
            debug!(
                event = events::ITEM_PENDING,
                component = COMPONENT,
                handle = %handle,
                reason = reason.status_text(),
                "item left pending"
            );
        }
    }

    /// Application unregister: the item is forgotten and its provider stream closed.
    pub(super) fn close_item(&mut self, handle: Handle) {
        let Some(entry) = self.forget_item(handle) else {
            return;
        };
        if let Some(channel) = entry.bound_channel() {
            if self.channels.get(channel).state == ChannelState::Active {
                self.send(
                    channel,
                    ChannelRequest::Close {
                        stream_id: entry.stream_id,
                    },
                );
            }
        }
        info!(
            event = events::ITEM_CLOSED,
            component = COMPONENT,
            handle = %handle,
            stream_id = %entry.stream_id,
            "item unregistered"
        );
    }

    pub(super) fn on_item_message(&mut self, channel: ChannelId, mut msg: ProviderMsg) {
        let stream_id = msg.stream_id();
        let handle = self.items.by_stream(stream_id).filter(|handle| {
            self.items
                .get(*handle)
                .is_some_and(|entry| entry.bound_channel() == Some(channel))
        });
        let Some(handle) = handle else {
            debug!(
                event = events::ITEM_STALE_MESSAGE_DROPPED,
                component = COMPONENT,
                channel = self.channels.name(channel),
                stream_id = %stream_id,
                kind = msg.kind(),
                "dropping message for stream with no live binding"
            );
            if !msg.state().is_some_and(StreamStatus::is_closed) {
                self.send(channel, ChannelRequest::Close { stream_id });
            }
            return;
        };
        let Some(entry) = self.items.get_mut(handle) else {
            return;
        };

        let rewrite = entry
            .binding
            .as_ref()
            .is_some_and(|binding| binding.service.is_some());
        if rewrite {
            msg.rewrite_service(entry.session_service_id(), entry.display_service_name());
        }

        match msg {
            ProviderMsg::Refresh(mut refresh) => {
                self.timers.cancel(TimerKind::Request(handle));
                if refresh.state.is_closed() {
                    let state = refresh.state.clone();
                    self.on_item_closed(handle, ProviderMsg::Refresh(refresh), state);
                    return;
                }
                entry.refreshed = true;
                entry.excluded.clear();
                if refresh.item_group.is_some() {
                    entry.item_group = refresh.item_group.clone();
                }
                if entry.next_refresh_unsolicited {
                    refresh.solicited = false;
                    if refresh.complete {
                        entry.next_refresh_unsolicited = false;
                    }
                }
                entry.phase = phase_for(&refresh.state);
                let terminal =
                    refresh.state.stream_state == StreamState::NonStreaming && refresh.complete;
                self.notify_item(handle, ProviderMsg::Refresh(refresh), terminal);
            }
            ProviderMsg::Status(status) => {
                if status.item_group.is_some() {
                    entry.item_group = status.item_group.clone();
                }
                let Some(state) = status.state.clone() else {
                    self.notify_item(handle, ProviderMsg::Status(status), false);
                    return;
                };
                self.timers.cancel(TimerKind::Request(handle));
                if state.is_closed() {
                    self.on_item_closed(handle, ProviderMsg::Status(status), state);
                    return;
                }
                entry.phase = phase_for(&state);
                self.notify_item(handle, ProviderMsg::Status(status), false);
            }
            other => self.notify_item(handle, other, false),
        }
    }

    fn on_item_closed(&mut self, handle: Handle, message: ProviderMsg, state: StreamStatus) {
        let private = self
            .items
            .get(handle)
            .is_some_and(|entry| entry.request.private_stream);
        if state.stream_state == StreamState::ClosedRecover && !private {
            self.recover(handle, RecoveryCause::ItemClosedRecover(state));
            return;
        }
        info!(
            event = events::ITEM_CLOSED,
            component = COMPONENT,
            handle = %handle,
            status = fields::format_status(&state),
            "item closed by provider"
        );
        self.notify_item(handle, message, true);
    }

    pub(super) fn submit_on_login(&mut self, msg: SubmitMsg) -> Result<(), UsageError> {
        let targets: Vec<(ChannelId, Option<u16>)> = match msg.service_selector() {
            (Some(name), _) => {
                let targets = self.login_targets(name);
                if targets.is_empty() {
                    return Err(UsageError::UnknownServiceName(name.to_string()));
                }
                targets
            }
            (None, Some(session_id)) => {
                let name = self
                    .directory
                    .service(session_id)
                    .map(|service| service.name.clone())
                    .ok_or(UsageError::UnknownServiceId(session_id))?;
                let targets = self.login_targets(&name);
                if targets.is_empty() {
                    return Err(UsageError::UnknownServiceId(session_id));
                }
                targets
            }
            (None, None) => self
                .channels
                .logged_in()
                .into_iter()
                .map(|channel| (channel, None))
                .collect(),
        };

        for (channel, provider_id) in targets {
            let request = msg.to_channel_request(StreamId::LOGIN, provider_id);
            self.send(channel, request);
        }
        Ok(())
    }

    pub(super) fn submit_on_item(&mut self, handle: Handle, msg: SubmitMsg) -> Result<(), UsageError> {
        let entry = self
            .items
            .get(handle)
            .ok_or(UsageError::UnknownHandle(handle))?;
        let binding = entry
            .binding
            .as_ref()
            .ok_or(UsageError::ItemNotRouted(handle))?;
        let channel = binding.channel;
        let stream_id = entry.stream_id;

        let provider_id = match msg.service_selector() {
            (Some(name), _) => Some(
                self.directory
                    .channel_service(channel, name)
                    .map(|service| service.service_id)
                    .ok_or_else(|| UsageError::UnknownServiceName(name.to_string()))?,
            ),
            (None, Some(session_id)) => {
                let name = self
                    .directory
                    .service(session_id)
                    .map(|service| service.name.as_str())
                    .ok_or(UsageError::UnknownServiceId(session_id))?;
                Some(
                    self.directory
                        .channel_service(channel, name)
                        .map(|service| service.service_id)
                        .ok_or(UsageError::UnknownServiceId(session_id))?,
                )
            }
            (None, None) => binding.service.as_ref().map(|service| service.provider_id),
        };

        let request = msg.to_channel_request(stream_id, provider_id);
        self.send(channel, request);
        Ok(())
    }

    /// Logged-in channels carrying `name`, with the provider's id for it.
    fn login_targets(&self, name: &str) -> Vec<(ChannelId, Option<u16>)> {
        self.channels
            .logged_in()
            .into_iter()
            .filter_map(|channel| {
                self.directory
                    .channel_service(channel, name)
                    .map(|service| (channel, Some(service.service_id)))
            })
            .collect()
    }
}

fn phase_for(state: &StreamStatus) -> ItemPhase {
    if state.data_state == DataState::Suspect {
        ItemPhase::Suspect
    } else {
        ItemPhase::Open
    }
}
