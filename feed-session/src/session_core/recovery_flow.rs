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

//! Applies recovery plans to items that lost their binding.

use super::{SessionCore, COMPONENT};
use crate::channel::ChannelState;
use crate::control_plane::channel_table::ChannelId;
use crate::message::{ChannelRequest, Handle};
use crate::observability::{events, fields};
use crate::routing::item_table::ItemPhase;
use crate::routing::recovery::{plan, RecoveryCause, RecoveryPlan, RetryScope};
use crate::runtime::timers::TimerKind;
use std::time::Duration;
use tracing::{info, warn};

impl SessionCore {
    pub(super) fn recover(&mut self, handle: Handle, cause: RecoveryCause) {
        let Some(entry) = self.items.get_mut(handle) else {
            return;
        };
        let private = entry.request.private_stream;
        let stream_id = entry.stream_id;
        let bound_service = entry
            .binding
            .as_ref()
            .and_then(|binding| binding.service.as_ref())
            .map(|service| service.name.clone());
        let previous = entry.unbind();
        if entry.refreshed {
            entry.next_refresh_unsolicited = true;
        }
        entry.phase = ItemPhase::Recovering;
        self.timers.cancel(TimerKind::Request(handle));

        // The provider still holds the stream open in these cases.
        if matches!(
            cause,
            RecoveryCause::ServiceUnavailable | RecoveryCause::RequestTimeout
        ) {
            if let Some(channel) =
                previous.filter(|channel| self.channels.get(*channel).state == ChannelState::Active)
            {
                self.send(channel, ChannelRequest::Close { stream_id });
            }
        }

        info!(
            event = events::ITEM_RECOVERY_START,
            component = COMPONENT,
            handle = %handle,
            stream_id = %stream_id,
            cause = ?cause,
            "recovering item"
        );

        match plan(&cause, private) {
            RecoveryPlan::Terminal(status) => self.notify_item_status(handle, status),
            RecoveryPlan::Retry { status, scope } => match scope {
                RetryScope::Anywhere => {
                    self.notify_item_status(handle, status);
                    self.route_quietly(handle, None);
                }
                RetryScope::WaitForChannel(channel) => {
                    self.notify_item_status(handle, status);
                    if let Some(entry) = self.items.get_mut(handle) {
                        entry.waiting_for = Some(channel);
                    }
                    if !self.timers.is_running(TimerKind::ReconnectWindow(channel)) {
                        let window =
                            Duration::from_millis(self.channels.get(channel).config.reconnect_window_ms);
                        self.start_timer(TimerKind::ReconnectWindow(channel), window);
                    }
                }
                RetryScope::PreferOtherChannel => {
                    self.notify_item_status(handle, status);
                    let added = self.exclude(handle, previous);
                    let elsewhere = self.try_route(handle, None);
                    if let (true, Some(channel)) = (added, previous) {
                        if let Some(entry) = self.items.get_mut(handle) {
                            entry.excluded.remove(&channel);
                        }
                    }
                    if elsewhere.is_err() {
                        self.route_quietly(handle, None);
                    }
                }
                RetryScope::ElsewhereOrClose(terminal) => {
                    self.exclude(handle, previous);
                    match self.try_route_pinned(handle, bound_service.as_deref()) {
                        Ok(()) => self.notify_item_status(handle, status),
                        Err(_) => self.notify_item_status(handle, terminal),
                    }
                }
            },
        }
    }

    /// Recovers every item bound to a channel that left the Active state.
    pub(super) fn recover_channel_items(&mut self, channel: ChannelId, wait: bool) {
        for handle in self.items.bound_to(channel) {
            self.recover(handle, RecoveryCause::ChannelDown { channel, wait });
        }
    }

    /// Stops holding items for `channel` and routes them wherever possible.
    pub(super) fn on_reconnect_window(&mut self, channel: ChannelId) {
        self.timers.cancel(TimerKind::ReconnectWindow(channel));
        for handle in self.items.waiting_for(channel) {
            if let Some(entry) = self.items.get_mut(handle) {
                entry.waiting_for = None;
            }
            self.route_quietly(handle, None);
        }
    }

    pub(super) fn on_request_timeout(&mut self, handle: Handle) {
        let Some(entry) = self.items.get(handle) else {
            return;
        };
        warn!(
            event = events::ITEM_REQUEST_TIMEOUT,
            component = COMPONENT,
            handle = %handle,
            stream_id = %entry.stream_id,
            channel = entry
                .bound_channel()
                .map(|channel| self.channels.name(channel))
                .unwrap_or(fields::NONE),
            "no response to item request"
        );
        self.recover(handle, RecoveryCause::RequestTimeout);
    }

    /// Returns true when the channel was not excluded before.
    fn exclude(&mut self, handle: Handle, channel: Option<ChannelId>) -> bool {
        match (self.items.get_mut(handle), channel) {
            (Some(entry), Some(channel)) => entry.excluded.insert(channel),
            _ => false,
        }
    }
}
