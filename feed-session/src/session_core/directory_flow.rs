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

use super::{SessionCore, COMPONENT};
use crate::config::AdminControl;
use crate::control_plane::channel_table::{ChannelId, DirectoryPhase};
use crate::message::{
    ChannelRequest, DataState, Domain, Handle, Payload, ProviderMsg, RefreshMsg, StatusCode,
    StreamId, StreamState, StreamStatus, UpdateMsg,
};
use crate::observability::{events, fields};
use crate::routing::directory::{DirectoryChange, GroupEvent};
use crate::routing::item_table::ItemPhase;
use crate::routing::recovery::{RecoveryCause, SERVICE_DOWN_TEXT};
use crate::routing::resolution::{Binding, Selector};
use crate::runtime::timers::TimerKind;
use crate::service::{DirectoryEntry, DirectoryMsg, EntryAction};
use tracing::{debug, info, warn};

impl SessionCore {
    pub(super) fn request_directory(&mut self, channel: ChannelId) {
        self.channels.get_mut(channel).directory = DirectoryPhase::Requested;
        info!(
            event = events::DIRECTORY_REQUEST_SENT,
            component = COMPONENT,
            channel = self.channels.name(channel),
            "requesting source directory"
        );
        self.send(
            channel,
            ChannelRequest::Directory {
                stream_id: StreamId::DIRECTORY,
            },
        );
        let after = self.config.timeouts.directory();
        self.start_timer(TimerKind::Directory(channel), after);
    }

    pub(super) fn on_directory_message(&mut self, channel: ChannelId, msg: DirectoryMsg) {
        match msg {
            DirectoryMsg::Refresh(services) => {
                self.timers.cancel(TimerKind::Directory(channel));
                self.channels.get_mut(channel).directory = DirectoryPhase::Refreshed;
                let service_count = services.len();
                let changes = self.directory.apply_refresh(channel, services);
                info!(
                    event = events::DIRECTORY_REFRESH_APPLIED,
                    component = COMPONENT,
                    channel = self.channels.name(channel),
                    services = service_count,
                    changes = changes.len(),
                    "directory refresh applied"
                );

                // A fresh catalog lifts earlier exclusions of this channel.
                for handle in self.items.handles() {
                    if let Some(entry) = self.items.get_mut(handle) {
                        entry.excluded.remove(&channel);
                    }
                }
                self.after_directory_change(changes, Some(channel));
                self.maybe_complete_connect();
            }
            DirectoryMsg::Update(actions) => {
                let Some(outcome) = self.directory.apply_update(channel, actions) else {
                    debug!(
                        event = events::DIRECTORY_UPDATE_IGNORED,
                        component = COMPONENT,
                        channel = self.channels.name(channel),
                        "directory update before refresh ignored"
                    );
                    return;
                };
                self.apply_group_events(outcome.group_events);
                self.after_directory_change(outcome.changes, None);
            }
            DirectoryMsg::Status(status) => {
                if !status.is_closed() {
                    return;
                }
                warn!(
                    event = events::DIRECTORY_CHANNEL_CLEARED,
                    component = COMPONENT,
                    channel = self.channels.name(channel),
                    status = fields::format_status(&status),
                    "directory stream closed by provider"
                );
                self.timers.cancel(TimerKind::Directory(channel));
                let changes = self.directory.clear_channel(channel);
                self.after_directory_change(changes, None);

                let entry = self.channels.get_mut(channel);
                if status.stream_state == StreamState::ClosedRecover
                    && entry.config.admin_control.directory == AdminControl::Api
                {
                    self.request_directory(channel);
                } else {
                    entry.directory = DirectoryPhase::TimedOut;
                }
                self.maybe_complete_connect();
            }
        }
    }

    pub(super) fn on_directory_timeout(&mut self, channel: ChannelId) {
        let entry = self.channels.get_mut(channel);
        if entry.directory != DirectoryPhase::Requested {
            return;
        }
        entry.directory = DirectoryPhase::TimedOut;
        warn!(
            event = events::DIRECTORY_TIMEOUT,
            component = COMPONENT,
            channel = entry.name.as_str(),
            timeout_ms = self.config.timeouts.directory_ms,
            "no directory refresh before the timeout"
        );
        self.maybe_complete_connect();
    }

    /// Re-evaluates everything that depends on the aggregate after it changed.
    pub(super) fn after_directory_change(
        &mut self,
        changes: Vec<DirectoryChange>,
        refreshed: Option<ChannelId>,
    ) {
        if !changes.is_empty() {
            self.publish_source_updates(&changes);
        }
        self.reassign_services();
        self.verify_bindings();
        if let Some(channel) = refreshed {
            self.resume_waiting_items(channel);
        }
        self.retry_unbound_items();
    }

    /// Answers a source-domain request from the aggregate directory.
    pub(super) fn open_source_item(&mut self, handle: Handle) {
        let Some(entry) = self.items.get_mut(handle) else {
            return;
        };
        entry.refreshed = true;
        entry.phase = ItemPhase::Open;
        let streaming = entry.request.streaming;
        let stream_id = entry.stream_id;
        let name = entry.request.name.clone();
        let selector = entry.selector.clone();

        let services: Vec<DirectoryEntry> = self
            .directory
            .views()
            .into_iter()
            .filter(|view| self.source_wants(&selector, view.service_id))
            .map(|view| DirectoryEntry {
                action: EntryAction::Add,
                service_id: view.service_id,
                service: Some(view),
            })
            .collect();
        let state = if streaming {
            StreamStatus::open_ok("")
        } else {
            StreamStatus::new(StreamState::NonStreaming, DataState::Ok, StatusCode::None, "")
        };
        let refresh = RefreshMsg {
            stream_id,
            domain: Domain::SOURCE,
            name: Some(name),
            state,
            solicited: true,
            complete: true,
            payload: Payload::Directory(services),
            ..Default::default()
        };
        self.notify_item(handle, ProviderMsg::Refresh(refresh), !streaming);
    }

    fn source_wants(&self, selector: &Selector, service_id: u16) -> bool {
        match selector {
            Selector::Id(id) => *id == service_id,
            Selector::Name(name) => self
                .directory
                .view(service_id)
                .is_some_and(|view| &view.name == name),
            Selector::List(_) | Selector::Unspecified => true,
        }
    }

    fn publish_source_updates(&mut self, changes: &[DirectoryChange]) {
        let entries: Vec<DirectoryEntry> = changes
            .iter()
            .map(|change| match *change {
                DirectoryChange::Added(service_id) => DirectoryEntry {
                    action: EntryAction::Add,
                    service_id,
                    service: self.directory.view(service_id),
                },
                DirectoryChange::Updated(service_id) => DirectoryEntry {
                    action: EntryAction::Update,
                    service_id,
                    service: self.directory.view(service_id),
                },
                DirectoryChange::Deleted(service_id) => DirectoryEntry {
                    action: EntryAction::Delete,
                    service_id,
                    service: None,
                },
            })
            .collect();

        for handle in self.items.source_items() {
            let Some(entry) = self.items.get(handle) else {
                continue;
            };
            let selected: Vec<DirectoryEntry> = entries
                .iter()
                .filter(|change| self.source_wants(&entry.selector, change.service_id))
                .cloned()
                .collect();
            if selected.is_empty() {
                continue;
            }
            let update = UpdateMsg {
                stream_id: entry.stream_id,
                domain: Domain::SOURCE,
                name: Some(entry.request.name.clone()),
                payload: Payload::Directory(selected),
                ..Default::default()
            };
            self.notify_item(handle, ProviderMsg::Update(update), false);
        }
    }

    /// Recovers bound items whose service went away or stopped fitting the request.
    fn verify_bindings(&mut self) {
        for handle in self.items.handles() {
            let Some(entry) = self.items.get(handle) else {
                continue;
            };
            let Some(Binding {
                channel,
                service: Some(service),
            }) = entry.binding.as_ref()
            else {
                continue;
            };
            let channel = *channel;
            let healthy = self
                .directory
                .channel_service(channel, &service.name)
                .is_some_and(|info| {
                    info.is_available()
                        && info.supports_domain(entry.request.domain)
                        && info.supports_qos(entry.request.qos.as_ref())
                });
            if !healthy && !self.fail_over_item(handle, channel, SERVICE_DOWN_TEXT) {
                self.recover(handle, RecoveryCause::ServiceUnavailable);
            }
        }
    }

    fn resume_waiting_items(&mut self, channel: ChannelId) {
        let waiting = self.items.waiting_for(channel);
        if waiting.is_empty() {
            return;
        }
        self.timers.cancel(TimerKind::ReconnectWindow(channel));
        for handle in waiting {
            if let Some(entry) = self.items.get_mut(handle) {
                entry.waiting_for = None;
            }
            self.route_quietly(handle, Some(channel));
        }
    }

    /// Routes items without a binding; a status is emitted only when the reason changes.
    pub(super) fn retry_unbound_items(&mut self) {
        for handle in self.items.unbound() {
            let previous = self.items.get(handle).and_then(|entry| entry.pending_reason);
            let Err(reason) = self.try_route(handle, None) else {
                continue;
            };
            if let Some(entry) = self.items.get_mut(handle) {
                entry.pending_reason = Some(reason);
            }
            if previous.is_some_and(|previous| previous != reason) {
                self.notify_item_status(handle, StreamStatus::open_suspect(reason.status_text()));
            }
        }
    }

    fn apply_group_events(&mut self, group_events: Vec<GroupEvent>) {
        for GroupEvent {
            channel,
            service_name,
            group,
        } in group_events
        {
            if let Some(into) = &group.merged_to {
                let moved = self
                    .items
                    .merge_group(channel, &service_name, &group.group_id, into);
                debug!(
                    event = events::ITEM_GROUP_MERGED,
                    component = COMPONENT,
                    channel = self.channels.name(channel),
                    service = service_name.as_str(),
                    moved,
                    "provider item groups merged"
                );
            }
            let Some(status) = group.status else {
                continue;
            };
            let members = self
                .items
                .in_group(channel, &service_name, &group.group_id);
            for handle in members {
                if status.is_closed() {
                    self.recover(handle, RecoveryCause::GroupClosedRecover(Some(status.clone())));
                } else {
                    self.notify_item_status(handle, status.clone());
                }
            }
        }
    }
}
