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
use crate::channel::ChannelState;
use crate::config::StandbyMode;
use crate::control_plane::channel_table::ChannelId;
use crate::control_plane::warm_standby::Promotion;
use crate::message::{ChannelRequest, Handle, StreamStatus};
use crate::observability::events;
use crate::routing::item_table::ItemPhase;
use crate::routing::recovery::CHANNEL_DOWN_TEXT;
use crate::runtime::timers::TimerKind;
use tracing::info;

impl SessionCore {
    /// Returns true when the other member of a login-based pair took over.
    pub(super) fn promote_on_loss(&mut self, lost: ChannelId) -> bool {
        let channels = &self.channels;
        let Some(promotion) = self
            .standby
            .promote_on_loss(lost, |candidate| channels.get(candidate).is_logged_in())
        else {
            return false;
        };
        self.apply_promotion(promotion);
        true
    }

    pub(super) fn claim_on_login(&mut self, channel: ChannelId) {
        let channels = &self.channels;
        if let Some(promotion) = self
            .standby
            .claim_on_login(channel, |active| !channels.get(active).is_logged_in())
        {
            self.apply_promotion(promotion);
        }
    }

    /// Re-signals login roles and moves every item of the old active member in one step.
    fn apply_promotion(&mut self, promotion: Promotion) {
        let Promotion {
            group,
            previous,
            promoted,
        } = promotion;
        info!(
            event = events::STANDBY_PROMOTED,
            component = COMPONENT,
            group = self.standby.group(group).name.as_str(),
            previous = self.channels.name(previous),
            promoted = self.channels.name(promoted),
            "standby promoted to active"
        );

        for channel in [promoted, previous] {
            if self.channels.get(channel).state == ChannelState::Active {
                self.send_login(channel);
            }
        }

        for handle in self.items.bound_to(previous) {
            self.move_item(handle, previous, promoted, None, CHANNEL_DOWN_TEXT);
        }

        // Items held for the old active member move on as well.
        self.on_reconnect_window(previous);
    }

    /// Hands items of a lost service-based member to its partner without a suspect status.
    pub(super) fn fail_over_services(&mut self, lost: ChannelId) {
        for handle in self.items.bound_to(lost) {
            self.fail_over_item(handle, lost, CHANNEL_DOWN_TEXT);
        }
    }

    /// Returns true when the item moved to the partner now active for its service.
    pub(super) fn fail_over_item(
        &mut self,
        handle: Handle,
        from: ChannelId,
        fallback: &str,
    ) -> bool {
        let Some(entry) = self.items.get(handle) else {
            return false;
        };
        if entry.request.private_stream {
            return false;
        }
        let Some(service) = entry
            .binding
            .as_ref()
            .and_then(|binding| binding.service.as_ref())
            .map(|service| service.name.clone())
        else {
            return false;
        };
        let Some(partner) = self.service_partner(from, &service) else {
            return false;
        };
        info!(
            event = events::STANDBY_SERVICE_FAILOVER,
            component = COMPONENT,
            handle = %handle,
            service = service.as_str(),
            from = self.channels.name(from),
            to = self.channels.name(partner),
            "moving item to the active member for its service"
        );
        self.move_item(handle, from, partner, Some(&service), fallback);
        true
    }

    /// Partner of a service-based pair holding the active role for `service`.
    fn service_partner(&self, channel: ChannelId, service: &str) -> Option<ChannelId> {
        let group = self.standby.group_of(channel)?;
        if group.mode != StandbyMode::ServiceBased {
            return None;
        }
        let partner = group.other(channel);
        (self.standby.is_service_active(partner, service)
            && self.channels.get(partner).is_logged_in())
        .then_some(partner)
    }

    /// Rebinds an item to `to` within the current event; its next refresh is unsolicited.
    fn move_item(
        &mut self,
        handle: Handle,
        from: ChannelId,
        to: ChannelId,
        service: Option<&str>,
        fallback: &str,
    ) {
        let from_active = self.channels.get(from).state == ChannelState::Active;
        let Some(entry) = self.items.get_mut(handle) else {
            return;
        };
        let stream_id = entry.stream_id;
        entry.unbind();
        if entry.refreshed {
            entry.next_refresh_unsolicited = true;
        }
        entry.phase = ItemPhase::Recovering;
        self.timers.cancel(TimerKind::Request(handle));
        if from_active {
            self.send(from, ChannelRequest::Close { stream_id });
        }

        if let Err(reason) = self.route_with(handle, Some(to), service) {
            if let Some(entry) = self.items.get_mut(handle) {
                entry.pending_reason = Some(reason);
            }
            self.notify_item_status(handle, StreamStatus::open_suspect(fallback));
        }
    }

    /// Signals per-service roles for service-based pairs.
    pub(super) fn reassign_services(&mut self) {
        let channels = &self.channels;
        let directory = &self.directory;
        let signals = self.standby.reassign_services(
            |channel| {
                if channels.get(channel).is_logged_in() {
                    directory.channel_service_names(channel)
                } else {
                    Vec::new()
                }
            },
            |channel, name| {
                channels.get(channel).is_logged_in()
                    && directory
                        .channel_service(channel, name)
                        .is_some_and(|service| service.is_available())
            },
        );

        for (channel, name, role) in signals {
            let Some(service_id) = self
                .directory
                .channel_service(channel, &name)
                .map(|service| service.service_id)
            else {
                continue;
            };
            info!(
                event = events::STANDBY_SERVICE_ACTIVE,
                component = COMPONENT,
                channel = self.channels.name(channel),
                service = name.as_str(),
                role = ?role,
                "signalling service role"
            );
            self.send(channel, ChannelRequest::ConsumerStatus { service_id, role });
        }
    }
}
