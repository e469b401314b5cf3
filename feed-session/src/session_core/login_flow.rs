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

//! Channel lifecycle and login handling.

use super::{ConnectPhase, Effect, SessionCore, COMPONENT};
use crate::channel::ChannelState;
use crate::config::AdminControl;
use crate::control_plane::channel_table::{ChannelId, ChannelLoginState, DirectoryPhase};
use crate::control_plane::login::{LoginController, CHANNEL_CLOSED_TEXT};
use crate::error::SessionError;
use crate::message::{ChannelRequest, ProviderMsg, StreamStatus};
use crate::observability::{events, fields};
use crate::runtime::timers::TimerKind;
use tracing::{info, warn};

pub(super) const LOGIN_TIMEOUT_TEXT: &str = "login request timed out";

impl SessionCore {
    pub(super) fn on_channel_up(&mut self, channel: ChannelId) {
        let entry = self.channels.get_mut(channel);
        entry.state = ChannelState::Active;
        entry.login = ChannelLoginState::Pending;
        entry.last_failure = None;
        // Channels whose login is user-driven are only logged in automatically once.
        let send_login =
            !entry.ever_logged_in || entry.config.admin_control.login == AdminControl::Api;
        info!(
            event = events::CHANNEL_CONNECT_OK,
            component = COMPONENT,
            channel = entry.name.as_str(),
            epoch = entry.epoch,
            "channel is up"
        );

        let status = self.login.channel_up_status();
        self.notify_login(ProviderMsg::Status(status), Some(channel));
        if send_login {
            self.send_login(channel);
        }
    }

    pub(super) fn send_login(&mut self, channel: ChannelId) {
        let role = self.standby.login_role(channel);
        let request = self.login.request_for(role);
        info!(
            event = events::LOGIN_REQUEST_SENT,
            component = COMPONENT,
            channel = self.channels.name(channel),
            user = request.user_name.as_str(),
            role = ?role,
            "sending login request"
        );
        self.send(channel, ChannelRequest::Login(request));
    }

    pub(super) fn on_channel_down(&mut self, channel: ChannelId, reason: String) {
        let entry = self.channels.get_mut(channel);
        entry.retire_connection();
        entry.last_failure = Some(reason.clone());
        entry.login = ChannelLoginState::Pending;
        entry.directory = DirectoryPhase::NotRequested;
        let delay = entry.next_reconnect_delay();
        entry.state = if delay.is_some() {
            ChannelState::DownReconnecting
        } else {
            ChannelState::Closed
        };
        let wait = delay.is_some() && entry.config.reconnect_window_ms > 0;
        warn!(
            event = events::CHANNEL_DOWN,
            component = COMPONENT,
            channel = entry.name.as_str(),
            reason = reason.as_str(),
            attempts = entry.reconnect_attempts,
            "channel connection lost"
        );

        self.timers.cancel(TimerKind::Directory(channel));
        self.release_channel(channel, wait);

        match delay {
            Some(delay) => {
                info!(
                    event = events::CHANNEL_RECONNECT_SCHEDULED,
                    component = COMPONENT,
                    channel = self.channels.name(channel),
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                self.start_timer(TimerKind::Reconnect(channel), delay);
                let others_logged_in = self.others_logged_in(channel);
                let status = self.login.channel_down_status(others_logged_in);
                self.notify_login(ProviderMsg::Status(status), Some(channel));
            }
            None => {
                self.effects.push(Effect::CloseChannel(channel));
                self.after_channel_closed(channel);
            }
        }
        self.maybe_complete_connect();
    }

    pub(super) fn on_reconnect_timer(&mut self, channel: ChannelId) {
        if self.channels.get(channel).state == ChannelState::DownReconnecting {
            self.connect_channel(channel);
        }
    }

    pub(super) fn on_login_response(&mut self, channel: ChannelId, status: StreamStatus, refresh: bool) {
        let state = LoginController::classify(&status);
        let channel_name = self.channels.name(channel).to_string();

        if state == ChannelLoginState::Denied {
            warn!(
                event = events::LOGIN_DENIED,
                component = COMPONENT,
                channel = channel_name.as_str(),
                status = fields::format_status(&status),
                "login denied; closing channel"
            );
            self.channels.get_mut(channel).login = ChannelLoginState::Denied;
            let relayed = self.login.provider_status(&channel_name, &status);
            self.notify_login(ProviderMsg::Status(relayed), Some(channel));
            self.close_channel(channel, &status.text);
            self.maybe_complete_connect();
            return;
        }

        let entry = self.channels.get_mut(channel);
        let first_on_connection = entry.login == ChannelLoginState::Pending;
        entry.login = state;
        entry.ever_logged_in = true;
        if first_on_connection {
            entry.reset_backoff();
        }
        let directory_control = entry.config.admin_control.directory;

        if state == ChannelLoginState::Suspect {
            warn!(
                event = events::LOGIN_SUSPECT,
                component = COMPONENT,
                channel = channel_name.as_str(),
                status = fields::format_status(&status),
                "login is suspect"
            );
        } else {
            info!(
                event = events::LOGIN_ACCEPTED,
                component = COMPONENT,
                channel = channel_name.as_str(),
                "login accepted"
            );
        }

        let refresh_msg = if refresh {
            self.login.accept_refresh(&status)
        } else {
            None
        };
        match refresh_msg {
            Some(refresh_msg) => {
                self.notify_login(ProviderMsg::Refresh(refresh_msg), Some(channel));
            }
            // Later logins only surface when the provider reports a problem or a plain status.
            None if !refresh || state == ChannelLoginState::Suspect => {
                let relayed = self.login.provider_status(&channel_name, &status);
                self.notify_login(ProviderMsg::Status(relayed), Some(channel));
            }
            None => {}
        }

        if first_on_connection {
            self.claim_on_login(channel);
            if directory_control == AdminControl::Api {
                self.request_directory(channel);
            }
            self.retry_unbound_items();
        }
        self.maybe_complete_connect();
    }

    /// Closes a channel for good: no reconnect, its items move elsewhere.
    pub(super) fn close_channel(&mut self, channel: ChannelId, reason: &str) {
        let entry = self.channels.get_mut(channel);
        if entry.is_closed() {
            return;
        }
        entry.retire_connection();
        entry.state = ChannelState::Closed;
        entry.directory = DirectoryPhase::NotRequested;
        entry.last_failure = Some(reason.to_string());
        self.timers.cancel(TimerKind::Reconnect(channel));
        self.timers.cancel(TimerKind::Directory(channel));
        self.effects.push(Effect::CloseChannel(channel));
        self.release_channel(channel, false);
        self.after_channel_closed(channel);
    }

    /// Withdraws a channel from routing: promotion, item recovery, then its directory share.
    fn release_channel(&mut self, channel: ChannelId, wait: bool) {
        self.standby.forget_signals(channel);
        let promoted = self.promote_on_loss(channel);
        self.reassign_services();
        self.fail_over_services(channel);
        self.recover_channel_items(channel, wait && !promoted);

        let changes = self.directory.clear_channel(channel);
        info!(
            event = events::DIRECTORY_CHANNEL_CLEARED,
            component = COMPONENT,
            channel = self.channels.name(channel),
            changes = changes.len(),
            "channel removed from aggregate directory"
        );
        self.after_directory_change(changes, None);
    }

    fn after_channel_closed(&mut self, channel: ChannelId) {
        info!(
            event = events::CHANNEL_CLOSED,
            component = COMPONENT,
            channel = self.channels.name(channel),
            "channel closed"
        );
        self.timers.cancel(TimerKind::Reconnect(channel));
        self.on_reconnect_window(channel);

        let last_channel = self.channels.all_closed();
        let others_logged_in = self.others_logged_in(channel);
        let status = self
            .login
            .channel_closed_status(last_channel, others_logged_in);
        self.notify_login(ProviderMsg::Status(status), Some(channel));
    }

    pub(super) fn on_login_timeout(&mut self) {
        if self.connect != ConnectPhase::Pending {
            return;
        }
        let timeout_ms = self.config.timeouts.login_ms;

        if self.channels.logged_in().is_empty() {
            let channels: Vec<String> = self
                .channels
                .iter()
                .filter(|entry| entry.login != ChannelLoginState::Denied)
                .map(|entry| entry.name.clone())
                .collect();
            warn!(
                event = events::LOGIN_TIMEOUT,
                component = COMPONENT,
                timeout_ms,
                channels = channels.join(", "),
                "no channel logged in before the login timeout"
            );
            self.fail_connect(SessionError::LoginRequestTimeout {
                timeout_ms,
                channels,
            });
            return;
        }

        let stragglers: Vec<ChannelId> = self
            .channels
            .iter()
            .filter(|entry| !entry.is_closed() && !entry.is_logged_in())
            .map(|entry| entry.id)
            .collect();
        for channel in stragglers {
            let channel_name = self.channels.name(channel).to_string();
            warn!(
                event = events::LOGIN_TIMEOUT,
                component = COMPONENT,
                channel = channel_name.as_str(),
                timeout_ms,
                "closing channel that did not log in before the login timeout"
            );
            let relayed = self.login.provider_status(
                &channel_name,
                &StreamStatus::open_suspect(LOGIN_TIMEOUT_TEXT),
            );
            self.notify_login(ProviderMsg::Status(relayed), Some(channel));
            self.close_channel(channel, LOGIN_TIMEOUT_TEXT);
        }
        self.maybe_complete_connect();
    }

    /// Completes connect once no channel is still on its way to a usable login.
    pub(super) fn maybe_complete_connect(&mut self) {
        if self.connect != ConnectPhase::Pending {
            return;
        }
        let still_pending = self
            .channels
            .iter()
            .any(|entry| !entry.is_closed() && !(entry.is_logged_in() && entry.directory_settled()));
        if still_pending {
            return;
        }

        if self.channels.logged_in().is_empty() {
            let channels = self
                .channels
                .iter()
                .map(|entry| {
                    (
                        entry.name.clone(),
                        entry
                            .last_failure
                            .clone()
                            .unwrap_or_else(|| CHANNEL_CLOSED_TEXT.to_string()),
                    )
                })
                .collect();
            self.fail_connect(SessionError::LoginRejected { channels });
            return;
        }

        self.connect = ConnectPhase::Done;
        self.timers.cancel(TimerKind::Login);
        info!(
            event = events::SESSION_CONNECT_OK,
            component = COMPONENT,
            logged_in = self.channels.logged_in().len(),
            services = self.directory.views().len(),
            "consumer session connected"
        );
        self.effects.push(Effect::ConnectComplete(Ok(())));
    }

    /// Abandons a session that never connected; nothing is delivered to items.
    fn fail_connect(&mut self, err: SessionError) {
        warn!(
            event = events::SESSION_CONNECT_FAILED,
            component = COMPONENT,
            err = %err,
            "consumer session failed to connect"
        );
        for channel in self.channels.ids() {
            let entry = self.channels.get_mut(channel);
            if entry.state != ChannelState::Closed {
                entry.state = ChannelState::Closed;
                self.effects.push(Effect::CloseChannel(channel));
            }
        }
        self.timers.clear();
        self.connect = ConnectPhase::Done;
        self.closed = true;
        self.effects.push(Effect::ConnectComplete(Err(err)));
        self.effects.push(Effect::Shutdown);
    }

    fn others_logged_in(&self, channel: ChannelId) -> bool {
        self.channels
            .logged_in()
            .into_iter()
            .any(|other| other != channel)
    }
}
