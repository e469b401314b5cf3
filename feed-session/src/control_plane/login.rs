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

//! Aggregation of per-channel logins into the single application login stream.

use crate::config::LoginConfig;
use crate::control_plane::channel_table::ChannelLoginState;
use crate::message::{
    DataState, Domain, LoginRequest, RefreshMsg, StandbyRole, StatusCode, StatusMsg, StreamId,
    StreamState, StreamStatus,
};

pub(crate) const CHANNEL_UP_TEXT: &str = "session channel up";
pub(crate) const CHANNEL_DOWN_RECONNECTING_TEXT: &str = "session channel down reconnecting";
pub(crate) const CHANNEL_CLOSED_TEXT: &str = "session channel closed";
pub(crate) const SESSION_CLOSED_TEXT: &str = "Consumer session is closed.";

pub(crate) struct LoginController {
    request: LoginRequest,
    initial_refresh_sent: bool,
}

impl LoginController {
    pub(crate) fn new(config: &LoginConfig) -> Self {
        Self {
            request: LoginRequest {
                user_name: config.user_name.clone(),
                application_id: config.application_id.clone(),
                position: config.position.clone(),
                role: None,
            },
            initial_refresh_sent: false,
        }
    }

    pub(crate) fn request_for(&self, role: Option<StandbyRole>) -> LoginRequest {
        LoginRequest {
            role,
            ..self.request.clone()
        }
    }

    pub(crate) fn replace_request(&mut self, request: LoginRequest) {
        self.request = LoginRequest {
            role: None,
            ..request
        };
    }

    /// Maps a provider login state onto the channel login state.
    pub(crate) fn classify(status: &StreamStatus) -> ChannelLoginState {
        match (status.stream_state, status.data_state) {
            (StreamState::Open | StreamState::NonStreaming, DataState::Suspect) => {
                ChannelLoginState::Suspect
            }
            (StreamState::Open | StreamState::NonStreaming, _) => ChannelLoginState::Up,
            _ => ChannelLoginState::Denied,
        }
    }

    /// The login refresh for the application, produced for the first accepted login only.
    pub(crate) fn accept_refresh(&mut self, provider_state: &StreamStatus) -> Option<RefreshMsg> {
        if self.initial_refresh_sent {
            return None;
        }
        self.initial_refresh_sent = true;
        Some(RefreshMsg {
            stream_id: StreamId::LOGIN,
            domain: Domain::LOGIN,
            name: Some(self.request.user_name.clone()),
            state: provider_state.clone(),
            solicited: true,
            complete: true,
            ..Default::default()
        })
    }

    pub(crate) fn channel_up_status(&self) -> StatusMsg {
        let data_state = if self.initial_refresh_sent {
            DataState::Ok
        } else {
            DataState::Suspect
        };
        self.status(StreamStatus::new(
            StreamState::Open,
            data_state,
            StatusCode::None,
            CHANNEL_UP_TEXT,
        ))
    }

    pub(crate) fn channel_down_status(&self, others_logged_in: bool) -> StatusMsg {
        let data_state = if self.initial_refresh_sent && others_logged_in {
            DataState::Ok
        } else {
            DataState::Suspect
        };
        self.status(StreamStatus::new(
            StreamState::Open,
            data_state,
            StatusCode::None,
            CHANNEL_DOWN_RECONNECTING_TEXT,
        ))
    }

    pub(crate) fn channel_closed_status(&self, last_channel: bool, others_logged_in: bool) -> StatusMsg {
        let (stream_state, data_state) = if last_channel {
            (StreamState::Closed, DataState::Suspect)
        } else if self.initial_refresh_sent && others_logged_in {
            (StreamState::Open, DataState::Ok)
        } else {
            (StreamState::Open, DataState::Suspect)
        };
        self.status(StreamStatus::new(
            stream_state,
            data_state,
            StatusCode::None,
            CHANNEL_CLOSED_TEXT,
        ))
    }

    /// Relays a provider login status, tagged with the channel it came from.
    pub(crate) fn provider_status(&self, channel_name: &str, provider_state: &StreamStatus) -> StatusMsg {
        let mut state = provider_state.clone();
        // A single channel losing its login never closes the aggregated stream.
        if state.stream_state.is_closed() {
            state.stream_state = StreamState::Open;
            state.data_state = DataState::Suspect;
        }
        state.text = format!("{} (channel {channel_name})", provider_state.text);
        self.status(state)
    }

    pub(crate) fn session_closed_status(&self) -> StatusMsg {
        self.status(StreamStatus::closed_suspect(SESSION_CLOSED_TEXT))
    }

    fn status(&self, state: StreamStatus) -> StatusMsg {
        StatusMsg {
            stream_id: StreamId::LOGIN,
            domain: Domain::LOGIN,
            name: Some(self.request.user_name.clone()),
            state: Some(state),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LoginController, CHANNEL_CLOSED_TEXT, CHANNEL_UP_TEXT};
    use crate::config::LoginConfig;
    use crate::control_plane::channel_table::ChannelLoginState;
    use crate::message::{DataState, StandbyRole, StatusCode, StreamState, StreamStatus};

    fn controller() -> LoginController {
        LoginController::new(&LoginConfig::default())
    }

    #[test]
    fn only_the_first_accepted_login_produces_a_refresh() {
        let mut login = controller();

        assert!(login
            .accept_refresh(&StreamStatus::open_ok("Login accepted"))
            .is_some());
        assert!(login
            .accept_refresh(&StreamStatus::open_ok("Login accepted"))
            .is_none());
    }

    #[test]
    fn channel_up_is_suspect_until_first_refresh() {
        let mut login = controller();
        let before = login.channel_up_status().state.expect("state present");
        assert_eq!(before.text, CHANNEL_UP_TEXT);
        assert_eq!(before.data_state, DataState::Suspect);

        login.accept_refresh(&StreamStatus::open_ok(""));

        let after = login.channel_up_status().state.expect("state present");
        assert_eq!(after.stream_state, StreamState::Open);
        assert_eq!(after.data_state, DataState::Ok);
    }

    #[test]
    fn closing_the_last_channel_closes_the_login_stream() {
        let login = controller();

        let last = login
            .channel_closed_status(true, false)
            .state
            .expect("state present");
        let not_last = login
            .channel_closed_status(false, true)
            .state
            .expect("state present");

        assert_eq!(last.stream_state, StreamState::Closed);
        assert_eq!(last.text, CHANNEL_CLOSED_TEXT);
        assert_eq!(not_last.stream_state, StreamState::Open);
    }

    #[test]
    fn classify_maps_provider_states() {
        assert_eq!(
            LoginController::classify(&StreamStatus::open_ok("")),
            ChannelLoginState::Up
        );
        assert_eq!(
            LoginController::classify(&StreamStatus::open_suspect("")),
            ChannelLoginState::Suspect
        );
        assert_eq!(
            LoginController::classify(
                &StreamStatus::closed_suspect("denied").with_code(StatusCode::NotAuthorized)
            ),
            ChannelLoginState::Denied
        );
    }

    #[test]
    fn provider_denial_is_relayed_as_open_suspect_with_channel_name() {
        let login = controller();

        let relayed = login
            .provider_status("channel_a", &StreamStatus::closed_suspect("bad user"))
            .state
            .expect("state present");

        assert_eq!(relayed.stream_state, StreamState::Open);
        assert_eq!(relayed.data_state, DataState::Suspect);
        assert_eq!(relayed.text, "bad user (channel channel_a)");
    }

    #[test]
    fn request_carries_standby_role() {
        let login = controller();

        assert_eq!(
            login.request_for(Some(StandbyRole::Standby)).role,
            Some(StandbyRole::Standby)
        );
        assert_eq!(login.request_for(None).user_name, "user");
    }
}
