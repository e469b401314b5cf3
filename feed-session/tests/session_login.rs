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

mod support;

use feed_session::{
    ChannelLoginState, ChannelRequest, ChannelState, ConfigError, ConsumerSession, DataState,
    LoginRequest, SessionError, StatusCode, StreamState, StreamStatus,
};
use integration_test_utils::{
    fast_config, init_logging, service, LoginReply, SimulatedProvider, LOGIN_ACCEPTED_TEXT,
};
use std::sync::Arc;
use std::time::Duration;
use support::{channel, connect, connect_ok, eventually};

fn two_providers() -> (Arc<SimulatedProvider>, Arc<SimulatedProvider>) {
    (
        SimulatedProvider::new("a", vec![service(10, "IDN")]),
        SimulatedProvider::new("b", vec![service(20, "ELEKTRON")]),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_delivers_a_single_login_refresh_for_every_channel() {
    init_logging();
    let (a, b) = two_providers();

    let (session, login) =
        connect_ok(fast_config("login", &["a", "b"]), &[a.clone(), b.clone()]).await;

    let refresh = login.wait_for(|recorded| recorded.is_refresh()).await;
    assert_eq!(refresh.handle(), Some(session.login_handle()));
    assert_eq!(refresh.text(), Some(LOGIN_ACCEPTED_TEXT));
    login
        .expect_quiet(Duration::from_millis(100), |recorded| recorded.is_refresh())
        .await;

    let infos = session.query_channel_info();
    for name in ["a", "b"] {
        let info = channel(&infos, name);
        assert_eq!(info.state, ChannelState::Active);
        assert_eq!(info.login_state, ChannelLoginState::Up);
    }
    assert_eq!(channel(&infos, "a").services, vec!["IDN".to_string()]);
    assert_eq!(channel(&infos, "b").services, vec!["ELEKTRON".to_string()]);
    for provider in [&a, &b] {
        assert!(matches!(
            provider.requests().as_slice(),
            [ChannelRequest::Login(_), ChannelRequest::Directory { .. }, ..]
        ));
    }

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn channel_up_is_reported_on_the_login_stream_per_channel() {
    init_logging();
    let (a, b) = two_providers();

    let (session, login) = connect_ok(fast_config("login", &["a", "b"]), &[a, b]).await;

    let ups = login
        .wait_for_count(2, |recorded| {
            recorded.is_status() && recorded.text() == Some("session channel up")
        })
        .await;
    let mut channels: Vec<String> = ups
        .iter()
        .filter_map(|recorded| recorded.event.channel_name.clone())
        .collect();
    channels.sort();
    assert_eq!(channels, vec!["a".to_string(), "b".to_string()]);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_providers_fail_connect_with_login_timeout() {
    init_logging();
    let (a, b) = two_providers();
    a.set_login_reply(LoginReply::Silent);
    b.set_login_reply(LoginReply::Silent);

    let result = connect(fast_config("login", &["a", "b"]), &[a, b]).await;

    let Err(err) = result else {
        panic!("connect should time out");
    };
    assert_eq!(
        err,
        SessionError::LoginRequestTimeout {
            timeout_ms: 1_000,
            channels: vec!["a".to_string(), "b".to_string()],
        }
    );
    assert_eq!(
        err.to_string(),
        "login failed (timed out after waiting 1000 milliseconds) for a, b"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn denial_on_every_channel_fails_connect_with_reasons() {
    init_logging();
    let (a, b) = two_providers();
    a.set_login_reply(LoginReply::Deny("unknown user".to_string()));
    b.set_login_reply(LoginReply::Deny("not entitled".to_string()));

    let result = connect(fast_config("login", &["a", "b"]), &[a, b]).await;

    let Err(SessionError::LoginRejected { mut channels }) = result else {
        panic!("connect should be rejected");
    };
    channels.sort();
    assert_eq!(
        channels,
        vec![
            ("a".to_string(), "unknown user".to_string()),
            ("b".to_string(), "not entitled".to_string()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn channel_that_never_logs_in_is_closed_when_another_did() {
    init_logging();
    let (a, b) = two_providers();
    b.set_login_reply(LoginReply::Silent);

    let (session, login) = connect_ok(fast_config("login", &["a", "b"]), &[a, b.clone()]).await;

    let infos = session.query_channel_info();
    assert_eq!(channel(&infos, "a").state, ChannelState::Active);
    assert_eq!(channel(&infos, "b").state, ChannelState::Closed);
    assert!(!b.is_connected());

    let relayed = login
        .wait_for(|recorded| {
            recorded.text() == Some("login request timed out (channel b)")
        })
        .await;
    let state = relayed.state().expect("status carries a state");
    assert_eq!(state.stream_state, StreamState::Open);
    assert_eq!(state.data_state, DataState::Suspect);

    let closed = login
        .wait_for(|recorded| recorded.text() == Some("session channel closed"))
        .await;
    let state = closed.state().expect("status carries a state");
    // Channel a still serves the session.
    assert_eq!(state.stream_state, StreamState::Open);
    assert_eq!(state.data_state, DataState::Ok);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn reissued_login_is_sent_on_every_active_channel() {
    init_logging();
    let (a, b) = two_providers();
    let (session, _login) =
        connect_ok(fast_config("login", &["a", "b"]), &[a.clone(), b.clone()]).await;

    session
        .reissue_login(LoginRequest {
            user_name: "trader".to_string(),
            ..Default::default()
        })
        .expect("session is open");

    for provider in [&a, &b] {
        let logins = provider
            .wait_for_requests(2, |request| matches!(request, ChannelRequest::Login(_)))
            .await;
        let ChannelRequest::Login(reissued) = &logins[1] else {
            panic!("login request expected");
        };
        assert_eq!(reissued.user_name, "trader");
        assert_eq!(reissued.role, None);
    }

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn transports_must_match_the_configured_channels() {
    init_logging();
    let (a, b) = two_providers();

    let missing = connect(fast_config("login", &["a", "b"]), &[a.clone()]).await;
    assert!(matches!(
        missing,
        Err(SessionError::InvalidConfiguration(ConfigError::MissingTransport(name))) if name == "b"
    ));

    let unknown = ConsumerSession::builder(fast_config("login", &["a"]))
        .channel("a", a)
        .channel("z", b)
        .connect()
        .await;
    assert!(matches!(
        unknown,
        Err(SessionError::InvalidConfiguration(ConfigError::UnknownTransport(name))) if name == "z"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn suspect_login_still_opens_the_session() {
    init_logging();
    let a = SimulatedProvider::new("a", vec![service(10, "IDN")]);
    a.set_login_reply(LoginReply::Suspect("entitlements pending".to_string()));

    let (session, login) = connect_ok(fast_config("login", &["a"]), &[a]).await;

    let refresh = login.wait_for(|recorded| recorded.is_refresh()).await;
    let state = refresh.state().expect("refresh carries a state");
    assert_eq!(state.stream_state, StreamState::Open);
    assert_eq!(state.data_state, DataState::Suspect);
    assert_eq!(state.text, "entitlements pending");
    assert_eq!(
        channel(&session.query_channel_info(), "a").login_state,
        ChannelLoginState::Suspect
    );

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn forced_logout_closes_only_that_channel() {
    init_logging();
    let (a, b) = two_providers();
    let (session, login) =
        connect_ok(fast_config("login", &["a", "b"]), &[a.clone(), b.clone()]).await;

    a.push_login_status(
        StreamStatus::closed_suspect("forced logout").with_code(StatusCode::NotAuthorized),
    )
    .await;

    let relayed = login
        .wait_for(|recorded| recorded.text() == Some("forced logout (channel a)"))
        .await;
    let state = relayed.state().expect("status carries a state");
    assert_eq!(state.stream_state, StreamState::Open);
    assert_eq!(state.data_state, DataState::Suspect);
    eventually("channel a to close", || {
        channel(&session.query_channel_info(), "a").state == ChannelState::Closed
    })
    .await;

    // A denied channel is never reconnected.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(a.connects(), 1);
    let infos = session.query_channel_info();
    assert_eq!(channel(&infos, "a").login_state, ChannelLoginState::Denied);
    assert_eq!(channel(&infos, "b").login_state, ChannelLoginState::Up);

    session.close().await;
}
