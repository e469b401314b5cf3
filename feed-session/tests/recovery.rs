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
    ChannelRequest, ConsumerSession, DataState, Handle, ReqMsg, ServiceAction, StatusCode,
    StreamState, StreamStatus,
};
use integration_test_utils::{
    fast_config, init_logging, market_price, service, ItemReply, RecordingClient,
    SimulatedProvider,
};
use std::sync::Arc;
use std::time::Duration;
use support::{connect_ok, eventually, refresh_for, status_for};

const QUIET: Duration = Duration::from_millis(200);

fn idn_pair() -> (Arc<SimulatedProvider>, Arc<SimulatedProvider>) {
    (
        SimulatedProvider::new("a", vec![service(10, "IDN")]),
        SimulatedProvider::new("b", vec![service(20, "IDN")]),
    )
}

fn is_item(request: &ChannelRequest) -> bool {
    matches!(request, ChannelRequest::Item(_))
}

async fn subscribed(
    session: &ConsumerSession,
    client: &Arc<RecordingClient>,
    request: ReqMsg,
) -> Handle {
    let handle = session
        .subscribe(request, client.clone())
        .expect("request is valid");
    client.wait_for(refresh_for(handle)).await;
    handle
}

#[tokio::test(flavor = "multi_thread")]
async fn item_moves_to_another_channel_when_its_channel_is_lost() {
    init_logging();
    let (a, b) = idn_pair();
    let (session, _login) =
        connect_ok(fast_config("recovery", &["a", "b"]), &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(&session, &client, market_price("IBM.N", "IDN")).await;
    assert_eq!(a.item_requests().len(), 1);

    a.set_accepting(false);
    a.disconnect("connection reset").await;

    let down = client.wait_for(status_for(handle, "channel down.")).await;
    let state = down.state().expect("state");
    assert_eq!(state.stream_state, StreamState::Open);
    assert_eq!(state.data_state, DataState::Suspect);

    let request = b.wait_for_item_request("IBM.N", 1).await;
    assert_eq!(request.service_id, Some(20));
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    let moved = &refreshes[1];
    assert_eq!(moved.event.channel_name.as_deref(), Some("b"));
    assert!(!moved.refresh().expect("refresh").solicited);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn item_waits_for_its_channel_within_the_reconnect_window() {
    init_logging();
    let (a, b) = idn_pair();
    let mut config = fast_config("recovery", &["a", "b"]);
    config.channels[0].reconnect_window_ms = 2_000;
    let (session, _login) = connect_ok(config, &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(&session, &client, market_price("IBM.N", "IDN")).await;

    a.disconnect("connection reset").await;

    client.wait_for(status_for(handle, "channel down.")).await;
    let reopened = a.wait_for_item_request("IBM.N", 2).await;
    assert_eq!(reopened.service_id, Some(10));
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    assert_eq!(refreshes[1].event.channel_name.as_deref(), Some("a"));
    b.expect_no_requests(QUIET, is_item).await;

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn waiting_item_moves_once_the_reconnect_window_ends() {
    init_logging();
    let (a, b) = idn_pair();
    let mut config = fast_config("recovery", &["a", "b"]);
    config.channels[0].reconnect_window_ms = 300;
    let (session, _login) = connect_ok(config, &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(&session, &client, market_price("IBM.N", "IDN")).await;

    a.set_accepting(false);
    a.disconnect("connection reset").await;

    client.wait_for(status_for(handle, "channel down.")).await;
    b.wait_for_item_request("IBM.N", 1).await;
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    assert_eq!(refreshes[1].event.channel_name.as_deref(), Some("b"));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unanswered_request_moves_to_another_channel() {
    init_logging();
    let (a, b) = idn_pair();
    a.set_item_reply_for("IBM.N", ItemReply::Silent);
    let (session, _login) =
        connect_ok(fast_config("recovery", &["a", "b"]), &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");

    let handle = session
        .subscribe(market_price("IBM.N", "IDN"), client.clone())
        .expect("request is valid");

    let timed_out = client.wait_for(status_for(handle, "Request timeout")).await;
    let state = timed_out.state().expect("state");
    assert_eq!(state.stream_state, StreamState::Open);
    assert_eq!(state.code, StatusCode::Timeout);

    let stream_id = a.wait_for_item_request("IBM.N", 1).await.stream_id;
    a.wait_for_requests(1, |request| {
        matches!(request, ChannelRequest::Close { stream_id: closed } if *closed == stream_id)
    })
    .await;
    b.wait_for_item_request("IBM.N", 1).await;
    let refresh = client.wait_for(refresh_for(handle)).await;
    assert_eq!(refresh.event.channel_name.as_deref(), Some("b"));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unanswered_request_closes_the_item_when_nowhere_else_serves_it() {
    init_logging();
    let a = SimulatedProvider::new("a", vec![service(10, "IDN")]);
    a.set_item_reply(ItemReply::Silent);
    let (session, _login) = connect_ok(fast_config("recovery", &["a"]), &[a.clone()]).await;
    let client = RecordingClient::new("items");

    let handle = session
        .subscribe(market_price("IBM.N", "IDN"), client.clone())
        .expect("request is valid");

    let closed = client.wait_for(status_for(handle, "Request timeout")).await;
    let state = closed.state().expect("state");
    assert_eq!(state.stream_state, StreamState::Closed);
    assert_eq!(state.data_state, DataState::Suspect);
    assert_eq!(state.code, StatusCode::Timeout);

    a.wait_for_requests(1, |request| matches!(request, ChannelRequest::Close { .. }))
        .await;
    tokio::time::sleep(QUIET).await;
    assert_eq!(a.item_requests().len(), 1);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_recover_item_is_reopened_elsewhere() {
    init_logging();
    let (a, b) = idn_pair();
    let (session, _login) =
        connect_ok(fast_config("recovery", &["a", "b"]), &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(&session, &client, market_price("IBM.N", "IDN")).await;

    a.push_item_status("IBM.N", StreamStatus::closed_recover("try again elsewhere"))
        .await;

    let relayed = client
        .wait_for(status_for(handle, "try again elsewhere"))
        .await;
    assert_eq!(
        relayed.state().map(|state| state.stream_state),
        Some(StreamState::Open)
    );
    b.wait_for_item_request("IBM.N", 1).await;
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    assert_eq!(refreshes[1].event.channel_name.as_deref(), Some("b"));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn private_stream_is_closed_when_its_channel_is_lost() {
    init_logging();
    let (a, b) = idn_pair();
    let (session, _login) =
        connect_ok(fast_config("recovery", &["a", "b"]), &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(
        &session,
        &client,
        market_price("IBM.N", "IDN").private_stream(true),
    )
    .await;

    a.set_accepting(false);
    a.disconnect("connection reset").await;

    let closed = client.wait_for(status_for(handle, "channel down.")).await;
    let state = closed.state().expect("state");
    assert_eq!(state.stream_state, StreamState::Closed);
    assert_eq!(state.data_state, DataState::Suspect);
    b.expect_no_requests(QUIET, is_item).await;

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn item_leaves_a_service_that_stops_accepting_requests() {
    init_logging();
    let (a, b) = idn_pair();
    let (session, _login) =
        connect_ok(fast_config("recovery", &["a", "b"]), &[a.clone(), b.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(&session, &client, market_price("IBM.N", "IDN")).await;
    let stream_id = a.stream_for("IBM.N").expect("stream open");

    a.push_directory_update(vec![ServiceAction::Update(
        service(10, "IDN").with_state(false, false),
    )])
    .await;

    client
        .wait_for(status_for(handle, "Service not available"))
        .await;
    a.wait_for_requests(1, |request| {
        matches!(request, ChannelRequest::Close { stream_id: closed } if *closed == stream_id)
    })
    .await;
    b.wait_for_item_request("IBM.N", 1).await;
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    assert_eq!(refreshes[1].event.channel_name.as_deref(), Some("b"));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unregister_during_recovery_silences_the_item() {
    init_logging();
    let a = SimulatedProvider::new("a", vec![service(10, "IDN")]);
    let mut config = fast_config("recovery", &["a"]);
    config.channels[0].reconnect_window_ms = 2_000;
    let (session, _login) = connect_ok(config, &[a.clone()]).await;
    let client = RecordingClient::new("items");
    let handle = subscribed(&session, &client, market_price("IBM.N", "IDN")).await;

    a.set_accepting(false);
    a.disconnect("connection reset").await;
    client.wait_for(status_for(handle, "channel down.")).await;

    session.unregister(handle);
    a.set_accepting(true);
    eventually("channel a to reconnect", || a.is_connected()).await;

    client
        .expect_quiet(QUIET, |recorded| recorded.handle() == Some(handle))
        .await;
    assert_eq!(a.item_requests().len(), 1);

    session.close().await;
}
