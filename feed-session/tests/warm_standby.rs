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
    ChannelRequest, ConsumerSession, SessionConfig, StandbyMode, StandbyRole, WarmStandbyConfig,
};
use integration_test_utils::{
    fast_config, init_logging, market_price, service, RecordingClient, SimulatedProvider,
};
use std::sync::Arc;
use std::time::Duration;
use support::{channel, connect_ok, eventually, refresh_for};

fn standby_config(mode: StandbyMode) -> SessionConfig {
    let mut config = fast_config("standby", &["a", "b"]);
    config.warm_standby_groups.push(WarmStandbyConfig {
        name: "pair".to_string(),
        mode,
        active: "a".to_string(),
        standby: "b".to_string(),
    });
    config
}

fn providers() -> [Arc<SimulatedProvider>; 2] {
    [
        SimulatedProvider::new("a", vec![service(10, "IDN")]),
        SimulatedProvider::new("b", vec![service(20, "IDN")]),
    ]
}

/// The member currently holding the active role, with the other one.
fn roles(
    session: &ConsumerSession,
    providers: &[Arc<SimulatedProvider>; 2],
) -> (Arc<SimulatedProvider>, Arc<SimulatedProvider>) {
    let infos = session.query_channel_info();
    let [a, b] = providers;
    if channel(&infos, "a").standby_role == Some(StandbyRole::Active) {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

fn consumer_status(request: &ChannelRequest) -> Option<(u16, StandbyRole)> {
    match request {
        ChannelRequest::ConsumerStatus { service_id, role } => Some((*service_id, *role)),
        _ => None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn login_based_pair_announces_one_active_member() {
    init_logging();
    let providers = providers();
    let (session, _login) = connect_ok(standby_config(StandbyMode::LoginBased), &providers).await;

    let infos = session.query_channel_info();
    let mut announced: Vec<Option<StandbyRole>> = ["a", "b"]
        .iter()
        .map(|name| channel(&infos, name).standby_role)
        .collect();
    announced.sort_by_key(|role| *role == Some(StandbyRole::Standby));
    assert_eq!(
        announced,
        vec![Some(StandbyRole::Active), Some(StandbyRole::Standby)]
    );

    let (active, standby) = roles(&session, &providers);
    let client = RecordingClient::new("items");
    let handle = session
        .subscribe(market_price("IBM.N", "IDN"), client.clone())
        .expect("request is valid");
    let refresh = client.wait_for(refresh_for(handle)).await;
    assert_eq!(refresh.event.channel_name.as_deref(), Some(active.name()));
    standby
        .expect_no_requests(Duration::from_millis(200), |request| {
            matches!(request, ChannelRequest::Item(_))
        })
        .await;

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn standby_is_promoted_when_the_active_member_is_lost() {
    init_logging();
    let providers = providers();
    let (session, _login) = connect_ok(standby_config(StandbyMode::LoginBased), &providers).await;
    let (active, standby) = roles(&session, &providers);
    let client = RecordingClient::new("items");
    let handle = session
        .subscribe(market_price("IBM.N", "IDN"), client.clone())
        .expect("request is valid");
    client.wait_for(refresh_for(handle)).await;

    active.set_accepting(false);
    active.disconnect("connection reset").await;

    standby
        .wait_for_requests(1, |request| {
            matches!(request, ChannelRequest::Login(login) if login.role == Some(StandbyRole::Active))
        })
        .await;
    standby.wait_for_item_request("IBM.N", 1).await;
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    assert_eq!(
        refreshes[1].event.channel_name.as_deref(),
        Some(standby.name())
    );
    assert!(!refreshes[1].refresh().expect("refresh").solicited);

    eventually("standby to report the active role", || {
        channel(&session.query_channel_info(), standby.name()).standby_role
            == Some(StandbyRole::Active)
    })
    .await;

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn service_based_pair_signals_roles_per_service() {
    init_logging();
    let providers = providers();
    let (session, _login) =
        connect_ok(standby_config(StandbyMode::ServiceBased), &providers).await;
    let [a, b] = &providers;

    let on_a = a
        .wait_for_requests(1, |request| consumer_status(request).is_some())
        .await;
    let on_b = b
        .wait_for_requests(1, |request| consumer_status(request).is_some())
        .await;
    let mut signalled = [consumer_status(&on_a[0]), consumer_status(&on_b[0])];
    signalled.sort_by_key(|signal| signal.map(|(_, role)| role == StandbyRole::Standby));
    assert_eq!(
        signalled.map(|signal| signal.map(|(_, role)| role)),
        [Some(StandbyRole::Active), Some(StandbyRole::Standby)]
    );
    let (active_id, _) = signalled[0].expect("active signal");
    let (standby_id, _) = signalled[1].expect("standby signal");

    let (active, standby) = if active_id == 10 {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    };
    active.set_accepting(false);
    active.disconnect("connection reset").await;

    let signals = standby
        .wait_for_requests(2, |request| consumer_status(request).is_some())
        .await;
    assert_eq!(
        consumer_status(&signals[1]),
        Some((standby_id, StandbyRole::Active))
    );

    session.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn service_based_pair_moves_items_without_a_suspect_status() {
    init_logging();
    let providers = providers();
    let mut config = standby_config(StandbyMode::ServiceBased);
    for channel in &mut config.channels {
        channel.reconnect_window_ms = 2_000;
    }
    let (session, _login) = connect_ok(config, &providers).await;
    let client = RecordingClient::new("items");
    let handle = session
        .subscribe(market_price("IBM.N", "IDN"), client.clone())
        .expect("request is valid");
    let first = client.wait_for(refresh_for(handle)).await;
    let [a, b] = &providers;
    let (serving, partner) = if first.event.channel_name.as_deref() == Some(a.name()) {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    };

    serving.set_accepting(false);
    serving.disconnect("connection reset").await;

    partner.wait_for_item_request("IBM.N", 1).await;
    let refreshes = client.wait_for_count(2, refresh_for(handle)).await;
    assert_eq!(
        refreshes[1].event.channel_name.as_deref(),
        Some(partner.name())
    );
    assert!(!refreshes[1].refresh().expect("refresh").solicited);
    assert!(client
        .history_for(handle)
        .iter()
        .all(|recorded| recorded.text() != Some("channel down.")));

    session.close().await;
}
