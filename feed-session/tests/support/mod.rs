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

use feed_session::{ChannelInfo, ConsumerSession, Handle, SessionConfig, SessionError};
use integration_test_utils::{RecordedEvent, RecordingClient, SimulatedProvider, WAIT_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[allow(dead_code)]
pub(crate) async fn connect(
    config: SessionConfig,
    providers: &[Arc<SimulatedProvider>],
) -> Result<(ConsumerSession, Arc<RecordingClient>), SessionError> {
    let login = RecordingClient::new("login");
    let mut builder = ConsumerSession::builder(config).login_client(login.clone());
    for provider in providers {
        builder = builder.channel(provider.name(), provider.clone());
    }
    let session = builder.connect().await?;
    Ok((session, login))
}

pub(crate) async fn connect_ok(
    config: SessionConfig,
    providers: &[Arc<SimulatedProvider>],
) -> (ConsumerSession, Arc<RecordingClient>) {
    connect(config, providers)
        .await
        .expect("session should connect")
}

/// Polls `condition` until it holds or the test wait budget runs out.
#[allow(dead_code)]
pub(crate) async fn eventually<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[allow(dead_code)]
pub(crate) fn channel<'a>(infos: &'a [ChannelInfo], name: &str) -> &'a ChannelInfo {
    infos
        .iter()
        .find(|info| info.name == name)
        .unwrap_or_else(|| panic!("channel {name} missing from {infos:?}"))
}

#[allow(dead_code)]
pub(crate) fn session_service_id(session: &ConsumerSession, name: &str) -> u16 {
    session
        .directory()
        .into_iter()
        .find(|service| service.name == name)
        .map(|service| service.service_id)
        .unwrap_or_else(|| panic!("service {name} missing from the directory"))
}

#[allow(dead_code)]
pub(crate) fn refresh_for(handle: Handle) -> impl Fn(&RecordedEvent) -> bool {
    move |recorded| recorded.handle() == Some(handle) && recorded.is_refresh()
}

#[allow(dead_code)]
pub(crate) fn status_for(handle: Handle, text: &'static str) -> impl Fn(&RecordedEvent) -> bool {
    move |recorded| {
        recorded.handle() == Some(handle) && recorded.is_status() && recorded.text() == Some(text)
    }
}

#[allow(dead_code)]
pub(crate) fn closed_for(handle: Handle) -> impl Fn(&RecordedEvent) -> bool {
    move |recorded| {
        recorded.handle() == Some(handle) && recorded.state().is_some_and(|state| state.is_closed())
    }
}
