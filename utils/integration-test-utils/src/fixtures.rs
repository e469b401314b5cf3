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

use feed_session::{ChannelConfig, Domain, ReqMsg, ServiceInfo, SessionConfig, TimeoutConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Upper bound for any single wait in a test.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

const LOGIN_TIMEOUT_MS: u64 = 1_000;
const DIRECTORY_TIMEOUT_MS: u64 = 1_000;
const REQUEST_TIMEOUT_MS: u64 = 400;
const RECONNECT_MIN_DELAY_MS: u64 = 20;
const RECONNECT_MAX_DELAY_MS: u64 = 40;

/// Installs a test-friendly subscriber once per process; `RUST_LOG` selects levels.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Channel that reconnects quickly and forever.
pub fn fast_channel(name: &str) -> ChannelConfig {
    let mut channel = ChannelConfig::new(name);
    channel.reconnect.min_delay_ms = RECONNECT_MIN_DELAY_MS;
    channel.reconnect.max_delay_ms = RECONNECT_MAX_DELAY_MS;
    channel
}

/// Session over `channels` with timeouts short enough for tests.
pub fn fast_config(name: &str, channels: &[&str]) -> SessionConfig {
    let mut config = SessionConfig::new(
        name,
        channels.iter().map(|channel| fast_channel(channel)).collect(),
    );
    config.timeouts = TimeoutConfig {
        login_ms: LOGIN_TIMEOUT_MS,
        directory_ms: DIRECTORY_TIMEOUT_MS,
        request_ms: REQUEST_TIMEOUT_MS,
    };
    config
}

pub fn market_price(item_name: &str, service_name: &str) -> ReqMsg {
    ReqMsg::new(Domain::MARKET_PRICE, item_name).service_name(service_name)
}

pub fn service(service_id: u16, name: &str) -> ServiceInfo {
    ServiceInfo::new(service_id, name)
}
