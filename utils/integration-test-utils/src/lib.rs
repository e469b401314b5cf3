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

mod fixtures;
pub use fixtures::{
    fast_channel, fast_config, init_logging, market_price, service, WAIT_TIMEOUT,
};
mod recorder;
mod recording_client;
pub use recording_client::{RecordedEvent, RecordingClient};
mod simulated_provider;
pub use simulated_provider::{
    ItemReply, LoginReply, SimulatedProvider, ITEM_OK_TEXT, LOGIN_ACCEPTED_TEXT,
};
