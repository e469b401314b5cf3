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

//! Session configuration, loadable from JSON5 and validated before anything starts.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

const DEFAULT_LOGIN_TIMEOUT_MS: u64 = 45_000;
const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 45_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_RECONNECT_MIN_DELAY_MS: u64 = 1_000;
const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 5_000;
const DEFAULT_USER_NAME: &str = "user";

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub name: String,
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub warm_standby_groups: Vec<WarmStandbyConfig>,
    #[serde(default)]
    pub service_lists: Vec<ServiceListConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default)]
    pub admin_control: AdminControlConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// How long items wait for this channel to come back before moving elsewhere.
    #[serde(default)]
    pub reconnect_window_ms: u64,
}

/// Who drives refreshes of an admin stream after connect.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminControl {
    #[default]
    Api,
    User,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdminControlConfig {
    #[serde(default)]
    pub login: AdminControl,
    #[serde(default)]
    pub directory: AdminControl,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    /// Negative means unlimited, zero disables reconnection.
    #[serde(default = "default_attempt_limit")]
    pub attempt_limit: i32,
    #[serde(default = "default_reconnect_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            attempt_limit: default_attempt_limit(),
            min_delay_ms: DEFAULT_RECONNECT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_RECONNECT_MAX_DELAY_MS,
        }
    }
}

impl ReconnectConfig {
    pub fn allows_attempt(&self, attempts_made: u32) -> bool {
        self.attempt_limit < 0 || (attempts_made as i64) < self.attempt_limit as i64
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_login_timeout_ms")]
    pub login_ms: u64,
    #[serde(default = "default_directory_timeout_ms")]
    pub directory_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            login_ms: DEFAULT_LOGIN_TIMEOUT_MS,
            directory_ms: DEFAULT_DIRECTORY_TIMEOUT_MS,
            request_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl TimeoutConfig {
    pub fn login(&self) -> Duration {
        Duration::from_millis(self.login_ms)
    }

    pub fn directory(&self) -> Duration {
        Duration::from_millis(self.directory_ms)
    }

    /// Zero disables the item request timeout.
    pub fn request(&self) -> Option<Duration> {
        (self.request_ms > 0).then(|| Duration::from_millis(self.request_ms))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoginConfig {
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            application_id: None,
            position: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StandbyMode {
    #[default]
    LoginBased,
    ServiceBased,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WarmStandbyConfig {
    pub name: String,
    #[serde(default)]
    pub mode: StandbyMode,
    pub active: String,
    pub standby: String,
}

/// Virtual service name resolving to an ordered list of concrete service names.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceListConfig {
    pub name: String,
    pub services: Vec<String>,
}

impl ServiceListConfig {
    pub fn new(name: impl Into<String>, services: Vec<String>) -> Self {
        Self {
            name: name.into(),
            services,
        }
    }
}

fn default_attempt_limit() -> i32 {
    -1
}

fn default_reconnect_min_delay_ms() -> u64 {
    DEFAULT_RECONNECT_MIN_DELAY_MS
}

fn default_reconnect_max_delay_ms() -> u64 {
    DEFAULT_RECONNECT_MAX_DELAY_MS
}

fn default_login_timeout_ms() -> u64 {
    DEFAULT_LOGIN_TIMEOUT_MS
}

fn default_directory_timeout_ms() -> u64 {
    DEFAULT_DIRECTORY_TIMEOUT_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_user_name() -> String {
    DEFAULT_USER_NAME.to_string()
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin_control: AdminControlConfig::default(),
            reconnect: ReconnectConfig::default(),
            reconnect_window_ms: 0,
        }
    }
}

impl SessionConfig {
    pub fn new(name: impl Into<String>, channels: Vec<ChannelConfig>) -> Self {
        Self {
            name: name.into(),
            channels,
            timeouts: TimeoutConfig::default(),
            login: LoginConfig::default(),
            warm_standby_groups: Vec::new(),
            service_lists: Vec::new(),
        }
    }

    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig =
            json5::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_json5_str(&contents)
    }

    /// Adds a service list after checking it against the lists already configured.
    pub fn add_service_list(&mut self, list: ServiceListConfig) -> Result<(), ConfigError> {
        validate_service_list(&list)?;
        if self.service_lists.iter().any(|known| known.name == list.name) {
            return Err(ConfigError::DuplicateServiceList(list.name));
        }
        self.service_lists.push(list);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        let mut channel_names = HashSet::new();
        for channel in &self.channels {
            if channel.name.is_empty() {
                return Err(ConfigError::EmptyChannelName);
            }
            if !channel_names.insert(channel.name.as_str()) {
                return Err(ConfigError::DuplicateChannel(channel.name.clone()));
            }
            if channel.reconnect.min_delay_ms > channel.reconnect.max_delay_ms {
                return Err(ConfigError::InvalidReconnectDelay(channel.name.clone()));
            }
        }

        let mut list_names = HashSet::new();
        for list in &self.service_lists {
            validate_service_list(list)?;
            if !list_names.insert(list.name.as_str()) {
                return Err(ConfigError::DuplicateServiceList(list.name.clone()));
            }
        }

        let mut grouped = HashSet::new();
        for group in &self.warm_standby_groups {
            if group.active == group.standby {
                return Err(ConfigError::StandbySameChannel(group.name.clone()));
            }
            for member in [&group.active, &group.standby] {
                if !channel_names.contains(member.as_str()) {
                    return Err(ConfigError::UnknownStandbyMember {
                        group: group.name.clone(),
                        channel: member.clone(),
                    });
                }
                if !grouped.insert(member.as_str()) {
                    return Err(ConfigError::StandbyMemberReused(member.clone()));
                }
            }
        }

        Ok(())
    }
}

fn validate_service_list(list: &ServiceListConfig) -> Result<(), ConfigError> {
    if list.name.is_empty() {
        return Err(ConfigError::EmptyServiceListName);
    }
    if list.services.is_empty() || list.services.iter().any(String::is_empty) {
        return Err(ConfigError::EmptyServiceList(list.name.clone()));
    }
    Ok(())
}
