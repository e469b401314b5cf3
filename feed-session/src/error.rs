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

//! Error types surfaced by the session API.

use crate::message::Handle;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Configuration problems detected before anything is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Io(String),
    NoChannels,
    EmptyChannelName,
    DuplicateChannel(String),
    InvalidReconnectDelay(String),
    EmptyServiceListName,
    EmptyServiceList(String),
    DuplicateServiceList(String),
    StandbySameChannel(String),
    UnknownStandbyMember { group: String, channel: String },
    StandbyMemberReused(String),
    MissingTransport(String),
    UnknownTransport(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "unable to parse configuration: {err}"),
            ConfigError::Io(err) => write!(f, "unable to read configuration: {err}"),
            ConfigError::NoChannels => write!(f, "at least one channel must be configured"),
            ConfigError::EmptyChannelName => write!(f, "channel name must not be empty"),
            ConfigError::DuplicateChannel(name) => {
                write!(f, "channel '{name}' is configured more than once")
            }
            ConfigError::InvalidReconnectDelay(name) => write!(
                f,
                "channel '{name}' has a reconnect min delay above its max delay"
            ),
            ConfigError::EmptyServiceListName => write!(f, "service list name must not be empty"),
            ConfigError::EmptyServiceList(name) => {
                write!(f, "service list '{name}' must name at least one service")
            }
            ConfigError::DuplicateServiceList(name) => {
                write!(f, "service list '{name}' is already configured")
            }
            ConfigError::StandbySameChannel(group) => write!(
                f,
                "warm standby group '{group}' uses the same channel for both members"
            ),
            ConfigError::UnknownStandbyMember { group, channel } => write!(
                f,
                "warm standby group '{group}' references unknown channel '{channel}'"
            ),
            ConfigError::StandbyMemberReused(channel) => write!(
                f,
                "channel '{channel}' belongs to more than one warm standby group"
            ),
            ConfigError::MissingTransport(channel) => {
                write!(f, "no transport supplied for channel '{channel}'")
            }
            ConfigError::UnknownTransport(channel) => {
                write!(f, "transport supplied for unconfigured channel '{channel}'")
            }
        }
    }
}

impl Error for ConfigError {}

/// Invalid API usage reported synchronously at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    ConflictingServiceSelector,
    UnknownServiceList(String),
    UnknownServiceName(String),
    UnknownServiceId(u16),
    UnknownHandle(Handle),
    ItemNotRouted(Handle),
    LoginDomainRequest,
    EmptyBatch,
}

impl Display for UsageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageError::ConflictingServiceSelector => write!(
                f,
                "only one of service name, service id or service list may be specified"
            ),
            UsageError::UnknownServiceList(name) => {
                write!(f, "The service list name '{name}' does not exist.")
            }
            UsageError::UnknownServiceName(name) => {
                write!(f, "Message submitted with unknown service name {name}")
            }
            UsageError::UnknownServiceId(id) => {
                write!(f, "Message submitted with unknown service Id {id}")
            }
            UsageError::UnknownHandle(handle) => {
                write!(f, "Message submitted on unknown handle {handle}")
            }
            UsageError::ItemNotRouted(handle) => write!(
                f,
                "Message submitted on handle {handle} which is not bound to a channel"
            ),
            UsageError::LoginDomainRequest => {
                write!(f, "login streams are opened by the session, not by subscribe")
            }
            UsageError::EmptyBatch => write!(f, "batch request must name at least one item"),
        }
    }
}

impl Error for UsageError {}

/// Failures returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    InvalidConfiguration(ConfigError),
    InvalidUsage(UsageError),
    LoginRequestTimeout {
        timeout_ms: u64,
        channels: Vec<String>,
    },
    LoginRejected {
        channels: Vec<(String, String)>,
    },
    SessionClosed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidConfiguration(err) => write!(f, "invalid configuration: {err}"),
            SessionError::InvalidUsage(err) => write!(f, "invalid usage: {err}"),
            SessionError::LoginRequestTimeout {
                timeout_ms,
                channels,
            } => write!(
                f,
                "login failed (timed out after waiting {timeout_ms} milliseconds) for {}",
                channels.join(", ")
            ),
            SessionError::LoginRejected { channels } => {
                write!(f, "login failed on every channel:")?;
                for (channel, reason) in channels {
                    write!(f, " {channel}: {reason};")?;
                }
                Ok(())
            }
            SessionError::SessionClosed => write!(f, "Consumer session is closed."),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::InvalidConfiguration(err) => Some(err),
            SessionError::InvalidUsage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::InvalidConfiguration(err)
    }
}

impl From<UsageError> for SessionError {
    fn from(err: UsageError) -> Self {
        SessionError::InvalidUsage(err)
    }
}

/// Failure reported by a channel transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    ConnectFailed(String),
    SendFailed(String),
    NotConnected,
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::ConnectFailed(reason) => write!(f, "connect failed: {reason}"),
            TransportError::SendFailed(reason) => write!(f, "send failed: {reason}"),
            TransportError::NotConnected => write!(f, "transport is not connected"),
        }
    }
}

impl Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SessionError, UsageError};
    use std::error::Error;

    #[test]
    fn login_timeout_names_every_pending_channel() {
        let err = SessionError::LoginRequestTimeout {
            timeout_ms: 45_000,
            channels: vec!["channel_a".to_string(), "channel_b".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "login failed (timed out after waiting 45000 milliseconds) for channel_a, channel_b"
        );
    }

    #[test]
    fn wrapped_errors_expose_their_source() {
        let err = SessionError::from(UsageError::UnknownServiceList("FEEDS".to_string()));

        assert_eq!(
            err.source().map(|source| source.to_string()),
            Some("The service list name 'FEEDS' does not exist.".to_string())
        );
        assert!(SessionError::from(ConfigError::NoChannels).source().is_some());
        assert!(SessionError::SessionClosed.source().is_none());
    }
}
