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

//! Channel table keyed by configuration order.

use crate::channel::ChannelState;
use crate::config::{AdminControl, ChannelConfig};
use crate::message::StandbyRole;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Index of a channel in configuration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ChannelId(pub(crate) usize);

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login progress of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelLoginState {
    Pending,
    Up,
    Suspect,
    Denied,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectoryPhase {
    NotRequested,
    Requested,
    Refreshed,
    TimedOut,
}

/// Point-in-time description of one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub state: ChannelState,
    pub login_state: ChannelLoginState,
    pub standby_role: Option<StandbyRole>,
    pub services: Vec<String>,
    pub reconnect_attempts: u32,
}

pub(crate) struct ChannelEntry {
    pub(crate) id: ChannelId,
    pub(crate) name: String,
    pub(crate) config: ChannelConfig,
    pub(crate) state: ChannelState,
    pub(crate) login: ChannelLoginState,
    pub(crate) directory: DirectoryPhase,
    /// Incremented for every connection attempt; events from older attempts are dropped.
    pub(crate) epoch: u64,
    pub(crate) reconnect_attempts: u32,
    pub(crate) ever_logged_in: bool,
    pub(crate) last_failure: Option<String>,
    next_delay: Duration,
}

impl ChannelEntry {
    fn new(id: ChannelId, config: ChannelConfig) -> Self {
        let next_delay = Duration::from_millis(config.reconnect.min_delay_ms);
        Self {
            id,
            name: config.name.clone(),
            config,
            state: ChannelState::Initializing,
            login: ChannelLoginState::Pending,
            directory: DirectoryPhase::NotRequested,
            epoch: 0,
            reconnect_attempts: 0,
            ever_logged_in: false,
            last_failure: None,
            next_delay,
        }
    }

    /// Active with an accepted login.
    pub(crate) fn is_logged_in(&self) -> bool {
        self.state == ChannelState::Active
            && matches!(
                self.login,
                ChannelLoginState::Up | ChannelLoginState::Suspect
            )
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == ChannelState::Closed
    }

    /// Whether this channel no longer holds up session connect.
    pub(crate) fn directory_settled(&self) -> bool {
        match self.directory {
            DirectoryPhase::Refreshed | DirectoryPhase::TimedOut => true,
            DirectoryPhase::NotRequested => self.config.admin_control.directory == AdminControl::User,
            DirectoryPhase::Requested => false,
        }
    }

    pub(crate) fn begin_connection(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Invalidates the current connection so its late events are dropped.
    pub(crate) fn retire_connection(&mut self) {
        self.epoch += 1;
    }

    /// Next reconnect delay, or `None` once the attempt limit is used up.
    pub(crate) fn next_reconnect_delay(&mut self) -> Option<Duration> {
        if !self.config.reconnect.allows_attempt(self.reconnect_attempts) {
            return None;
        }
        let delay = self.next_delay;
        let max_delay = Duration::from_millis(self.config.reconnect.max_delay_ms);
        self.next_delay = (self.next_delay * 2).min(max_delay);
        self.reconnect_attempts += 1;
        Some(delay)
    }

    pub(crate) fn reset_backoff(&mut self) {
        self.reconnect_attempts = 0;
        self.next_delay = Duration::from_millis(self.config.reconnect.min_delay_ms);
    }
}

pub(crate) struct ChannelTable {
    entries: Vec<ChannelEntry>,
}

impl ChannelTable {
    pub(crate) fn new(channels: &[ChannelConfig]) -> Self {
        Self {
            entries: channels
                .iter()
                .enumerate()
                .map(|(index, config)| ChannelEntry::new(ChannelId(index), config.clone()))
                .collect(),
        }
    }

    /// Ids only come from this table, so lookups by id cannot miss.
    pub(crate) fn get(&self, id: ChannelId) -> &ChannelEntry {
        &self.entries[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ChannelId) -> &mut ChannelEntry {
        &mut self.entries[id.0]
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<ChannelId> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id)
    }

    pub(crate) fn ids(&self) -> Vec<ChannelId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn logged_in(&self) -> Vec<ChannelId> {
        self.entries
            .iter()
            .filter(|entry| entry.is_logged_in())
            .map(|entry| entry.id)
            .collect()
    }

    pub(crate) fn all_closed(&self) -> bool {
        self.entries.iter().all(ChannelEntry::is_closed)
    }

    pub(crate) fn name(&self, id: ChannelId) -> &str {
        &self.get(id).name
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelId, ChannelLoginState, ChannelTable};
    use crate::channel::ChannelState;
    use crate::config::{AdminControl, ChannelConfig, ReconnectConfig};
    use std::time::Duration;

    fn channel(name: &str, attempt_limit: i32) -> ChannelConfig {
        let mut config = ChannelConfig::new(name);
        config.reconnect = ReconnectConfig {
            attempt_limit,
            min_delay_ms: 100,
            max_delay_ms: 350,
        };
        config
    }

    #[test]
    fn reconnect_delay_doubles_up_to_max_and_honours_limit() {
        let mut table = ChannelTable::new(&[channel("a", 4)]);
        let entry = table.get_mut(ChannelId(0));

        let delays: Vec<_> = std::iter::from_fn(|| entry.next_reconnect_delay()).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
        assert_eq!(entry.reconnect_attempts, 4);

        entry.reset_backoff();
        assert_eq!(
            entry.next_reconnect_delay(),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn zero_attempt_limit_never_reconnects() {
        let mut table = ChannelTable::new(&[channel("a", 0)]);

        assert_eq!(table.get_mut(ChannelId(0)).next_reconnect_delay(), None);
    }

    #[test]
    fn logged_in_requires_active_state() {
        let mut table = ChannelTable::new(&[channel("a", 0), channel("b", 0)]);
        table.get_mut(ChannelId(0)).login = ChannelLoginState::Up;
        table.get_mut(ChannelId(1)).state = ChannelState::Active;
        table.get_mut(ChannelId(1)).login = ChannelLoginState::Suspect;

        assert_eq!(table.logged_in(), vec![ChannelId(1)]);
        assert_eq!(table.by_name("b"), Some(ChannelId(1)));
        assert_eq!(table.by_name("z"), None);
    }

    #[test]
    fn user_directory_control_does_not_hold_up_connect() {
        let mut user_channel = channel("a", 0);
        user_channel.admin_control.directory = AdminControl::User;
        let table = ChannelTable::new(&[user_channel, channel("b", 0)]);

        assert!(table.get(ChannelId(0)).directory_settled());
        assert!(!table.get(ChannelId(1)).directory_settled());
    }
}
