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

//! Warm-standby pairs: which member carries live traffic.

use crate::config::{StandbyMode, WarmStandbyConfig};
use crate::control_plane::channel_table::{ChannelId, ChannelTable};
use crate::message::StandbyRole;
use std::collections::{BTreeMap, HashMap};

pub(crate) struct StandbyGroup {
    pub(crate) name: String,
    pub(crate) mode: StandbyMode,
    /// Configured active member first.
    pub(crate) members: [ChannelId; 2],
    active: usize,
    service_active: BTreeMap<String, ChannelId>,
    /// Role last signalled per (member, service) in service-based mode.
    signalled: HashMap<(ChannelId, String), StandbyRole>,
}

impl StandbyGroup {
    pub(crate) fn active(&self) -> ChannelId {
        self.members[self.active]
    }

    pub(crate) fn other(&self, channel: ChannelId) -> ChannelId {
        if self.members[0] == channel {
            self.members[1]
        } else {
            self.members[0]
        }
    }

    fn set_active(&mut self, channel: ChannelId) {
        self.active = if self.members[0] == channel { 0 } else { 1 };
    }
}

/// Outcome of a login-based role change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Promotion {
    pub(crate) group: usize,
    pub(crate) previous: ChannelId,
    pub(crate) promoted: ChannelId,
}

pub(crate) struct WarmStandbyGroups {
    groups: Vec<StandbyGroup>,
    membership: HashMap<ChannelId, usize>,
}

impl WarmStandbyGroups {
    /// Builds groups from validated configuration; unknown names were rejected earlier.
    pub(crate) fn new(configs: &[WarmStandbyConfig], channels: &ChannelTable) -> Self {
        let mut groups = Vec::new();
        let mut membership = HashMap::new();
        for config in configs {
            let (Some(active), Some(standby)) = (
                channels.by_name(&config.active),
                channels.by_name(&config.standby),
            ) else {
                continue;
            };
            let index = groups.len();
            membership.insert(active, index);
            membership.insert(standby, index);
            groups.push(StandbyGroup {
                name: config.name.clone(),
                mode: config.mode,
                members: [active, standby],
                active: 0,
                service_active: BTreeMap::new(),
                signalled: HashMap::new(),
            });
        }
        Self { groups, membership }
    }

    pub(crate) fn group_of(&self, channel: ChannelId) -> Option<&StandbyGroup> {
        self.membership
            .get(&channel)
            .map(|index| &self.groups[*index])
    }

    pub(crate) fn group(&self, index: usize) -> &StandbyGroup {
        &self.groups[index]
    }

    /// Role announced in the login request; only login-based pairs carry one.
    pub(crate) fn login_role(&self, channel: ChannelId) -> Option<StandbyRole> {
        let group = self.group_of(channel)?;
        if group.mode != StandbyMode::LoginBased {
            return None;
        }
        Some(if group.active() == channel {
            StandbyRole::Active
        } else {
            StandbyRole::Standby
        })
    }

    /// Whether items may be bound to this channel.
    pub(crate) fn carries_items(&self, channel: ChannelId) -> bool {
        match self.group_of(channel) {
            Some(group) if group.mode == StandbyMode::LoginBased => group.active() == channel,
            _ => true,
        }
    }

    /// Whether this channel is the designated active side for a service.
    pub(crate) fn is_service_active(&self, channel: ChannelId, service: &str) -> bool {
        match self.group_of(channel) {
            Some(group) if group.mode == StandbyMode::ServiceBased => {
                group.service_active.get(service) == Some(&channel)
            }
            _ => false,
        }
    }

    /// Promotes the other member when the active one is lost and the other can take over.
    pub(crate) fn promote_on_loss(
        &mut self,
        lost: ChannelId,
        usable: impl Fn(ChannelId) -> bool,
    ) -> Option<Promotion> {
        let index = *self.membership.get(&lost)?;
        let group = &mut self.groups[index];
        if group.mode != StandbyMode::LoginBased || group.active() != lost {
            return None;
        }
        let candidate = group.other(lost);
        if !usable(candidate) {
            return None;
        }
        group.set_active(candidate);
        Some(Promotion {
            group: index,
            previous: lost,
            promoted: candidate,
        })
    }

    /// Lets a member that logged in take over when the active member is unavailable.
    pub(crate) fn claim_on_login(
        &mut self,
        channel: ChannelId,
        active_unavailable: impl Fn(ChannelId) -> bool,
    ) -> Option<Promotion> {
        let index = *self.membership.get(&channel)?;
        let group = &mut self.groups[index];
        let previous = group.active();
        if group.mode != StandbyMode::LoginBased
            || previous == channel
            || !active_unavailable(previous)
        {
            return None;
        }
        group.set_active(channel);
        Some(Promotion {
            group: index,
            previous,
            promoted: channel,
        })
    }

    /// Recomputes per-service active members of service-based pairs.
    ///
    /// A current assignment is kept while it stays available; otherwise the
    /// configured active member wins over the standby. Returns the role changes
    /// that still have to be signalled as `(channel, service, role)`.
    pub(crate) fn reassign_services(
        &mut self,
        services_on: impl Fn(ChannelId) -> Vec<String>,
        available: impl Fn(ChannelId, &str) -> bool,
    ) -> Vec<(ChannelId, String, StandbyRole)> {
        let mut signals = Vec::new();
        for group in self
            .groups
            .iter_mut()
            .filter(|group| group.mode == StandbyMode::ServiceBased)
        {
            let mut names: Vec<String> = group
                .members
                .iter()
                .flat_map(|member| services_on(*member))
                .collect();
            names.sort();
            names.dedup();

            group
                .service_active
                .retain(|name, _| names.iter().any(|known| known == name));
            for name in &names {
                let current = group.service_active.get(name).copied();
                let keep = current.filter(|channel| available(*channel, name));
                let chosen = keep.or_else(|| {
                    group
                        .members
                        .iter()
                        .copied()
                        .find(|member| available(*member, name))
                });
                match chosen {
                    Some(channel) => {
                        group.service_active.insert(name.clone(), channel);
                    }
                    None => {
                        group.service_active.remove(name);
                    }
                }
            }

            for member in group.members {
                for name in services_on(member) {
                    if !available(member, &name) {
                        continue;
                    }
                    let role = if group.service_active.get(&name) == Some(&member) {
                        StandbyRole::Active
                    } else {
                        StandbyRole::Standby
                    };
                    let key = (member, name.clone());
                    if group.signalled.get(&key) != Some(&role) {
                        group.signalled.insert(key, role);
                        signals.push((member, name, role));
                    }
                }
            }
        }
        signals
    }

    /// Forgets what was signalled to a member whose connection was lost.
    pub(crate) fn forget_signals(&mut self, channel: ChannelId) {
        if let Some(index) = self.membership.get(&channel) {
            self.groups[*index]
                .signalled
                .retain(|(member, _), _| *member != channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WarmStandbyGroups;
    use crate::config::{ChannelConfig, StandbyMode, WarmStandbyConfig};
    use crate::control_plane::channel_table::{ChannelId, ChannelTable};
    use crate::message::StandbyRole;

    fn groups(mode: StandbyMode) -> WarmStandbyGroups {
        let channels = ChannelTable::new(&[
            ChannelConfig::new("a"),
            ChannelConfig::new("b"),
            ChannelConfig::new("c"),
        ]);
        WarmStandbyGroups::new(
            &[WarmStandbyConfig {
                name: "pair".to_string(),
                mode,
                active: "a".to_string(),
                standby: "b".to_string(),
            }],
            &channels,
        )
    }

    const A: ChannelId = ChannelId(0);
    const B: ChannelId = ChannelId(1);
    const C: ChannelId = ChannelId(2);

    #[test]
    fn login_based_pair_routes_items_to_active_only() {
        let groups = groups(StandbyMode::LoginBased);

        assert!(groups.carries_items(A));
        assert!(!groups.carries_items(B));
        assert!(groups.carries_items(C));
        assert_eq!(groups.login_role(A), Some(StandbyRole::Active));
        assert_eq!(groups.login_role(B), Some(StandbyRole::Standby));
        assert_eq!(groups.login_role(C), None);
    }

    #[test]
    fn losing_active_promotes_usable_standby() {
        let mut groups = groups(StandbyMode::LoginBased);

        let promotion = groups.promote_on_loss(A, |_| true).expect("standby promoted");

        assert_eq!(promotion.previous, A);
        assert_eq!(promotion.promoted, B);
        assert!(groups.carries_items(B));
        assert!(!groups.carries_items(A));
        assert_eq!(groups.login_role(A), Some(StandbyRole::Standby));
    }

    #[test]
    fn losing_active_without_usable_standby_keeps_roles() {
        let mut groups = groups(StandbyMode::LoginBased);

        assert_eq!(groups.promote_on_loss(A, |_| false), None);
        assert_eq!(groups.promote_on_loss(B, |_| true), None);
        assert!(groups.carries_items(A));
    }

    #[test]
    fn standby_claims_active_when_active_is_unavailable() {
        let mut groups = groups(StandbyMode::LoginBased);

        assert_eq!(groups.claim_on_login(B, |_| false), None);
        let promotion = groups.claim_on_login(B, |_| true).expect("claimed");

        assert_eq!(promotion.promoted, B);
        assert!(groups.carries_items(B));
    }

    #[test]
    fn service_based_assignment_prefers_configured_active_and_signals_once() {
        let mut groups = groups(StandbyMode::ServiceBased);
        let services = |_: ChannelId| vec!["IDN".to_string()];

        let signals = groups.reassign_services(services, |_, _| true);

        assert!(groups.is_service_active(A, "IDN"));
        assert!(!groups.is_service_active(B, "IDN"));
        assert_eq!(
            signals,
            vec![
                (A, "IDN".to_string(), StandbyRole::Active),
                (B, "IDN".to_string(), StandbyRole::Standby),
            ]
        );
        assert!(groups.reassign_services(services, |_, _| true).is_empty());
        assert!(groups.carries_items(B));
    }

    #[test]
    fn service_based_assignment_moves_when_active_side_loses_service() {
        let mut groups = groups(StandbyMode::ServiceBased);
        let services = |_: ChannelId| vec!["IDN".to_string()];
        groups.reassign_services(services, |_, _| true);

        let signals = groups.reassign_services(services, |channel, _| channel == B);

        assert!(groups.is_service_active(B, "IDN"));
        assert_eq!(signals, vec![(B, "IDN".to_string(), StandbyRole::Active)]);

        let back = groups.reassign_services(services, |_, _| true);
        assert!(groups.is_service_active(B, "IDN"));
        assert_eq!(back, vec![(A, "IDN".to_string(), StandbyRole::Standby)]);
    }
}
