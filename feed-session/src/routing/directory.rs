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

//! Merges per-channel service catalogs into one session-wide directory.
//!
//! Each channel keeps its own provider-local view. The aggregate is recomputed
//! per service name whenever a channel's view of that name changes, and only a
//! visible difference in the aggregate produces a [`DirectoryChange`].

use crate::control_plane::channel_table::ChannelId;
use crate::observability::events;
use crate::service::{GroupStatus, ServiceAction, ServiceInfo, ServiceView};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

const COMPONENT: &str = "directory_aggregator";
const FIRST_SESSION_SERVICE_ID: u16 = 1;

#[derive(Default)]
struct ChannelDirectory {
    refreshed: bool,
    services: BTreeMap<u16, ServiceInfo>,
}

impl ChannelDirectory {
    fn by_name(&self, name: &str) -> Option<&ServiceInfo> {
        self.services.values().find(|service| service.name == name)
    }
}

pub(crate) struct AggregateService {
    pub(crate) session_id: u16,
    pub(crate) name: String,
    /// Channel whose advertisement supplies the aggregate metadata.
    pub(crate) source: ChannelId,
    metadata: ServiceInfo,
    up: bool,
    accepting_requests: bool,
}

impl AggregateService {
    pub(crate) fn view(&self) -> ServiceView {
        ServiceView {
            service_id: self.session_id,
            name: self.name.clone(),
            up: self.up,
            accepting_requests: self.accepting_requests,
            capabilities: self.metadata.capabilities.clone(),
            qos: self.metadata.qos.clone(),
        }
    }

    pub(crate) fn is_available(&self) -> bool {
        self.up && self.accepting_requests
    }
}

/// Aggregate-level change, keyed by session service id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectoryChange {
    Added(u16),
    Updated(u16),
    Deleted(u16),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GroupEvent {
    pub(crate) channel: ChannelId,
    pub(crate) service_name: String,
    pub(crate) group: GroupStatus,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DirectoryOutcome {
    pub(crate) changes: Vec<DirectoryChange>,
    pub(crate) group_events: Vec<GroupEvent>,
}

pub(crate) struct DirectoryAggregator {
    channels: Vec<ChannelDirectory>,
    ids_by_name: HashMap<String, u16>,
    next_session_id: u16,
    services: BTreeMap<u16, AggregateService>,
    /// Views removed from the aggregate, kept for delete notifications.
    retired: HashMap<u16, ServiceView>,
}

impl DirectoryAggregator {
    pub(crate) fn new(channel_count: usize) -> Self {
        Self {
            channels: (0..channel_count)
                .map(|_| ChannelDirectory::default())
                .collect(),
            ids_by_name: HashMap::new(),
            next_session_id: FIRST_SESSION_SERVICE_ID,
            services: BTreeMap::new(),
            retired: HashMap::new(),
        }
    }

    pub(crate) fn is_refreshed(&self, channel: ChannelId) -> bool {
        self.channels[channel.0].refreshed
    }

    /// Replaces a channel's catalog wholesale and admits it into the aggregate.
    pub(crate) fn apply_refresh(
        &mut self,
        channel: ChannelId,
        services: Vec<ServiceInfo>,
    ) -> Vec<DirectoryChange> {
        let directory = &mut self.channels[channel.0];
        let mut affected: BTreeSet<String> = directory
            .services
            .values()
            .map(|service| service.name.clone())
            .collect();
        directory.refreshed = true;
        directory.services = services
            .into_iter()
            .map(|service| (service.service_id, service))
            .collect();
        affected.extend(directory.services.values().map(|service| service.name.clone()));

        self.recompute_all(affected)
    }

    /// Applies incremental changes; `None` when the channel has no accepted refresh yet.
    pub(crate) fn apply_update(
        &mut self,
        channel: ChannelId,
        actions: Vec<ServiceAction>,
    ) -> Option<DirectoryOutcome> {
        let directory = &mut self.channels[channel.0];
        if !directory.refreshed {
            return None;
        }

        let mut affected = BTreeSet::new();
        let mut group_events = Vec::new();
        for action in actions {
            match action {
                ServiceAction::Add(service) | ServiceAction::Update(service) => {
                    affected.insert(service.name.clone());
                    if let Some(previous) = directory.services.insert(service.service_id, service)
                    {
                        affected.insert(previous.name);
                    }
                }
                ServiceAction::Delete(service_id) => {
                    if let Some(previous) = directory.services.remove(&service_id) {
                        affected.insert(previous.name);
                    }
                }
                ServiceAction::Group { service_id, group } => {
                    if let Some(service) = directory.services.get(&service_id) {
                        group_events.push(GroupEvent {
                            channel,
                            service_name: service.name.clone(),
                            group,
                        });
                    }
                }
            }
        }

        Some(DirectoryOutcome {
            changes: self.recompute_all(affected),
            group_events,
        })
    }

    /// Drops a channel's contribution until it delivers a fresh refresh.
    pub(crate) fn clear_channel(&mut self, channel: ChannelId) -> Vec<DirectoryChange> {
        let directory = &mut self.channels[channel.0];
        directory.refreshed = false;
        let affected: BTreeSet<String> = std::mem::take(&mut directory.services)
            .into_values()
            .map(|service| service.name)
            .collect();
        self.recompute_all(affected)
    }

    pub(crate) fn service(&self, session_id: u16) -> Option<&AggregateService> {
        self.services.get(&session_id)
    }

    pub(crate) fn service_by_name(&self, name: &str) -> Option<&AggregateService> {
        self.ids_by_name
            .get(name)
            .and_then(|session_id| self.services.get(session_id))
    }

    /// View for a session id, including services that were just deleted.
    pub(crate) fn view(&self, session_id: u16) -> Option<ServiceView> {
        self.services
            .get(&session_id)
            .map(AggregateService::view)
            .or_else(|| self.retired.get(&session_id).cloned())
    }

    pub(crate) fn views(&self) -> Vec<ServiceView> {
        self.services.values().map(AggregateService::view).collect()
    }

    /// A channel's own advertisement of a service, if it has an accepted refresh.
    pub(crate) fn channel_service(&self, channel: ChannelId, name: &str) -> Option<&ServiceInfo> {
        let directory = &self.channels[channel.0];
        if !directory.refreshed {
            return None;
        }
        directory.by_name(name)
    }

    pub(crate) fn channel_service_names(&self, channel: ChannelId) -> Vec<String> {
        self.channels[channel.0]
            .services
            .values()
            .map(|service| service.name.clone())
            .collect()
    }

    fn recompute_all(&mut self, names: BTreeSet<String>) -> Vec<DirectoryChange> {
        names
            .into_iter()
            .filter_map(|name| self.recompute(&name))
            .collect()
    }

    fn recompute(&mut self, name: &str) -> Option<DirectoryChange> {
        let advertisers: Vec<(ChannelId, &ServiceInfo)> = self
            .channels
            .iter()
            .enumerate()
            .filter(|(_, directory)| directory.refreshed)
            .filter_map(|(index, directory)| {
                directory.by_name(name).map(|service| (ChannelId(index), service))
            })
            .collect();

        let Some((first_channel, _)) = advertisers.first().copied() else {
            let session_id = *self.ids_by_name.get(name)?;
            let removed = self.services.remove(&session_id)?;
            self.retired.insert(session_id, removed.view());
            return Some(DirectoryChange::Deleted(session_id));
        };

        let session_id = match self.ids_by_name.get(name) {
            Some(session_id) => *session_id,
            None => {
                let Some(session_id) =
                    allocate_session_id(&mut self.next_session_id, &self.services, &self.retired)
                else {
                    warn!(
                        event = events::DIRECTORY_IDS_EXHAUSTED,
                        component = COMPONENT,
                        service = name,
                        known_services = self.ids_by_name.len(),
                        "no free session service id; service left out of the directory"
                    );
                    return None;
                };
                self.ids_by_name.insert(name.to_string(), session_id);
                session_id
            }
        };

        let previous = self.services.get(&session_id);
        let source = previous
            .map(|service| service.source)
            .filter(|source| advertisers.iter().any(|(channel, _)| channel == source))
            .unwrap_or(first_channel);
        let Some(metadata) = advertisers
            .iter()
            .find(|(channel, _)| *channel == source)
            .map(|(_, service)| (*service).clone())
        else {
            return None;
        };

        let aggregate = AggregateService {
            session_id,
            name: name.to_string(),
            source,
            up: advertisers.iter().any(|(_, service)| service.state.up),
            accepting_requests: advertisers
                .iter()
                .any(|(_, service)| service.is_available()),
            metadata,
        };

        let change = match previous {
            None => Some(DirectoryChange::Added(session_id)),
            Some(previous) if previous.view() != aggregate.view() => {
                Some(DirectoryChange::Updated(session_id))
            }
            Some(_) => None,
        };

        if change.is_some() {
            for (channel, service) in &advertisers {
                if *channel != source && !service.same_metadata(&aggregate.metadata) {
                    warn!(
                        event = events::DIRECTORY_METADATA_MISMATCH,
                        component = COMPONENT,
                        service = name,
                        channel = channel.0,
                        source_channel = source.0,
                        "service metadata differs between channels; aggregate keeps the first advertiser"
                    );
                }
            }
        }

        self.retired.remove(&session_id);
        self.services.insert(session_id, aggregate);
        change
    }
}

/// Next id not owned by any known name, live or retired.
fn allocate_session_id(
    next: &mut u16,
    services: &BTreeMap<u16, AggregateService>,
    retired: &HashMap<u16, ServiceView>,
) -> Option<u16> {
    for _ in 0..=u16::MAX {
        let candidate = *next;
        *next = candidate.checked_add(1).unwrap_or(FIRST_SESSION_SERVICE_ID);
        if candidate >= FIRST_SESSION_SERVICE_ID
            && !services.contains_key(&candidate)
            && !retired.contains_key(&candidate)
        {
            return Some(candidate);
        }
    }
    None
}
