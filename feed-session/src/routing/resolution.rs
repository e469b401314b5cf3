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

//! Selection of a (channel, service) binding for an item.

use crate::control_plane::channel_table::ChannelId;
use crate::control_plane::warm_standby::WarmStandbyGroups;
use crate::error::UsageError;
use crate::message::{Domain, Qos, ReqMsg};
use crate::routing::directory::DirectoryAggregator;
use crate::routing::service_list::ServiceListResolver;
use std::collections::BTreeSet;

pub(crate) const NO_SERVICE_TEXT: &str = "No matching service present.";
pub(crate) const CAPABILITY_TEXT: &str = "Capability not supported";
pub(crate) const QOS_TEXT: &str = "Service does not provide a matching QoS";

/// How an item names its service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Selector {
    Name(String),
    Id(u16),
    List(String),
    Unspecified,
}

impl Selector {
    pub(crate) fn from_request(request: &ReqMsg) -> Result<Self, UsageError> {
        match (
            request.service_name.as_ref(),
            request.service_id,
            request.service_list.as_ref(),
        ) {
            (None, None, None) => Ok(Selector::Unspecified),
            (Some(name), None, None) => Ok(Selector::Name(name.clone())),
            (None, Some(id), None) => Ok(Selector::Id(id)),
            (None, None, Some(list)) => Ok(Selector::List(list.clone())),
            _ => Err(UsageError::ConflictingServiceSelector),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BoundService {
    pub(crate) name: String,
    pub(crate) session_id: u16,
    pub(crate) provider_id: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Binding {
    pub(crate) channel: ChannelId,
    pub(crate) service: Option<BoundService>,
}

/// Why no binding exists; ordered from least to most specific.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Unresolved {
    NoService,
    CapabilityUnsupported,
    QosUnsupported,
}

impl Unresolved {
    pub(crate) fn status_text(&self) -> &'static str {
        match self {
            Unresolved::NoService => NO_SERVICE_TEXT,
            Unresolved::CapabilityUnsupported => CAPABILITY_TEXT,
            Unresolved::QosUnsupported => QOS_TEXT,
        }
    }
}

pub(crate) struct ResolveContext<'a> {
    pub(crate) directory: &'a DirectoryAggregator,
    pub(crate) service_lists: &'a ServiceListResolver,
    pub(crate) standby: &'a WarmStandbyGroups,
    /// Channels allowed to carry items, in configuration order.
    pub(crate) candidates: &'a [ChannelId],
}

pub(crate) struct ResolveRequest<'a> {
    pub(crate) selector: &'a Selector,
    pub(crate) domain: Domain,
    pub(crate) qos: Option<&'a Qos>,
    pub(crate) excluded: &'a BTreeSet<ChannelId>,
}

pub(crate) fn resolve(
    context: &ResolveContext<'_>,
    request: &ResolveRequest<'_>,
) -> Result<Binding, Unresolved> {
    match request.selector {
        Selector::Name(name) => resolve_name(context, request, name),
        Selector::Id(session_id) => match context.directory.service(*session_id) {
            Some(service) => resolve_name(context, request, &service.name),
            None => Err(Unresolved::NoService),
        },
        Selector::List(list) => {
            let mut best = Unresolved::NoService;
            for name in context.service_lists.services(list).unwrap_or_default() {
                match resolve_name(context, request, name) {
                    Ok(binding) => return Ok(binding),
                    Err(reason) => best = best.max(reason),
                }
            }
            Err(best)
        }
        Selector::Unspecified => context
            .candidates
            .iter()
            .copied()
            .find(|channel| !request.excluded.contains(channel))
            .map(|channel| Binding {
                channel,
                service: None,
            })
            .ok_or(Unresolved::NoService),
    }
}

fn resolve_name(
    context: &ResolveContext<'_>,
    request: &ResolveRequest<'_>,
    name: &str,
) -> Result<Binding, Unresolved> {
    let Some(aggregate) = context.directory.service_by_name(name) else {
        return Err(Unresolved::NoService);
    };

    // Service-based standby pairs put the member designated active for this service first.
    let mut ordered: Vec<ChannelId> = context
        .candidates
        .iter()
        .copied()
        .filter(|channel| !request.excluded.contains(channel))
        .collect();
    ordered.sort_by_key(|channel| !context.standby.is_service_active(*channel, name));

    let mut best = Unresolved::NoService;
    for channel in ordered {
        let Some(service) = context.directory.channel_service(channel, name) else {
            continue;
        };
        if !service.is_available() {
            continue;
        }
        if !service.supports_domain(request.domain) {
            best = best.max(Unresolved::CapabilityUnsupported);
            continue;
        }
        if !service.supports_qos(request.qos) {
            best = best.max(Unresolved::QosUnsupported);
            continue;
        }
        return Ok(Binding {
            channel,
            service: Some(BoundService {
                name: name.to_string(),
                session_id: aggregate.session_id,
                provider_id: service.service_id,
            }),
        });
    }
    Err(best)
}
