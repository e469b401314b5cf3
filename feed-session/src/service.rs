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

//! Service catalog types: what providers advertise and what the session exposes.

use crate::message::{Domain, Qos, StreamStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServiceState {
    pub up: bool,
    pub accepting_requests: bool,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            up: true,
            accepting_requests: true,
        }
    }
}

/// Provider-side item group state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupStatus {
    pub group_id: Vec<u8>,
    pub merged_to: Option<Vec<u8>>,
    pub status: Option<StreamStatus>,
}

/// One service as advertised by one provider, with its provider-local id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service_id: u16,
    pub name: String,
    pub capabilities: Vec<Domain>,
    /// Empty means the default realtime tick-by-tick quality of service.
    pub qos: Vec<Qos>,
    pub state: ServiceState,
}

impl ServiceInfo {
    pub fn new(service_id: u16, name: impl Into<String>) -> Self {
        Self {
            service_id,
            name: name.into(),
            capabilities: vec![Domain::MARKET_PRICE],
            qos: Vec::new(),
            state: ServiceState::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Domain>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_qos(mut self, qos: Vec<Qos>) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_state(mut self, up: bool, accepting_requests: bool) -> Self {
        self.state = ServiceState {
            up,
            accepting_requests,
        };
        self
    }

    pub fn is_available(&self) -> bool {
        self.state.up && self.state.accepting_requests
    }

    pub fn supports_domain(&self, domain: Domain) -> bool {
        domain == Domain::SOURCE || domain == Domain::LOGIN || self.capabilities.contains(&domain)
    }

    pub fn supports_qos(&self, qos: Option<&Qos>) -> bool {
        match qos {
            None => true,
            Some(wanted) if self.qos.is_empty() => *wanted == Qos::default(),
            Some(wanted) => self.qos.contains(wanted),
        }
    }

    pub(crate) fn same_metadata(&self, other: &ServiceInfo) -> bool {
        self.capabilities == other.capabilities && self.qos == other.qos
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceAction {
    Add(ServiceInfo),
    Update(ServiceInfo),
    Delete(u16),
    Group { service_id: u16, group: GroupStatus },
}

/// Directory traffic on a channel's directory stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryMsg {
    Refresh(Vec<ServiceInfo>),
    Update(Vec<ServiceAction>),
    Status(StreamStatus),
}

/// Session-wide view of one service, keyed by its stable session service id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceView {
    pub service_id: u16,
    pub name: String,
    pub up: bool,
    pub accepting_requests: bool,
    pub capabilities: Vec<Domain>,
    pub qos: Vec<Qos>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryAction {
    Add,
    Update,
    Delete,
}

/// One aggregate directory change as delivered on source-domain streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub action: EntryAction,
    pub service_id: u16,
    pub service: Option<ServiceView>,
}

#[cfg(test)]
mod tests {
    use super::ServiceInfo;
    use crate::message::{Domain, Qos, Rate, Timeliness};

    #[test]
    fn missing_qos_list_means_realtime_tick_by_tick() {
        let service = ServiceInfo::new(1, "IDN");

        assert!(service.supports_qos(Some(&Qos::default())));
        assert!(!service.supports_qos(Some(&Qos::new(
            Timeliness::Realtime,
            Rate::JitConflated
        ))));
        assert!(service.supports_qos(None));
    }

    #[test]
    fn source_domain_is_always_supported() {
        let service = ServiceInfo::new(1, "IDN").with_capabilities(vec![Domain::MARKET_BY_ORDER]);

        assert!(service.supports_domain(Domain::SOURCE));
        assert!(service.supports_domain(Domain::MARKET_BY_ORDER));
        assert!(!service.supports_domain(Domain::MARKET_PRICE));
    }

    #[test]
    fn available_requires_up_and_accepting() {
        assert!(ServiceInfo::new(1, "IDN").is_available());
        assert!(!ServiceInfo::new(1, "IDN").with_state(true, false).is_available());
        assert!(!ServiceInfo::new(1, "IDN").with_state(false, true).is_available());
    }
}
