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

//! Service lists: virtual names for ordered sets of concrete services.

use crate::config::ServiceListConfig;
use std::collections::HashMap;

pub(crate) struct ServiceListResolver {
    lists: HashMap<String, Vec<String>>,
}

impl ServiceListResolver {
    pub(crate) fn new(lists: &[ServiceListConfig]) -> Self {
        Self {
            lists: lists
                .iter()
                .map(|list| (list.name.clone(), list.services.clone()))
                .collect(),
        }
    }

    /// Concrete service names in preference order.
    pub(crate) fn services(&self, list: &str) -> Option<&[String]> {
        self.lists.get(list).map(Vec::as_slice)
    }

    pub(crate) fn contains(&self, list: &str) -> bool {
        self.lists.contains_key(list)
    }
}
