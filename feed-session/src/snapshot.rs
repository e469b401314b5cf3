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

//! Lock-free snapshots the sequencer publishes for readers on other threads.

use crate::control_plane::channel_table::ChannelInfo;
use crate::service::ServiceView;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) struct Versioned<T> {
    pub(crate) version: u64,
    pub(crate) value: T,
}

/// Single-writer, many-reader value with a monotonically increasing version.
pub(crate) struct VersionedSnapshot<T> {
    current: Arc<ArcSwap<Versioned<T>>>,
    next_version: Arc<AtomicU64>,
}

impl<T> Clone for VersionedSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            next_version: self.next_version.clone(),
        }
    }
}

impl<T> VersionedSnapshot<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Versioned { version: 0, value })),
            next_version: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn store(&self, value: T) {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        self.current.store(Arc::new(Versioned { version, value }));
    }

    pub(crate) fn load(&self) -> Arc<Versioned<T>> {
        self.current.load_full()
    }
}

/// Everything the facade can read without a round trip through the sequencer.
#[derive(Clone)]
pub(crate) struct SessionSnapshots {
    pub(crate) directory: VersionedSnapshot<Vec<ServiceView>>,
    pub(crate) channels: VersionedSnapshot<Vec<ChannelInfo>>,
}

impl SessionSnapshots {
    pub(crate) fn new() -> Self {
        Self {
            directory: VersionedSnapshot::new(Vec::new()),
            channels: VersionedSnapshot::new(Vec::new()),
        }
    }
}
