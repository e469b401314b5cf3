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

//! Open subscriptions and their current (channel, service) bindings.

use crate::client::ConsumerClient;
use crate::control_plane::channel_table::ChannelId;
use crate::message::{Domain, Handle, ReqMsg, StreamId};
use crate::routing::resolution::{Binding, Selector, Unresolved};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ItemPhase {
    /// No binding; waiting for a directory change.
    Pending,
    /// Request sent, no refresh yet.
    Routed,
    Open,
    Suspect,
    /// Binding lost; waiting for the bound channel or a new binding.
    Recovering,
}

pub(crate) struct ItemEntry {
    pub(crate) handle: Handle,
    pub(crate) stream_id: StreamId,
    pub(crate) request: ReqMsg,
    pub(crate) selector: Selector,
    pub(crate) client: Arc<dyn ConsumerClient>,
    pub(crate) binding: Option<Binding>,
    pub(crate) phase: ItemPhase,
    pub(crate) pending_reason: Option<Unresolved>,
    /// Channels this item must not be rebound to until its next refresh.
    pub(crate) excluded: BTreeSet<ChannelId>,
    /// Channel whose reconnect window the item is waiting out.
    pub(crate) waiting_for: Option<ChannelId>,
    pub(crate) item_group: Option<Vec<u8>>,
    pub(crate) refreshed: bool,
    pub(crate) next_refresh_unsolicited: bool,
}

impl ItemEntry {
    pub(crate) fn new(
        handle: Handle,
        stream_id: StreamId,
        request: ReqMsg,
        selector: Selector,
        client: Arc<dyn ConsumerClient>,
    ) -> Self {
        Self {
            handle,
            stream_id,
            request,
            selector,
            client,
            binding: None,
            phase: ItemPhase::Pending,
            pending_reason: None,
            excluded: BTreeSet::new(),
            waiting_for: None,
            item_group: None,
            refreshed: false,
            next_refresh_unsolicited: false,
        }
    }

    /// Source-domain items are answered from the aggregate directory.
    pub(crate) fn is_source(&self) -> bool {
        self.request.domain == Domain::SOURCE
    }

    pub(crate) fn bound_channel(&self) -> Option<ChannelId> {
        self.binding.as_ref().map(|binding| binding.channel)
    }

    /// Service name reported to the application: the list name for list selectors.
    pub(crate) fn display_service_name(&self) -> Option<String> {
        match &self.selector {
            Selector::List(list) => Some(list.clone()),
            _ => self
                .binding
                .as_ref()
                .and_then(|binding| binding.service.as_ref())
                .map(|service| service.name.clone())
                .or_else(|| self.request.service_name.clone()),
        }
    }

    pub(crate) fn session_service_id(&self) -> Option<u16> {
        self.binding
            .as_ref()
            .and_then(|binding| binding.service.as_ref())
            .map(|service| service.session_id)
            .or(self.request.service_id)
    }

    /// Clears the binding and returns the channel it pointed at.
    pub(crate) fn unbind(&mut self) -> Option<ChannelId> {
        self.binding.take().map(|binding| binding.channel)
    }
}

#[derive(Default)]
pub(crate) struct ItemTable {
    items: BTreeMap<Handle, ItemEntry>,
    streams: HashMap<StreamId, Handle>,
    next_stream_id: i32,
}

impl ItemTable {
    pub(crate) fn new() -> Self {
        Self {
            next_stream_id: StreamId::FIRST_ITEM,
            ..Default::default()
        }
    }

    pub(crate) fn allocate_stream_id(&mut self) -> StreamId {
        let stream_id = StreamId(self.next_stream_id);
        self.next_stream_id += 1;
        stream_id
    }

    pub(crate) fn insert(&mut self, entry: ItemEntry) {
        self.streams.insert(entry.stream_id, entry.handle);
        self.items.insert(entry.handle, entry);
    }

    pub(crate) fn remove(&mut self, handle: Handle) -> Option<ItemEntry> {
        let entry = self.items.remove(&handle)?;
        self.streams.remove(&entry.stream_id);
        Some(entry)
    }

    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.items.contains_key(&handle)
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<&ItemEntry> {
        self.items.get(&handle)
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut ItemEntry> {
        self.items.get_mut(&handle)
    }

    pub(crate) fn by_stream(&self, stream_id: StreamId) -> Option<Handle> {
        self.streams.get(&stream_id).copied()
    }

    pub(crate) fn handles(&self) -> Vec<Handle> {
        self.items.keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn bound_to(&self, channel: ChannelId) -> Vec<Handle> {
        self.select(|entry| entry.bound_channel() == Some(channel))
    }

    /// Items with no binding that are not waiting on a particular channel.
    pub(crate) fn unbound(&self) -> Vec<Handle> {
        self.select(|entry| {
            entry.binding.is_none() && entry.waiting_for.is_none() && !entry.is_source()
        })
    }

    pub(crate) fn waiting_for(&self, channel: ChannelId) -> Vec<Handle> {
        self.select(|entry| entry.waiting_for == Some(channel))
    }

    pub(crate) fn source_items(&self) -> Vec<Handle> {
        self.select(ItemEntry::is_source)
    }

    /// Items bound to `service` on `channel` whose refresh placed them in `group`.
    pub(crate) fn in_group(&self, channel: ChannelId, service: &str, group: &[u8]) -> Vec<Handle> {
        self.select(|entry| {
            entry.item_group.as_deref() == Some(group)
                && entry.binding.as_ref().is_some_and(|binding| {
                    binding.channel == channel
                        && binding
                            .service
                            .as_ref()
                            .is_some_and(|bound| bound.name == service)
                })
        })
    }

    /// Moves every matching item from one provider group into another.
    pub(crate) fn merge_group(
        &mut self,
        channel: ChannelId,
        service: &str,
        from: &[u8],
        into: &[u8],
    ) -> usize {
        let handles = self.in_group(channel, service, from);
        for handle in &handles {
            if let Some(entry) = self.items.get_mut(handle) {
                entry.item_group = Some(into.to_vec());
            }
        }
        handles.len()
    }

    fn select(&self, predicate: impl Fn(&ItemEntry) -> bool) -> Vec<Handle> {
        self.items
            .values()
            .filter(|entry| predicate(*entry))
            .map(|entry| entry.handle)
            .collect()
    }
}
