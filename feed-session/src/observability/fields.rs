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

//! Canonical structured field keys and value-format helpers.

use crate::message::{ChannelRequest, StreamStatus};

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const WORKER_ID: &str = "worker_id";
pub const WORKER_THREAD: &str = "worker_thread";

pub const CHANNEL: &str = "channel";
pub const HANDLE: &str = "handle";
pub const STREAM_ID: &str = "stream_id";
pub const SERVICE: &str = "service";
pub const REQUEST_KIND: &str = "request_kind";

pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_STALE_EPOCH: &str = "stale_epoch";
pub const DEFAULT_WORKER_THREAD: &str = "unknown-thread";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub worker_id: String,
    pub worker_thread: String,
}

impl WorkerContext {
    pub fn with_current_thread(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: current_thread_name_or_default(),
        }
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_WORKER_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

/// Compact `kind:stream` label for an outbound request.
pub fn format_request(request: &ChannelRequest) -> String {
    match request {
        ChannelRequest::Login(_) => "login".to_string(),
        ChannelRequest::Directory { stream_id } => format!("directory:{stream_id}"),
        ChannelRequest::Item(item) => format!("item:{}:{}", item.stream_id, item.name),
        ChannelRequest::Close { stream_id } => format!("close:{stream_id}"),
        ChannelRequest::Post(post) => format!("post:{}", post.stream_id),
        ChannelRequest::Generic(generic) => format!("generic:{}", generic.stream_id),
        ChannelRequest::ConsumerStatus { service_id, role } => {
            format!("consumer_status:{service_id}:{role:?}")
        }
    }
}

pub fn format_status(status: &StreamStatus) -> String {
    format!(
        "{:?}/{:?}/{:?} '{}'",
        status.stream_state, status.data_state, status.code, status.text
    )
}

pub fn format_optional(value: Option<&str>) -> &str {
    value.unwrap_or(NONE)
}

#[cfg(test)]
mod tests {
    use super::{format_optional, format_request, format_status, thread_name_or_default};
    use super::{DEFAULT_WORKER_THREAD, NONE};
    use crate::message::{ChannelRequest, Domain, ItemRequest, StreamId, StreamStatus};

    #[test]
    fn format_request_includes_stream_and_item_name() {
        let request = ChannelRequest::Item(ItemRequest {
            stream_id: StreamId(5),
            domain: Domain::MARKET_PRICE,
            name: "TRI.N".to_string(),
            service_id: Some(1),
            qos: None,
            private_stream: false,
            streaming: true,
        });

        assert_eq!(format_request(&request), "item:5:TRI.N");
        assert_eq!(
            format_request(&ChannelRequest::Close {
                stream_id: StreamId(9)
            }),
            "close:9"
        );
    }

    #[test]
    fn format_status_is_stable() {
        assert_eq!(
            format_status(&StreamStatus::open_suspect("Request timeout")),
            "Open/Suspect/None 'Request timeout'"
        );
    }

    #[test]
    fn optional_and_thread_names_fall_back() {
        assert_eq!(format_optional(None), NONE);
        assert_eq!(format_optional(Some("IDN")), "IDN");
        assert_eq!(thread_name_or_default(None), DEFAULT_WORKER_THREAD);
        assert_eq!(thread_name_or_default(Some("named-thread")), "named-thread");
    }
}
