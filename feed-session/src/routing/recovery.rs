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

//! Recovery policy for items that lost their binding.
//!
//! [`plan`] is a pure decision: it says what the application sees now and
//! where the item may be rebound. The session core carries out the plan.

use crate::control_plane::channel_table::ChannelId;
use crate::message::{StatusCode, StreamStatus};

pub(crate) const CHANNEL_DOWN_TEXT: &str = "channel down.";
pub(crate) const SERVICE_DOWN_TEXT: &str = "Service not available";
pub(crate) const GROUP_CLOSED_RECOVER_TEXT: &str = "Group closed-recover.";
pub(crate) const REQUEST_TIMEOUT_TEXT: &str = "Request timeout";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecoveryCause {
    /// The bound channel left the Active state; `wait` when it has a reconnect window.
    ChannelDown { channel: ChannelId, wait: bool },
    ServiceUnavailable,
    /// Provider closed the item's service group; carries the group status if any.
    GroupClosedRecover(Option<StreamStatus>),
    /// Provider closed this one item with a recoverable state.
    ItemClosedRecover(StreamStatus),
    RequestTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RetryScope {
    /// Any viable binding; stay pending when none exists.
    Anywhere,
    /// Hold the item for this channel until its reconnect window ends.
    WaitForChannel(ChannelId),
    /// Other channels first, then the current one again; stay pending when none fits.
    PreferOtherChannel,
    /// Another channel carrying the same service, or close with the given status.
    ElsewhereOrClose(StreamStatus),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecoveryPlan {
    Terminal(StreamStatus),
    Retry {
        status: StreamStatus,
        scope: RetryScope,
    },
}

pub(crate) fn plan(cause: &RecoveryCause, private_stream: bool) -> RecoveryPlan {
    match cause {
        RecoveryCause::ChannelDown { channel, wait } => {
            if private_stream {
                return RecoveryPlan::Terminal(StreamStatus::closed_suspect(CHANNEL_DOWN_TEXT));
            }
            RecoveryPlan::Retry {
                status: StreamStatus::open_suspect(CHANNEL_DOWN_TEXT),
                scope: if *wait {
                    RetryScope::WaitForChannel(*channel)
                } else {
                    RetryScope::Anywhere
                },
            }
        }
        RecoveryCause::ServiceUnavailable => {
            if private_stream {
                return RecoveryPlan::Terminal(StreamStatus::closed_suspect(SERVICE_DOWN_TEXT));
            }
            RecoveryPlan::Retry {
                status: StreamStatus::open_suspect(SERVICE_DOWN_TEXT),
                scope: RetryScope::Anywhere,
            }
        }
        RecoveryCause::GroupClosedRecover(provider) => {
            let (text, code) = provider
                .as_ref()
                .filter(|status| !status.text.is_empty())
                .map(|status| (status.text.clone(), status.code))
                .unwrap_or_else(|| (GROUP_CLOSED_RECOVER_TEXT.to_string(), StatusCode::None));
            if private_stream {
                return RecoveryPlan::Terminal(StreamStatus::closed_suspect(text).with_code(code));
            }
            RecoveryPlan::Retry {
                status: StreamStatus::open_suspect(text).with_code(code),
                scope: RetryScope::PreferOtherChannel,
            }
        }
        RecoveryCause::ItemClosedRecover(provider) => {
            if private_stream {
                return RecoveryPlan::Terminal(provider.clone());
            }
            RecoveryPlan::Retry {
                status: StreamStatus::open_suspect(provider.text.clone()).with_code(provider.code),
                scope: RetryScope::ElsewhereOrClose(provider.clone()),
            }
        }
        RecoveryCause::RequestTimeout => {
            let terminal =
                StreamStatus::closed_suspect(REQUEST_TIMEOUT_TEXT).with_code(StatusCode::Timeout);
            if private_stream {
                return RecoveryPlan::Terminal(terminal);
            }
            RecoveryPlan::Retry {
                status: StreamStatus::open_suspect(REQUEST_TIMEOUT_TEXT)
                    .with_code(StatusCode::Timeout),
                scope: RetryScope::ElsewhereOrClose(terminal),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{plan, RecoveryCause, RecoveryPlan, RetryScope, CHANNEL_DOWN_TEXT};
    use crate::control_plane::channel_table::ChannelId;
    use crate::message::{DataState, StatusCode, StreamState, StreamStatus};

    #[test]
    fn channel_down_waits_only_when_a_window_is_configured() {
        let waiting = plan(
            &RecoveryCause::ChannelDown {
                channel: ChannelId(1),
                wait: true,
            },
            false,
        );
        let moving = plan(
            &RecoveryCause::ChannelDown {
                channel: ChannelId(1),
                wait: false,
            },
            false,
        );

        assert_eq!(
            waiting,
            RecoveryPlan::Retry {
                status: StreamStatus::open_suspect(CHANNEL_DOWN_TEXT),
                scope: RetryScope::WaitForChannel(ChannelId(1)),
            }
        );
        assert!(matches!(
            moving,
            RecoveryPlan::Retry {
                scope: RetryScope::Anywhere,
                ..
            }
        ));
    }

    #[test]
    fn private_streams_are_never_migrated() {
        for cause in [
            RecoveryCause::ChannelDown {
                channel: ChannelId(0),
                wait: true,
            },
            RecoveryCause::ServiceUnavailable,
            RecoveryCause::GroupClosedRecover(None),
            RecoveryCause::RequestTimeout,
        ] {
            let RecoveryPlan::Terminal(status) = plan(&cause, true) else {
                panic!("private stream should close on {cause:?}");
            };
            assert_eq!(status.stream_state, StreamState::Closed);
            assert_eq!(status.data_state, DataState::Suspect);
        }
    }

    #[test]
    fn item_closed_recover_falls_back_to_provider_status() {
        let provider = StreamStatus::closed_recover("item unavailable").with_code(StatusCode::NotFound);

        let RecoveryPlan::Retry { status, scope } =
            plan(&RecoveryCause::ItemClosedRecover(provider.clone()), false)
        else {
            panic!("public item should be retried");
        };

        assert_eq!(status.stream_state, StreamState::Open);
        assert_eq!(status.text, "item unavailable");
        assert_eq!(status.code, StatusCode::NotFound);
        assert_eq!(scope, RetryScope::ElsewhereOrClose(provider));
    }

    #[test]
    fn request_timeout_retries_elsewhere_then_closes() {
        let RecoveryPlan::Retry { status, scope } = plan(&RecoveryCause::RequestTimeout, false)
        else {
            panic!("public item should be retried");
        };

        assert_eq!(status.text, "Request timeout");
        assert_eq!(status.stream_state, StreamState::Open);
        let RetryScope::ElsewhereOrClose(terminal) = scope else {
            panic!("timeout should only move to another channel");
        };
        assert_eq!(terminal.stream_state, StreamState::Closed);
        assert_eq!(terminal.code, StatusCode::Timeout);
    }

    #[test]
    fn group_closed_recover_uses_provider_text_when_present() {
        let RecoveryPlan::Retry { status, scope } = plan(
            &RecoveryCause::GroupClosedRecover(Some(StreamStatus::closed_recover("group gone"))),
            false,
        ) else {
            panic!("public item should be retried");
        };

        assert_eq!(status.text, "group gone");
        assert_eq!(scope, RetryScope::PreferOtherChannel);
    }
}
