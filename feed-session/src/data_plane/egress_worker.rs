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

//! Egress worker that performs all transport I/O for one channel.

use crate::channel::{ChannelListener, ChannelTransport};
use crate::control_plane::channel_table::ChannelId;
use crate::data_plane::ingress_listener::ChannelIngressListener;
use crate::message::ChannelRequest;
use crate::observability::{
    events,
    fields::{self, WorkerContext},
};
use crate::runtime::sequencer::{ChannelEvent, SessionEvent};
use crate::runtime::worker_runtime::{spawn_worker_loop, worker_thread_name, WorkerHandle};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn, Level};

const EGRESS_THREAD_NAME_PREFIX: &str = "feed-egress-";
const COMPONENT: &str = "egress_worker";

/// Work the sequencer hands to a channel's worker.
#[derive(Debug)]
pub(crate) enum EgressCommand {
    /// Open a new connection; inbound traffic is tagged with `epoch`.
    Connect { epoch: u64 },
    Send(ChannelRequest),
    Close,
}

/// Worker state that owns the channel's command queue and runtime thread.
pub(crate) struct EgressChannelWorker {
    channel_name: String,
    commands: UnboundedSender<EgressCommand>,
    dispatch_handle: WorkerHandle,
}

impl EgressChannelWorker {
    /// Spawns a dedicated runtime thread for one channel.
    pub(crate) fn new(
        channel: ChannelId,
        channel_name: &str,
        transport: Arc<dyn ChannelTransport>,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        let (commands, command_receiver) = mpsc::unbounded_channel();
        let name_for_loop = channel_name.to_string();
        let dispatch_handle = spawn_worker_loop(
            worker_thread_name(EGRESS_THREAD_NAME_PREFIX, channel_name),
            move || async move {
                Self::channel_dispatch_loop(
                    channel,
                    name_for_loop,
                    transport,
                    command_receiver,
                    events,
                )
                .await;
            },
        );

        Self {
            channel_name: channel_name.to_string(),
            commands,
            dispatch_handle,
        }
    }

    pub(crate) fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Queues a command; false once the worker has stopped.
    pub(crate) fn submit(&self, command: EgressCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Closes the command queue and waits for queued work to drain.
    pub(crate) fn stop(self) {
        let Self {
            commands,
            dispatch_handle,
            ..
        } = self;
        drop(commands);
        dispatch_handle.join();
    }

    /// Executes commands in order until the queue closes.
    pub(crate) async fn channel_dispatch_loop(
        channel: ChannelId,
        channel_name: String,
        transport: Arc<dyn ChannelTransport>,
        mut commands: UnboundedReceiver<EgressCommand>,
        events: UnboundedSender<SessionEvent>,
    ) {
        let worker_context = WorkerContext::with_current_thread(channel_name.as_str());

        while let Some(command) = commands.recv().await {
            match command {
                EgressCommand::Connect { epoch } => {
                    debug!(
                        event = events::CHANNEL_CONNECT_START,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        epoch,
                        "connecting channel"
                    );
                    let listener: Arc<dyn ChannelListener> = Arc::new(
                        ChannelIngressListener::new(channel, &channel_name, epoch, events.clone()),
                    );
                    let event = match transport.connect(listener).await {
                        Ok(()) => {
                            info!(
                                event = events::CHANNEL_CONNECT_OK,
                                component = COMPONENT,
                                worker_id = worker_context.worker_id.as_str(),
                                epoch,
                                "channel connected"
                            );
                            ChannelEvent::Up
                        }
                        Err(err) => {
                            warn!(
                                event = events::CHANNEL_CONNECT_FAILED,
                                component = COMPONENT,
                                worker_id = worker_context.worker_id.as_str(),
                                epoch,
                                err = %err,
                                "channel connect failed"
                            );
                            ChannelEvent::Down {
                                reason: err.to_string(),
                            }
                        }
                    };
                    if events
                        .send(SessionEvent::Channel {
                            channel,
                            epoch,
                            event,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                EgressCommand::Send(request) => {
                    let request_label = tracing::enabled!(Level::DEBUG)
                        .then(|| fields::format_request(&request));
                    if let Some(label) = request_label.as_deref() {
                        debug!(
                            event = events::EGRESS_SEND_ATTEMPT,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            worker_thread = worker_context.worker_thread.as_str(),
                            request = label,
                            "attempting egress send"
                        );
                    }

                    let request_kind = request.kind();
                    match transport.send(request).await {
                        Ok(()) => {
                            if let Some(label) = request_label.as_deref() {
                                debug!(
                                    event = events::EGRESS_SEND_OK,
                                    component = COMPONENT,
                                    worker_id = worker_context.worker_id.as_str(),
                                    request = label,
                                    "egress send succeeded"
                                );
                            }
                        }
                        Err(err) => {
                            // Connection loss itself is reported through the listener.
                            warn!(
                                event = events::EGRESS_SEND_FAILED,
                                component = COMPONENT,
                                worker_id = worker_context.worker_id.as_str(),
                                worker_thread = worker_context.worker_thread.as_str(),
                                request_kind,
                                err = %err,
                                "egress send failed"
                            );
                        }
                    }
                }
                EgressCommand::Close => {
                    transport.close().await;
                    info!(
                        event = events::CHANNEL_CLOSED,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        "channel transport closed"
                    );
                }
            }
        }

        info!(
            event = events::EGRESS_QUEUE_CLOSED,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            reason = fields::REASON_QUEUE_CLOSED,
            "command queue closed; stopping egress worker"
        );
    }
}
