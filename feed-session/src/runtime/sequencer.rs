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

//! The session sequencer: the only place session state is mutated.
//!
//! Every input (application command, channel traffic, timer) arrives as a
//! [`SessionEvent`] on one unbounded queue. The sequencer feeds it to the
//! synchronous [`SessionCore`] and then carries out the effects the core
//! produced, in order.

use crate::client::ConsumerClient;
use crate::control_plane::channel_table::ChannelId;
use crate::data_plane::egress_worker::{EgressChannelWorker, EgressCommand};
use crate::data_plane::notification_dispatcher::Notification;
use crate::error::{SessionError, UsageError};
use crate::message::{ChannelMessage, Handle, LoginRequest, ReqMsg, SubmitMsg};
use crate::observability::{events, fields};
use crate::routing::resolution::Selector;
use crate::runtime::timers::{self, TimerId};
use crate::runtime::worker_runtime::WorkerHandle;
use crate::session_core::{Effect, SessionCore};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const COMPONENT: &str = "session_sequencer";

/// What a channel's worker or listener observed.
#[derive(Debug)]
pub(crate) enum ChannelEvent {
    Up,
    Down { reason: String },
    Message(ChannelMessage),
}

pub(crate) enum SessionEvent {
    Start {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Channel {
        channel: ChannelId,
        epoch: u64,
        event: ChannelEvent,
    },
    Timer(TimerId),
    Subscribe {
        handle: Handle,
        request: ReqMsg,
        selector: Selector,
        client: Arc<dyn ConsumerClient>,
    },
    SubscribeBatch {
        batch: Handle,
        items: Vec<(Handle, ReqMsg)>,
        selector: Selector,
        client: Arc<dyn ConsumerClient>,
    },
    Unregister(Handle),
    Submit {
        handle: Handle,
        msg: SubmitMsg,
        reply: oneshot::Sender<Result<(), UsageError>>,
    },
    ReissueLogin(LoginRequest),
    Close {
        reply: Option<oneshot::Sender<()>>,
    },
}

pub(crate) struct SessionSequencer {
    core: SessionCore,
    events: UnboundedReceiver<SessionEvent>,
    /// Handed to timers so they can wake the sequencer.
    events_tx: UnboundedSender<SessionEvent>,
    egress: Vec<EgressChannelWorker>,
    notifications: Option<UnboundedSender<Notification>>,
    dispatcher: Option<WorkerHandle>,
    connect_reply: Option<oneshot::Sender<Result<(), SessionError>>>,
}

impl SessionSequencer {
    pub(crate) fn new(
        core: SessionCore,
        events: UnboundedReceiver<SessionEvent>,
        events_tx: UnboundedSender<SessionEvent>,
        egress: Vec<EgressChannelWorker>,
        notifications: UnboundedSender<Notification>,
        dispatcher: WorkerHandle,
    ) -> Self {
        Self {
            core,
            events,
            events_tx,
            egress,
            notifications: Some(notifications),
            dispatcher: Some(dispatcher),
            connect_reply: None,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
            if self.core.is_closed() {
                break;
            }
        }

        info!(
            event = events::SEQUENCER_STOPPED,
            component = COMPONENT,
            "session sequencer stopped"
        );
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Start { reply } => {
                self.connect_reply = Some(reply);
                self.core.start();
                self.apply_effects().await;
            }
            SessionEvent::Channel {
                channel,
                epoch,
                event,
            } => {
                self.core.on_channel_event(channel, epoch, event);
                self.apply_effects().await;
            }
            SessionEvent::Timer(id) => {
                self.core.on_timer(id);
                self.apply_effects().await;
            }
            SessionEvent::Subscribe {
                handle,
                request,
                selector,
                client,
            } => {
                self.core.subscribe(handle, request, selector, client);
                self.apply_effects().await;
            }
            SessionEvent::SubscribeBatch {
                batch,
                items,
                selector,
                client,
            } => {
                self.core.subscribe_batch(batch, items, selector, client);
                self.apply_effects().await;
            }
            SessionEvent::Unregister(handle) => {
                self.core.unregister(handle);
                self.apply_effects().await;
            }
            SessionEvent::Submit { handle, msg, reply } => {
                let result = self.core.submit(handle, msg);
                self.apply_effects().await;
                // The caller may have stopped waiting.
                let _ = reply.send(result);
            }
            SessionEvent::ReissueLogin(request) => {
                self.core.reissue_login(request);
                self.apply_effects().await;
            }
            SessionEvent::Close { reply } => {
                self.core.close();
                self.apply_effects().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    /// Publishes snapshots first so a caller released by an effect reads the new state.
    async fn apply_effects(&mut self) {
        self.core.publish_snapshots();
        for effect in self.core.take_effects() {
            match effect {
                Effect::Connect { channel, epoch } => {
                    self.submit_egress(channel, EgressCommand::Connect { epoch });
                }
                Effect::Send { channel, request } => {
                    self.submit_egress(channel, EgressCommand::Send(request));
                }
                Effect::CloseChannel(channel) => {
                    self.submit_egress(channel, EgressCommand::Close);
                }
                Effect::StartTimer { id, after } => {
                    timers::schedule(id, after, self.events_tx.clone());
                }
                Effect::Notify(notification) => {
                    let delivered = self
                        .notifications
                        .as_ref()
                        .is_some_and(|notifications| notifications.send(notification).is_ok());
                    if !delivered {
                        debug!(
                            event = events::DISPATCH_QUEUE_CLOSED,
                            component = COMPONENT,
                            reason = fields::REASON_QUEUE_CLOSED,
                            "notification dropped; dispatcher stopped"
                        );
                    }
                }
                Effect::ConnectComplete(result) => {
                    if let Some(reply) = self.connect_reply.take() {
                        let _ = reply.send(result);
                    }
                }
                Effect::Shutdown => self.shutdown().await,
            }
        }
    }

    fn submit_egress(&self, channel: ChannelId, command: EgressCommand) {
        let Some(worker) = self.egress.get(channel.0) else {
            return;
        };
        if !worker.submit(command) {
            warn!(
                event = events::EGRESS_QUEUE_CLOSED,
                component = COMPONENT,
                channel = worker.channel_name(),
                reason = fields::REASON_QUEUE_CLOSED,
                "egress worker is no longer accepting commands"
            );
        }
    }

    /// Drains and stops every worker; queued transport closes and callbacks complete first.
    async fn shutdown(&mut self) {
        let workers = std::mem::take(&mut self.egress);
        let notifications = self.notifications.take();
        let dispatcher = self.dispatcher.take();

        let stopped = tokio::task::spawn_blocking(move || {
            for worker in workers {
                worker.stop();
            }
            drop(notifications);
            if let Some(dispatcher) = dispatcher {
                dispatcher.join();
            }
        })
        .await;

        if let Err(err) = stopped {
            warn!(
                event = events::SESSION_CLOSE,
                component = COMPONENT,
                err = %err,
                "worker shutdown did not complete"
            );
        }
    }
}
