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

//! Application-facing session facade.

use crate::channel::ChannelTransport;
use crate::client::ConsumerClient;
use crate::config::SessionConfig;
use crate::control_plane::channel_table::{ChannelId, ChannelInfo};
use crate::data_plane::egress_worker::EgressChannelWorker;
use crate::data_plane::notification_dispatcher::{spawn_notification_dispatcher, LiveHandles};
use crate::error::{ConfigError, SessionError, UsageError};
use crate::message::{Domain, Handle, LoginRequest, ReqMsg, SubmitMsg};
use crate::observability::events;
use crate::routing::resolution::Selector;
use crate::runtime::sequencer::{SessionEvent, SessionSequencer};
use crate::runtime::worker_runtime::{spawn_worker_loop, WorkerHandle};
use crate::service::ServiceView;
use crate::session_core::SessionCore;
use crate::snapshot::SessionSnapshots;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

const SEQUENCER_THREAD_NAME: &str = "feed-sequencer";
const COMPONENT: &str = "consumer_session";

/// Handles returned by [`ConsumerSession::subscribe_batch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchHandles {
    /// Receives a single Closed status once every item has been opened.
    pub batch: Handle,
    /// One handle per requested name, in request order.
    pub items: Vec<Handle>,
}

/// Collects the configuration, transports and login client for a session.
pub struct ConsumerSessionBuilder {
    config: SessionConfig,
    transports: Vec<(String, Arc<dyn ChannelTransport>)>,
    login_client: Option<Arc<dyn ConsumerClient>>,
}

impl ConsumerSessionBuilder {
    /// Supplies the transport for the configured channel `name`.
    pub fn channel(mut self, name: impl Into<String>, transport: Arc<dyn ChannelTransport>) -> Self {
        self.transports.push((name.into(), transport));
        self
    }

    /// Receives the login stream: one refresh, then channel and provider statuses.
    pub fn login_client(mut self, client: Arc<dyn ConsumerClient>) -> Self {
        self.login_client = Some(client);
        self
    }

    /// Starts every worker and waits until the session is usable.
    ///
    /// Completes once no channel is still logging in or waiting for its
    /// directory and at least one channel is logged in. Fails with
    /// [`SessionError::LoginRequestTimeout`] when no channel logs in before the
    /// login timeout and with [`SessionError::LoginRejected`] when every
    /// channel was denied or closed.
    pub async fn connect(self) -> Result<ConsumerSession, SessionError> {
        let Self {
            config,
            transports,
            login_client,
        } = self;
        config.validate()?;

        let mut by_name: HashMap<String, Arc<dyn ChannelTransport>> = HashMap::new();
        for (name, transport) in transports {
            if !config.channels.iter().any(|channel| channel.name == name) {
                return Err(ConfigError::UnknownTransport(name).into());
            }
            by_name.insert(name, transport);
        }
        let mut ordered = Vec::with_capacity(config.channels.len());
        for channel in &config.channels {
            let transport = by_name
                .remove(&channel.name)
                .ok_or_else(|| ConfigError::MissingTransport(channel.name.clone()))?;
            ordered.push(transport);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        let live = LiveHandles::new();
        let dispatcher = spawn_notification_dispatcher(notifications_rx, live.clone());
        let egress = config
            .channels
            .iter()
            .zip(ordered)
            .enumerate()
            .map(|(index, (channel, transport))| {
                EgressChannelWorker::new(ChannelId(index), &channel.name, transport, events_tx.clone())
            })
            .collect();

        let name = config.name.clone();
        let service_lists = config
            .service_lists
            .iter()
            .map(|list| list.name.clone())
            .collect();
        let snapshots = SessionSnapshots::new();
        let core = SessionCore::new(config, login_client, snapshots.clone());
        let sequencer = SessionSequencer::new(
            core,
            events_rx,
            events_tx.clone(),
            egress,
            notifications_tx,
            dispatcher,
        );
        let sequencer = spawn_worker_loop(SEQUENCER_THREAD_NAME.to_string(), move || sequencer.run());

        let session = ConsumerSession {
            name,
            events: events_tx,
            live,
            snapshots,
            service_lists,
            next_handle: AtomicU64::new(Handle::FIRST_ITEM),
            closed: AtomicBool::new(false),
            sequencer: Mutex::new(Some(sequencer)),
        };

        let (reply, connected) = oneshot::channel();
        session.enqueue(SessionEvent::Start { reply })?;
        match connected.await {
            Ok(Ok(())) => {
                debug!(
                    event = events::SESSION_CONNECT_OK,
                    component = COMPONENT,
                    session = session.name.as_str(),
                    "connect returned to caller"
                );
                Ok(session)
            }
            Ok(Err(err)) => {
                session.closed.store(true, Ordering::SeqCst);
                Err(err)
            }
            Err(_) => Err(SessionError::SessionClosed),
        }
    }
}

/// A consumer session spanning every configured channel.
///
/// All state lives on the session's sequencer thread; the methods here only
/// validate, enqueue and read published snapshots. Callbacks run on a
/// separate dispatch thread, so [`ConsumerSession::close`] must not be awaited
/// from inside a callback.
pub struct ConsumerSession {
    name: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    live: LiveHandles,
    snapshots: SessionSnapshots,
    service_lists: HashSet<String>,
    next_handle: AtomicU64,
    closed: AtomicBool,
    sequencer: Mutex<Option<WorkerHandle>>,
}

impl ConsumerSession {
    pub fn builder(config: SessionConfig) -> ConsumerSessionBuilder {
        ConsumerSessionBuilder {
            config,
            transports: Vec::new(),
            login_client: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handle login-stream messages are delivered with.
    pub fn login_handle(&self) -> Handle {
        Handle::LOGIN
    }

    /// Opens an item stream.
    ///
    /// The handle is returned even when no channel carries the service yet;
    /// the item then waits with an Open/Suspect status until it can be routed.
    pub fn subscribe(
        &self,
        request: ReqMsg,
        client: Arc<dyn ConsumerClient>,
    ) -> Result<Handle, SessionError> {
        let selector = self.validate(&request)?;
        let handle = self.allocate_handle();
        self.live.insert(handle);
        self.enqueue(SessionEvent::Subscribe {
            handle,
            request,
            selector,
            client,
        })?;
        Ok(handle)
    }

    /// Opens one item per name, all sharing `template`'s service and options.
    pub fn subscribe_batch(
        &self,
        template: ReqMsg,
        names: Vec<String>,
        client: Arc<dyn ConsumerClient>,
    ) -> Result<BatchHandles, SessionError> {
        if names.is_empty() {
            return Err(UsageError::EmptyBatch.into());
        }
        let selector = self.validate(&template)?;
        let batch = self.allocate_handle();
        self.live.insert(batch);
        let items: Vec<(Handle, ReqMsg)> = names
            .into_iter()
            .map(|name| {
                let handle = self.allocate_handle();
                self.live.insert(handle);
                (
                    handle,
                    ReqMsg {
                        name,
                        ..template.clone()
                    },
                )
            })
            .collect();
        let handles = BatchHandles {
            batch,
            items: items.iter().map(|(handle, _)| *handle).collect(),
        };
        self.enqueue(SessionEvent::SubscribeBatch {
            batch,
            items,
            selector,
            client,
        })?;
        Ok(handles)
    }

    /// Closes an item stream; no callback for `handle` runs after this returns.
    pub fn unregister(&self, handle: Handle) {
        if handle == Handle::LOGIN || !self.live.remove(handle) {
            return;
        }
        debug!(
            event = events::ITEM_CLOSED,
            component = COMPONENT,
            handle = %handle,
            "unregistering item"
        );
        // A stopped sequencer has nothing left to close.
        let _ = self.events.send(SessionEvent::Unregister(handle));
    }

    /// Sends a post or generic message on an open item or on the login stream.
    pub async fn submit(&self, msg: SubmitMsg, handle: Handle) -> Result<(), SessionError> {
        self.ensure_open()?;
        let (reply, result) = oneshot::channel();
        self.enqueue(SessionEvent::Submit { handle, msg, reply })?;
        result
            .await
            .map_err(|_| SessionError::SessionClosed)?
            .map_err(SessionError::from)
    }

    /// Replaces the login request and re-sends it on every active channel.
    pub fn reissue_login(&self, request: LoginRequest) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.enqueue(SessionEvent::ReissueLogin(request))
    }

    pub fn query_channel_info(&self) -> Vec<ChannelInfo> {
        self.snapshots.channels.load().value.clone()
    }

    /// The aggregate directory, ordered by session service id.
    pub fn directory(&self) -> Vec<ServiceView> {
        self.snapshots.directory.load().value.clone()
    }

    /// Closes every stream and channel and waits for pending callbacks to finish.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let (reply, done) = oneshot::channel();
        if self
            .events
            .send(SessionEvent::Close { reply: Some(reply) })
            .is_ok()
        {
            // The sequencer may already have stopped on its own.
            let _ = done.await;
        }

        let sequencer = self
            .sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sequencer) = sequencer {
            info!(
                event = events::SESSION_CLOSE,
                component = COMPONENT,
                session = self.name.as_str(),
                worker_thread = sequencer.worker_thread(),
                "waiting for session sequencer to stop"
            );
            let _ = tokio::task::spawn_blocking(move || sequencer.join()).await;
        }
    }

    fn validate(&self, request: &ReqMsg) -> Result<Selector, SessionError> {
        self.ensure_open()?;
        if request.domain == Domain::LOGIN {
            return Err(UsageError::LoginDomainRequest.into());
        }
        let selector = Selector::from_request(request)?;
        if let Selector::List(list) = &selector {
            if !self.service_lists.contains(list) {
                return Err(UsageError::UnknownServiceList(list.clone()).into());
            }
        }
        Ok(selector)
    }

    fn allocate_handle(&self) -> Handle {
        Handle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SessionError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn enqueue(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events
            .send(event)
            .map_err(|_| SessionError::SessionClosed)
    }
}

impl Drop for ConsumerSession {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(SessionEvent::Close { reply: None });
        }
    }
}
