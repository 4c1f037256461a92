/*
 * Copyright (C) 2021 The Android Open Source Project
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Single-use binding to the licensing service.
//!
//! [`LicenseServiceBinder`] owns at most one pending request. A request binds
//! the service, sends one `checkLicense` transaction once connected, and ends
//! when the service calls back on the request's listener, when a newer request
//! supersedes it, when its deadline is expired, or when sending fails. Each
//! request's completion runs exactly once with a [`CheckResult`], and every
//! accepted bind is released exactly once.

use crate::binder::{Binder, SpIBinder};
use crate::config::BinderConfig;
use crate::connection::{ComponentName, ServiceConnection, ServiceContext, ServiceIntent};
use crate::error::StatusCode;
use crate::interfaces::{BpLicensingService, ILicensingService, LicenseResultListener};
use crate::response::VerificationResult;

use log::{debug, error, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

/// Why a request ended without a reply from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("bind to the licensing service was rejected: {0}")]
    ConnectionRejected(StatusCode),
    #[error("checkLicense transaction failed: {0}")]
    TransactionFailed(StatusCode),
    #[error("superseded by a newer license check")]
    Superseded,
    #[error("no reply from the licensing service before the deadline")]
    TimedOut,
    #[error("binder dropped while the license check was pending")]
    Abandoned,
}

/// Outcome handed to a request's completion.
pub type CheckResult = std::result::Result<VerificationResult, CheckError>;

type Completion = Box<dyn FnOnce(CheckResult) + Send + 'static>;

/// Identifies one `initiate` call on a binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a pending request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Bind requested; waiting for the service to come up.
    Connecting,
    /// `checkLicense` sent; waiting for the listener to be called.
    AwaitingReply,
}

/// Snapshot of the pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInfo {
    pub id: RequestId,
    pub nonce: i64,
    pub phase: RequestPhase,
    /// `None` when the reply timeout is too long to represent.
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindState {
    /// `bind_service` has not returned yet.
    Binding,
    Bound,
}

struct PendingRequest {
    id: RequestId,
    nonce: i64,
    completion: Completion,
    deadline: Option<Instant>,
    connection: Arc<dyn ServiceConnection>,
    listener: SpIBinder,
    bind: BindState,
    phase: RequestPhase,
}

impl PendingRequest {
    fn info(&self) -> PendingInfo {
        PendingInfo { id: self.id, nonce: self.nonce, phase: self.phase, deadline: self.deadline }
    }
}

#[derive(Default)]
struct State {
    next_id: u64,
    pending: Option<PendingRequest>,
}

struct Inner {
    context: Arc<dyn ServiceContext>,
    config: BinderConfig,
    state: Mutex<State>,
}

/// Binds the licensing service for one verification at a time.
///
/// Cloning yields another handle to the same binder. Platform notifications
/// hold only weak references, so dropping the last handle abandons the
/// pending request (its completion sees [`CheckError::Abandoned`]). A handle
/// captured by the pending completion counts as one of those handles.
#[derive(Clone)]
pub struct LicenseServiceBinder {
    inner: Arc<Inner>,
}

impl LicenseServiceBinder {
    pub fn new(context: Arc<dyn ServiceContext>) -> Self {
        Self::with_config(context, BinderConfig::default())
    }

    pub fn with_config(context: Arc<dyn ServiceContext>, config: BinderConfig) -> Self {
        LicenseServiceBinder {
            inner: Arc::new(Inner { context, config, state: Mutex::new(State::default()) }),
        }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.inner.config
    }

    /// Start a license check with the caller-chosen `nonce`.
    ///
    /// A request that is still pending is completed first with
    /// [`CheckError::Superseded`] and its bind released. If the platform
    /// rejects the bind, `completion` runs before this returns with
    /// [`CheckError::ConnectionRejected`].
    ///
    /// A `completion` that holds a clone of this binder keeps it alive until
    /// the completion runs, so dropping the other handles does not abandon
    /// that request.
    pub fn initiate<F>(&self, nonce: i64, completion: F) -> RequestId
    where
        F: FnOnce(CheckResult) + Send + 'static,
    {
        let inner = &self.inner;
        let completion: Completion = Box::new(completion);

        // A superseded completion may itself initiate, so repeat until the
        // slot is observed empty.
        let (id, connection) = loop {
            let mut state = inner.lock();
            match state.pending.take() {
                Some(previous) => {
                    drop(state);
                    info!("License check {} superseded by a new request", previous.id);
                    inner.settle(previous, Err(CheckError::Superseded));
                }
                None => {
                    let id = RequestId(state.next_id);
                    state.next_id += 1;
                    let connection: Arc<dyn ServiceConnection> =
                        Arc::new(RequestConnection { binder: Arc::downgrade(inner), id });
                    state.pending = Some(PendingRequest {
                        id,
                        nonce,
                        completion,
                        deadline: Instant::now().checked_add(inner.config.reply_timeout),
                        connection: connection.clone(),
                        listener: inner.new_listener(id),
                        bind: BindState::Binding,
                        phase: RequestPhase::Connecting,
                    });
                    break (id, connection);
                }
            }
        };

        let intent = ServiceIntent::new(inner.config.service_action.as_str())
            .with_package(inner.config.service_package.as_str());
        debug!("License check {}: binding {:?}", id, intent);

        match inner.context.bind_service(&intent, connection.clone()) {
            Ok(()) => {
                let still_pending = {
                    let mut state = inner.lock();
                    match state.pending.as_mut() {
                        Some(request) if request.id == id => {
                            request.bind = BindState::Bound;
                            true
                        }
                        _ => false,
                    }
                };
                if !still_pending {
                    // Finished while the bind call was in flight.
                    inner.context.unbind_service(&connection);
                }
            }
            Err(status) => {
                warn!("License check {}: bind to {} rejected: {}", id, intent.action, status);
                if let Some(request) = inner.take_pending(id) {
                    inner.settle(request, Err(CheckError::ConnectionRejected(status)));
                }
            }
        }
        id
    }

    /// The pending request, if any.
    pub fn pending(&self) -> Option<PendingInfo> {
        self.inner.lock().pending.as_ref().map(PendingRequest::info)
    }

    /// Complete request `id` with [`CheckError::TimedOut`] if it is still
    /// pending. Returns whether it was.
    pub fn expire(&self, id: RequestId) -> bool {
        match self.inner.take_pending(id) {
            Some(request) => {
                warn!("License check {}: no reply before the deadline", id);
                self.inner.settle(request, Err(CheckError::TimedOut));
                true
            }
            None => false,
        }
    }

    /// Expire the pending request if its deadline is at or before `now`. A
    /// request without a deadline is never overdue.
    pub fn expire_overdue(&self, now: Instant) -> Option<RequestId> {
        let overdue = self
            .inner
            .lock()
            .pending
            .as_ref()
            .filter(|request| request.deadline.is_some_and(|deadline| deadline <= now))
            .map(|request| request.id)?;
        self.expire(overdue).then_some(overdue)
    }
}

impl fmt::Debug for LicenseServiceBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseServiceBinder")
            .field("config", &self.inner.config)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pending(&self, id: RequestId) -> Option<PendingRequest> {
        let mut state = self.lock();
        if state.pending.as_ref().map(|request| request.id) == Some(id) {
            state.pending.take()
        } else {
            None
        }
    }

    fn new_listener(self: &Arc<Self>, id: RequestId) -> SpIBinder {
        let binder = Arc::downgrade(self);
        Binder::new(LicenseResultListener::new(move |result| {
            if let Some(inner) = binder.upgrade() {
                inner.on_reply_received(id, result);
            }
        }))
        .into()
    }

    /// Run the completion and release the bind. A reply is delivered before
    /// the unbind; failures unbind first.
    fn settle(&self, request: PendingRequest, result: CheckResult) {
        let PendingRequest { id, completion, connection, bind, .. } = request;
        let bound = bind == BindState::Bound;
        match result {
            Ok(reply) => {
                info!("License check {}: response code {}", id, reply.response_code);
                completion(Ok(reply));
                if bound {
                    self.context.unbind_service(&connection);
                }
            }
            Err(failure) => {
                if bound {
                    self.context.unbind_service(&connection);
                }
                info!("License check {}: {}", id, failure);
                completion(Err(failure));
            }
        }
    }

    fn on_connected(&self, id: RequestId, name: &ComponentName, service: SpIBinder) {
        let (nonce, listener) = {
            let mut state = self.lock();
            match state.pending.as_mut() {
                Some(request) if request.id == id => {
                    request.phase = RequestPhase::AwaitingReply;
                    (request.nonce, request.listener.clone())
                }
                _ => {
                    debug!("Ignoring connection to {} for finished license check {}", name, id);
                    return;
                }
            }
        };

        let package_name = self.context.package_name();
        let service = BpLicensingService::new(service);
        match service.check_license(nonce, &package_name, &listener) {
            Ok(()) => debug!("License check {}: sent checkLicense to {}", id, name),
            Err(status) => {
                error!("License check {}: checkLicense to {} failed: {}", id, name, status);
                if let Some(request) = self.take_pending(id) {
                    self.settle(request, Err(CheckError::TransactionFailed(status)));
                }
            }
        }
    }

    fn on_disconnected(&self, id: RequestId, name: &ComponentName) {
        let mut state = self.lock();
        match state.pending.as_mut() {
            Some(request) if request.id == id && request.phase == RequestPhase::AwaitingReply => {
                warn!("License check {}: {} disconnected before replying", id, name);
                request.phase = RequestPhase::Connecting;
            }
            _ => debug!("License check {}: {} disconnected", id, name),
        }
    }

    fn on_reply_received(&self, id: RequestId, result: VerificationResult) {
        match self.take_pending(id) {
            Some(request) => self.settle(request, Ok(result)),
            None => warn!("Dropping reply for finished license check {}", id),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(request) = state.pending.take() {
            warn!("License check {} abandoned", request.id);
            if request.bind == BindState::Bound {
                self.context.unbind_service(&request.connection);
            }
            (request.completion)(Err(CheckError::Abandoned));
        }
    }
}

/// Connection registered with the platform for one request.
struct RequestConnection {
    binder: Weak<Inner>,
    id: RequestId,
}

impl ServiceConnection for RequestConnection {
    fn on_service_connected(&self, name: &ComponentName, service: SpIBinder) {
        if let Some(inner) = self.binder.upgrade() {
            inner.on_connected(self.id, name, service);
        }
    }

    fn on_service_disconnected(&self, name: &ComponentName) {
        if let Some(inner) = self.binder.upgrade() {
            inner.on_disconnected(self.id, name);
        }
    }
}
