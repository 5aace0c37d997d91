//! # Engine Channel
//!
//! Duplex asynchronous connection to the execution engine. Commands go out
//! tagged with a monotonic request id; responses come back out-of-band and
//! are matched to their caller through a pending-request table keyed by that
//! id. Every response-bearing command carries the same deadline; an entry
//! that neither resolves nor times out cannot exist.
//!
//! The pending table is mutated only while issuing a request, while draining
//! the transport, and while resolving or dropping an entry, so a stale
//! response can therefore never complete a newer caller.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use evm_protocol::{Command, CommandFrame, CommandKind, RequestId, Response, ResponseFrame};

use crate::error::{ChannelError, TransportError};

/// The opaque execution engine, reachable only through frames.
///
/// `send` hands one command frame to the engine; `poll_response` drains at
/// most one response frame without blocking. Transports are free to run the
/// engine wherever they like (worker thread, in-process, RPC) as long as
/// every response echoes the id of the command it answers.
pub trait EngineTransport {
    fn send(&mut self, frame: CommandFrame) -> Result<(), TransportError>;
    fn poll_response(&mut self) -> Option<ResponseFrame>;
}

/// Channel knobs
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Deadline applied to every response-bearing command
    pub response_timeout: Duration,
}

impl ChannelConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            response_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

struct PendingEntry {
    kind: CommandKind,
    deadline: Instant,
    outcome: Option<Result<Response, ChannelError>>,
}

struct ChannelCore {
    transport: Option<Box<dyn EngineTransport>>,
    config: ChannelConfig,
    next_id: u64,
    pending: HashMap<RequestId, PendingEntry>,
}

impl ChannelCore {
    fn allocate_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drain the transport, filing each response under its pending entry.
    fn pump(&mut self) {
        loop {
            let frame = match self.transport.as_mut() {
                Some(transport) => transport.poll_response(),
                None => None,
            };
            let Some(frame) = frame else { break };

            match self.pending.get_mut(&frame.id) {
                Some(entry) => {
                    entry.outcome = Some(match frame.response {
                        Response::Error(message) => Err(ChannelError::Engine { message }),
                        other => Ok(other),
                    });
                }
                None => {
                    tracing::warn!(
                        id = frame.id.value(),
                        "dropping engine response with no pending request"
                    );
                }
            }
        }
    }
}

/// Handle to an open engine connection. Cheap to clone; all clones share
/// one pending table.
#[derive(Clone)]
pub struct EngineChannel {
    core: Rc<RefCell<ChannelCore>>,
}

impl EngineChannel {
    /// Open a channel over the given transport.
    pub fn open(transport: Box<dyn EngineTransport>, config: ChannelConfig) -> Self {
        Self {
            core: Rc::new(RefCell::new(ChannelCore {
                transport: Some(transport),
                config,
                next_id: 0,
                pending: HashMap::new(),
            })),
        }
    }

    /// Drop the transport and fail every waiting caller with `Closed`.
    pub fn close(&self) {
        let mut core = self.core.borrow_mut();
        core.transport = None;
        for entry in core.pending.values_mut() {
            if entry.outcome.is_none() {
                entry.outcome = Some(Err(ChannelError::Closed));
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.core.borrow().transport.is_some()
    }

    /// Waiting callers, including ones whose outcome has arrived unpolled
    pub fn pending_requests(&self) -> usize {
        self.core.borrow().pending.len()
    }

    /// Issue a response-bearing command and obtain the future that resolves
    /// with its response. A second in-flight request of the same kind is
    /// rejected locally before anything reaches the engine.
    pub fn request(&self, command: Command) -> Result<ResponseFuture, ChannelError> {
        let mut core = self.core.borrow_mut();
        if core.transport.is_none() {
            return Err(ChannelError::Closed);
        }

        let kind = command.kind();
        if !command.expects_response() {
            return Err(ChannelError::NoResponseDefined { kind });
        }
        if core.pending.values().any(|entry| entry.kind == kind) {
            return Err(ChannelError::SequenceViolation { kind });
        }

        let id = core.allocate_id();
        let deadline = Instant::now() + core.config.response_timeout;
        core.pending.insert(
            id,
            PendingEntry {
                kind,
                deadline,
                outcome: None,
            },
        );

        let sent = match core.transport.as_mut() {
            Some(transport) => transport.send(CommandFrame { id, command }),
            None => Err(TransportError("channel closed mid-send".into())),
        };
        if let Err(err) = sent {
            core.pending.remove(&id);
            return Err(err.into());
        }

        tracing::debug!(id = id.value(), %kind, "command sent");
        Ok(ResponseFuture {
            core: Rc::clone(&self.core),
            id,
            kind,
            done: false,
        })
    }

    /// Fire-and-forget send for commands with no response defined (`Pause`).
    pub fn post(&self, command: Command) -> Result<(), ChannelError> {
        let mut core = self.core.borrow_mut();
        let id = core.allocate_id();
        let kind = command.kind();
        match core.transport.as_mut() {
            Some(transport) => {
                transport.send(CommandFrame { id, command })?;
                tracing::debug!(id = id.value(), %kind, "command posted");
                Ok(())
            }
            None => Err(ChannelError::Closed),
        }
    }

    /// Timeout currently applied to every request
    pub fn response_timeout(&self) -> Duration {
        self.core.borrow().config.response_timeout
    }
}

/// Resolves with the response to one issued command.
///
/// Dropping the future withdraws the pending entry, so an abandoned request
/// can never be completed by a late response.
pub struct ResponseFuture {
    core: Rc<RefCell<ChannelCore>>,
    id: RequestId,
    kind: CommandKind,
    done: bool,
}

impl ResponseFuture {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response, ChannelError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut core = this.core.borrow_mut();
        core.pump();

        let Some(entry) = core.pending.get_mut(&this.id) else {
            this.done = true;
            return Poll::Ready(Err(ChannelError::Closed));
        };

        if let Some(outcome) = entry.outcome.take() {
            core.pending.remove(&this.id);
            this.done = true;
            return Poll::Ready(outcome);
        }

        if Instant::now() >= entry.deadline {
            core.pending.remove(&this.id);
            let timeout = core.config.response_timeout;
            this.done = true;
            tracing::warn!(id = this.id.value(), kind = %this.kind, "response deadline elapsed");
            return Poll::Ready(Err(ChannelError::Timeout {
                kind: this.kind,
                timeout,
            }));
        }

        Poll::Pending
    }
}

impl Drop for ResponseFuture {
    fn drop(&mut self) {
        if !self.done {
            if let Ok(mut core) = self.core.try_borrow_mut() {
                core.pending.remove(&self.id);
            }
        }
    }
}
