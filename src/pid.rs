//! [`Pid`] - an actor's address - and the mailbox envelope it carries (spec §4.3).

use std::fmt;
use std::time::Duration;

use crate::callback::{Cast, GenServer, ReplySender};
use crate::errors::{GenServerError, Result};
use crate::timer::Timer;
use crate::{send, MpscSender};

/// opaque process identifier, unique within the [`crate::Environment`] that allocated it.
/// `0` never denotes a live actor - the source's "pid zero" convention, used here as the
/// value returned for `Pid::default()`/comparisons against "no such process".
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PidId(u64);

impl PidId {
    pub(crate) fn new(id: u64) -> Self {
        PidId(id)
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for PidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PidId({})", self.0)
    }
}

impl fmt::Display for PidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a message as it travels through an actor's mailbox - either a `call` awaiting a reply, or a
/// `cast` (user-sent or synthesized by the inactivity timer).
pub(crate) enum Envelope<G: GenServer> {
    Call { payload: G::CallMsg, reply_to: ReplySender<G::Reply> },
    Cast { payload: Cast<G::CastMsg> },
}

pub(crate) struct StopReq {
    pub(crate) reason: String,
    pub(crate) ack: tokio::sync::oneshot::Sender<()>,
}

/// an actor's address. Cheap to clone; every clone names the same mailbox.
pub struct Pid<G: GenServer> {
    pub(crate) id: PidId,
    pub(crate) mailbox: MpscSender<Envelope<G>>,
    pub(crate) stop: MpscSender<StopReq>,
    /// the spawning [`crate::Environment`]'s default, used by `call` when no explicit timeout
    /// is passed.
    pub(crate) default_call_timeout: Option<Duration>,
}

impl<G: GenServer> Clone for Pid<G> {
    fn clone(&self) -> Self {
        Pid {
            id: self.id,
            mailbox: self.mailbox.clone(),
            stop: self.stop.clone(),
            default_call_timeout: self.default_call_timeout,
        }
    }
}

impl<G: GenServer> fmt::Debug for Pid<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.id)
    }
}

impl<G: GenServer> PartialEq for Pid<G> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<G: GenServer> Eq for Pid<G> {}

impl<G: GenServer> Pid<G> {
    pub(crate) fn new(
        id: PidId,
        mailbox: MpscSender<Envelope<G>>,
        stop: MpscSender<StopReq>,
        default_call_timeout: Option<Duration>,
    ) -> Self {
        Pid { id, mailbox, stop, default_call_timeout }
    }

    pub fn id(&self) -> PidId {
        self.id
    }

    /// synchronous request/reply. Blocks the caller until the actor's `handle_call` (or a
    /// deferred [`crate::ReplyTo`]) answers, the actor stops, or `timeout` elapses. `timeout`
    /// falls back to the spawning [`crate::Environment`]'s `default_call_timeout` when `None`.
    pub async fn call(&self, payload: G::CallMsg, timeout: Option<Duration>) -> Result<G::Reply> {
        let timeout = timeout.or(self.default_call_timeout);

        let (reply_to, rx) = tokio::sync::oneshot::channel();
        send(&self.mailbox, Envelope::Call { payload, reply_to })
            .await
            .map_err(|_| GenServerError::NoProc)?;

        let received = match timeout {
            Some(d) => tokio::time::timeout(d, rx).await.map_err(|_| GenServerError::Timeout(d))?,
            None => rx.await,
        };

        received.map_err(|_| GenServerError::NoProc)?
    }

    /// asynchronous, fire-and-forget message send.
    pub async fn cast(&self, payload: G::CastMsg) -> Result<()> {
        send(&self.mailbox, Envelope::Cast { payload: Cast::User(payload) })
            .await
            .map_err(|_| GenServerError::NoProc)
    }

    /// ask the actor to stop, waiting for its process loop to actually exit.
    pub async fn stop(&self) -> Result<()> {
        self.stop_with_reason("stopped").await
    }

    pub async fn stop_with_reason(&self, reason: impl Into<String>) -> Result<()> {
        let (ack, rx) = tokio::sync::oneshot::channel();
        send(&self.stop, StopReq { reason: reason.into(), ack }).await.map_err(|_| GenServerError::NoProc)?;
        rx.await.map_err(|_| GenServerError::NoProc)
    }

    /// schedule a single cast to be delivered after `after`, with no way to cancel it -
    /// equivalent to the source's fire-and-forget `SendAfter`.
    pub fn send_after(&self, after: Duration, payload: G::CastMsg) {
        let _ = Timer::schedule(self.mailbox.clone(), after, Cast::User(payload));
    }

    /// like [`Pid::send_after`] but returns a [`Timer`] that can cancel the pending delivery -
    /// the source's `SendAfterWithStop`.
    pub fn send_after_with_stop(&self, after: Duration, payload: G::CastMsg) -> Timer {
        Timer::schedule(self.mailbox.clone(), after, Cast::User(payload))
    }
}
