//! the callback contract actor authors implement (spec §4.2 / §6).

use std::cell::RefCell;
use std::fmt::Debug;
use std::time::Duration;
use async_trait::async_trait;

use crate::pid::{Pid, PidId};
use crate::registry::Name;

/// why an actor's loop is terminating - passed to [`GenServer::terminate`].
#[derive(Debug, Clone)]
pub enum TerminateReason {
    /// the actor (or its caller) asked for an orderly stop.
    Stopped(String),
    /// a `CallOutcome`/`CastOutcome::Stop` was returned by the actor itself.
    Normal(String),
    /// a callback panicked.
    Crashed(String),
    /// a callback returned `BadReply`.
    BadReply(String),
}

impl TerminateReason {
    pub fn reason(&self) -> &str {
        match self {
            TerminateReason::Stopped(r) | TerminateReason::Normal(r)
            | TerminateReason::Crashed(r) | TerminateReason::BadReply(r) => r,
        }
    }
}

/// what `init` directs the process loop to do next.
#[derive(Debug)]
pub enum InitOutcome {
    Ok,
    OkTimeout(Duration),
    Stop(String),
}

/// what `handle_call` directs the process loop to do next.
#[derive(Debug)]
pub enum CallOutcome<R> {
    Reply(R),
    ReplyOk,
    ReplyTimeout(R, Duration),
    NoReply,
    NoReplyTimeout(Duration),
    Stop(String, R),
    BadReply(String),
}

/// what `handle_cast` directs the process loop to do next.
#[derive(Debug)]
pub enum CastOutcome {
    NoReply,
    NoReplyTimeout(Duration),
    Stop(String),
    BadReply(String),
}

/// the payload delivered to `handle_cast`: either a user-sent cast, or the inactivity timer firing.
/// structurally a plain cast in every respect - the runtime only distinguishes it by origin.
#[derive(Debug)]
pub enum Cast<C> {
    User(C),
    Timeout,
}

pub(crate) type ReplySender<R> = tokio::sync::oneshot::Sender<std::result::Result<R, crate::errors::GenServerError>>;

/// a single-use handle to answer a `call` asynchronously, obtained via [`Context::defer_reply`]
/// from inside a `handle_call` that returns `CallOutcome::NoReply`. Consuming `self` on
/// [`ReplyTo::reply`] makes a double-reply a compile-time error rather than the source's runtime
/// `BadReply`.
pub struct ReplyTo<R> {
    pub(crate) tx: ReplySender<R>,
}

impl<R> ReplyTo<R> {
    /// the free-standing `Reply(replyTo, value)` of the source, expressed as a consuming method.
    pub fn reply(self, value: R) {
        let _ = self.tx.send(Ok(value));
    }
}

impl<R> Debug for ReplyTo<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReplyTo(..)")
    }
}

/// per-message context the loop threads through every callback: identity the actor would
/// otherwise have to be told about via mutable setters (see DESIGN.md), plus - during a `Call`
/// dispatch only - the slot `handle_call` can pull the reply sender out of to defer an answer.
pub struct Context<'a, G: GenServer> {
    pub(crate) pid: &'a Pid<G>,
    pub(crate) prefix: &'a str,
    pub(crate) name: Option<&'a G::Name>,
    pub(crate) reply_slot: Option<&'a RefCell<Option<ReplySender<G::Reply>>>>,
}

impl<'a, G: GenServer> Context<'a, G> {
    pub fn pid(&self) -> &Pid<G> { self.pid }
    pub fn id(&self) -> PidId { self.pid.id() }
    pub fn prefix(&self) -> &str { self.prefix }
    pub fn name(&self) -> Option<&G::Name> { self.name }

    /// take ownership of the current call's reply channel so it can be answered later, outside
    /// this `handle_call` invocation. Returns `None` if called outside a `Call` dispatch, or if
    /// already taken. `handle_call` must still return `CallOutcome::NoReply`/`NoReplyTimeout`
    /// after calling this - the loop only sends a reply itself when the slot is still full.
    pub fn defer_reply(&self) -> Option<ReplyTo<G::Reply>> {
        self.reply_slot.and_then(|slot| slot.borrow_mut().take()).map(|tx| ReplyTo { tx })
    }
}

/// the abstract surface exposed to actor authors - `Init` / `HandleCall` / `HandleCast` /
/// `Terminate`, matching the source's `GenServer` interface one-for-one (spec §4.2).
#[async_trait]
pub trait GenServer: Send + Sized + 'static {
    /// the request payload accepted by `call`.
    type CallMsg: Send + 'static;
    /// the message payload accepted by `cast` (and delivered on inactivity timeout, wrapped in [`Cast`]).
    type CastMsg: Send + 'static;
    /// the value returned from `call`. Must be `Default` so `CallOutcome::ReplyOk` has something
    /// to send - the typed equivalent of the source's "ok" sentinel atom.
    type Reply: Send + Default + 'static;
    /// the type used to register this actor under a name; defaults are typically `String`.
    type Name: Name;

    async fn init(&mut self, ctx: &Context<'_, Self>) -> InitOutcome {
        let _ = ctx;
        InitOutcome::Ok
    }

    async fn handle_call(&mut self, ctx: &Context<'_, Self>, payload: Self::CallMsg) -> CallOutcome<Self::Reply>;

    async fn handle_cast(&mut self, ctx: &Context<'_, Self>, payload: Cast<Self::CastMsg>) -> CastOutcome {
        let _ = (ctx, payload);
        CastOutcome::NoReply
    }

    async fn terminate(&mut self, ctx: &Context<'_, Self>, reason: TerminateReason) {
        let _ = (ctx, reason);
    }
}
