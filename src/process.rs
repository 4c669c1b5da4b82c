//! the per-actor process loop (spec §4.2): init, then receive/dispatch until stopped or
//! crashed, then terminate. Grounded on the source's `GenServerLoop` (`gen_server.go`) - the
//! `defer`/`recover` panic wall there becomes `futures::FutureExt::catch_unwind` here.

use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::callback::{CallOutcome, Cast, CastOutcome, Context, GenServer, InitOutcome, ReplySender, TerminateReason};
use crate::errors::{panic_reason, GenServerError, Result};
use crate::pid::{Envelope, Pid, PidId, StopReq};
use crate::registry::{Allocation, RegistryHandle};
use crate::timer::Timer;
use crate::{channel, close_rx, debug, error, recv, try_recv, MpscReceiver};

/// locate-or-allocate against the registry (spec §4.5 step 2), then - only if a fresh id was
/// actually allocated - build the actor's channels and run its process loop. Returns whether a
/// new actor was started (`false` means an already-registered actor was handed back and `state`
/// was never used), matching the source's `ReturnedRegisteredPid` output field.
pub(crate) async fn spawn<G: GenServer>(
    make_state: impl FnOnce() -> G,
    registry: RegistryHandle,
    prefix: String,
    name: Option<G::Name>,
    mailbox_size: usize,
    return_if_registered: bool,
    default_call_timeout: Option<Duration>,
) -> Result<(Pid<G>, bool)> {
    match registry.allocate_or_locate::<G>(prefix.clone(), name.as_ref(), return_if_registered).await? {
        Allocation::Existing(pid) => Ok((pid, false)),
        Allocation::New(id) => {
            let pid = spawn_allocated(make_state(), registry, id, prefix, name, mailbox_size, default_call_timeout).await?;
            Ok((pid, true))
        }
    }
}

/// start the process loop for an id (and, if named, a name reservation) the registry has
/// already set aside, and wait for `init` to either accept or reject the actor - mirrors
/// `SpawnPrefixName`'s launch of `GenServerLoop` plus the `initCh` handshake.
async fn spawn_allocated<G: GenServer>(
    state: G,
    registry: RegistryHandle,
    id: PidId,
    prefix: String,
    name: Option<G::Name>,
    mailbox_size: usize,
    default_call_timeout: Option<Duration>,
) -> Result<Pid<G>> {
    let (mailbox_tx, mailbox_rx) = channel::<Envelope<G>>(mailbox_size);
    let (stop_tx, stop_rx) = channel::<StopReq>(8);
    let pid = Pid::new(id, mailbox_tx, stop_tx, default_call_timeout);

    if let Some(name) = &name {
        registry.register::<G>(prefix.clone(), name, pid.clone()).await;
    }

    let (init_tx, init_rx) = tokio::sync::oneshot::channel();
    let loop_pid = pid.clone();
    tokio::spawn(run(state, loop_pid, prefix, name, mailbox_rx, stop_rx, registry, init_tx));

    match init_rx.await {
        Ok(outcome) => outcome.map(|_| pid),
        Err(_) => Err(GenServerError::InitFailed("actor task ended before init completed".into())),
    }
}

enum DispatchOutcome {
    Continue,
    ContinueWithTimeout(Duration),
    Stop(TerminateReason),
}

async fn run<G: GenServer>(
    mut state: G,
    pid: Pid<G>,
    prefix: String,
    name: Option<G::Name>,
    mailbox_rx: MpscReceiver<Envelope<G>>,
    stop_rx: MpscReceiver<StopReq>,
    registry: RegistryHandle,
    init_tx: tokio::sync::oneshot::Sender<Result<()>>,
) {
    let id = pid.id();
    debug!("actor {} starting", id);

    let mut timer = Timer::inert();

    let init_result = {
        let ctx = Context { pid: &pid, prefix: &prefix, name: name.as_ref(), reply_slot: None };
        AssertUnwindSafe(state.init(&ctx)).catch_unwind().await
    };

    let early_stop = match init_result {
        Ok(InitOutcome::Ok) => {
            let _ = init_tx.send(Ok(()));
            None
        }
        Ok(InitOutcome::OkTimeout(d)) => {
            timer = Timer::schedule(pid.mailbox.clone(), d, Cast::Timeout);
            let _ = init_tx.send(Ok(()));
            None
        }
        Ok(InitOutcome::Stop(reason)) => {
            let _ = init_tx.send(Err(GenServerError::InitFailed(reason.clone())));
            Some(TerminateReason::Stopped(reason))
        }
        Err(payload) => {
            let reason = panic_reason(payload);
            let _ = init_tx.send(Err(GenServerError::InitFailed(reason.clone())));
            Some(TerminateReason::Crashed(reason))
        }
    };

    let terminate_reason = match early_stop {
        Some(reason) => reason,
        None => receive_loop(&mut state, &pid, &prefix, &name, &mailbox_rx, &stop_rx, &mut timer).await,
    };

    timer.stop();
    drain_mailbox(&mailbox_rx);
    if let Some(name) = &name {
        registry.unregister::<G::Name>(prefix.clone(), name).await;
    }

    warn_on_crash(&terminate_reason, id);

    let ctx = Context { pid: &pid, prefix: &prefix, name: name.as_ref(), reply_slot: None };
    let _ = AssertUnwindSafe(state.terminate(&ctx, terminate_reason)).catch_unwind().await;

    close_rx(&mailbox_rx);
    close_rx(&stop_rx);
    debug!("actor {} terminated", id);
}

async fn receive_loop<G: GenServer>(
    state: &mut G,
    pid: &Pid<G>,
    prefix: &str,
    name: &Option<G::Name>,
    mailbox_rx: &MpscReceiver<Envelope<G>>,
    stop_rx: &MpscReceiver<StopReq>,
    timer: &mut Timer,
) -> TerminateReason {
    loop {
        tokio::select! {
            biased;

            stop_req = recv(stop_rx) => {
                return match stop_req {
                    Ok(StopReq { reason, ack }) => {
                        let _ = ack.send(());
                        TerminateReason::Stopped(reason)
                    }
                    Err(_) => TerminateReason::Stopped("stop channel closed".into()),
                };
            }

            envelope = recv(mailbox_rx) => {
                let Ok(envelope) = envelope else {
                    return TerminateReason::Stopped("mailbox closed".into());
                };

                timer.stop();
                *timer = Timer::inert();

                match dispatch(state, pid, prefix, name.as_ref(), envelope).await {
                    DispatchOutcome::Continue => {}
                    DispatchOutcome::ContinueWithTimeout(d) => {
                        *timer = Timer::schedule(pid.mailbox.clone(), d, Cast::Timeout);
                    }
                    DispatchOutcome::Stop(reason) => return reason,
                }
            }
        }
    }
}

async fn dispatch<G: GenServer>(
    state: &mut G,
    pid: &Pid<G>,
    prefix: &str,
    name: Option<&G::Name>,
    envelope: Envelope<G>,
) -> DispatchOutcome {
    match envelope {
        Envelope::Call { payload, reply_to } => dispatch_call(state, pid, prefix, name, payload, reply_to).await,
        Envelope::Cast { payload } => dispatch_cast(state, pid, prefix, name, payload).await,
    }
}

async fn dispatch_call<G: GenServer>(
    state: &mut G,
    pid: &Pid<G>,
    prefix: &str,
    name: Option<&G::Name>,
    payload: G::CallMsg,
    reply_to: ReplySender<G::Reply>,
) -> DispatchOutcome {
    let slot = RefCell::new(Some(reply_to));
    let result = {
        let ctx = Context { pid, prefix, name, reply_slot: Some(&slot) };
        AssertUnwindSafe(state.handle_call(&ctx, payload)).catch_unwind().await
    };
    let remaining = slot.into_inner();

    match result {
        Ok(CallOutcome::Reply(value)) => {
            send_reply(remaining, Ok(value));
            DispatchOutcome::Continue
        }
        Ok(CallOutcome::ReplyOk) => {
            send_reply(remaining, Ok(G::Reply::default()));
            DispatchOutcome::Continue
        }
        Ok(CallOutcome::ReplyTimeout(value, d)) => {
            send_reply(remaining, Ok(value));
            DispatchOutcome::ContinueWithTimeout(d)
        }
        Ok(CallOutcome::NoReply) => DispatchOutcome::Continue,
        Ok(CallOutcome::NoReplyTimeout(d)) => DispatchOutcome::ContinueWithTimeout(d),
        Ok(CallOutcome::Stop(reason, value)) => {
            send_reply(remaining, Ok(value));
            DispatchOutcome::Stop(TerminateReason::Normal(reason))
        }
        Ok(CallOutcome::BadReply(msg)) => {
            send_reply(remaining, Err(GenServerError::BadReply(msg.clone())));
            DispatchOutcome::Stop(TerminateReason::BadReply(msg))
        }
        Err(payload) => {
            let reason = panic_reason(payload);
            send_reply(remaining, Err(GenServerError::Crashed(reason.clone())));
            DispatchOutcome::Stop(TerminateReason::Crashed(reason))
        }
    }
}

async fn dispatch_cast<G: GenServer>(
    state: &mut G,
    pid: &Pid<G>,
    prefix: &str,
    name: Option<&G::Name>,
    payload: Cast<G::CastMsg>,
) -> DispatchOutcome {
    let ctx = Context { pid, prefix, name, reply_slot: None };
    let result = AssertUnwindSafe(state.handle_cast(&ctx, payload)).catch_unwind().await;

    match result {
        Ok(CastOutcome::NoReply) => DispatchOutcome::Continue,
        Ok(CastOutcome::NoReplyTimeout(d)) => DispatchOutcome::ContinueWithTimeout(d),
        Ok(CastOutcome::Stop(reason)) => DispatchOutcome::Stop(TerminateReason::Normal(reason)),
        Ok(CastOutcome::BadReply(msg)) => DispatchOutcome::Stop(TerminateReason::BadReply(msg)),
        Err(payload) => DispatchOutcome::Stop(TerminateReason::Crashed(panic_reason(payload))),
    }
}

fn send_reply<R>(slot: Option<ReplySender<R>>, value: std::result::Result<R, GenServerError>) {
    if let Some(tx) = slot {
        let _ = tx.send(value);
    }
    // `None` means `handle_call` called `Context::defer_reply` - the detached `ReplyTo` answers later.
}

/// every `Call` still queued once the loop exits would otherwise hang its caller forever;
/// answer each with `NoProc`, the same fate a call arriving after the actor had already
/// stopped would get.
fn drain_mailbox<G: GenServer>(mailbox_rx: &MpscReceiver<Envelope<G>>) {
    while let Some(envelope) = try_recv(mailbox_rx) {
        if let Envelope::Call { reply_to, .. } = envelope {
            let _ = reply_to.send(Err(GenServerError::NoProc));
        }
    }
}

fn warn_on_crash(reason: &TerminateReason, id: PidId) {
    match reason {
        TerminateReason::Crashed(msg) => error!("actor {} crashed: {}", id, msg),
        TerminateReason::BadReply(msg) => error!("actor {} returned a bad reply: {}", id, msg),
        _ => {}
    }
}
