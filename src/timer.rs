//! deferred message delivery (spec §4.4): spawn a task that sleeps, then delivers a cast.
//! grounded on the source's `timer.go` (`SendAfter`/`SendAfterWithStop`) and on the
//! `oneshot_timer_for` helper's abort-handle pattern.

use std::time::Duration;

use crate::callback::{Cast, GenServer};
use crate::pid::Envelope;
use crate::{send, MpscSender};

/// a handle to a pending deferred delivery or inactivity timeout. Stopping an already-fired or
/// never-armed timer is a harmless no-op.
pub struct Timer {
    handle: Option<tokio::task::AbortHandle>,
}

impl Timer {
    /// a timer that was never armed; `stop` on it does nothing.
    pub(crate) fn inert() -> Self {
        Timer { handle: None }
    }

    pub(crate) fn schedule<G: GenServer>(mailbox: MpscSender<Envelope<G>>, after: Duration, payload: Cast<G::CastMsg>) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = send(&mailbox, Envelope::Cast { payload }).await;
        });
        Timer { handle: Some(task.abort_handle()) }
    }

    /// cancel the pending delivery, if it hasn't fired yet. Dropping a `Timer` without calling
    /// this does NOT cancel it - `Pid::send_after` relies on exactly that to stay fire-and-forget.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
