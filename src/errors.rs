//! error taxonomy for the actor runtime (see spec §7).

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenServerError>;

#[derive(Error, Debug, Clone)]
pub enum GenServerError {
    #[error("no process")]
    NoProc,

    #[error("name already registered")]
    NameTaken,

    #[error("spawn_or_locate requires a name")]
    NameRequired,

    #[error("init failed: {0}")]
    InitFailed(String),

    #[error("crashed: {0}")]
    Crashed(String),

    #[error("bad reply: {0}")]
    BadReply(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("receiver closed")]
    ReceiverClosed,

    #[error("operation failed: {0}")]
    OpFailed(String),
}

impl GenServerError {
    /// true for any variant that means "the target actor is gone" - the one error kind
    /// callers need to distinguish symbolically rather than by matching error text.
    pub fn is_no_proc(&self) -> bool {
        matches!(self, GenServerError::NoProc)
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self, GenServerError::Crashed(_))
    }

    pub fn is_name_taken(&self) -> bool {
        matches!(self, GenServerError::NameTaken)
    }
}

pub(crate) fn op_failed(msg: impl ToString) -> GenServerError {
    GenServerError::OpFailed(msg.to_string())
}

/// converts a panic payload (as caught by `futures::FutureExt::catch_unwind`) into a reason string.
pub(crate) fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
