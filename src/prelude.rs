//! convenience import for actor implementors: `use odin_genserver::prelude::*;`

pub use crate::callback::{
    CallOutcome, Cast, CastOutcome, Context, GenServer, InitOutcome, ReplyTo, TerminateReason,
};
pub use crate::environment::{Environment, SpawnOptions, SpawnOutcome};
pub use crate::errors::{GenServerError, Result};
pub use crate::pid::{Pid, PidId};
pub use crate::registry::Name;
pub use crate::timer::Timer;
