//! `odin_genserver` is a small, `tokio`-native actor runtime in the style of Erlang/OTP's
//! `gen_server`: isolated processes ("actors") that own mutable state, communicate only by
//! message, are addressed by an opaque [`Pid`] or by a registered name, and share uniform
//! lifecycle semantics — synchronous [`Pid::call`], asynchronous [`Pid::cast`], orderly
//! [`Pid::stop`], crash isolation, inactivity timeouts and deferred-send timers.
//!
//! The three pieces that make up the runtime are the per-actor [`process`] loop, the name
//! [`registry`], and the [`pid`]/[`timer`] layer that actors and callers use to address and
//! schedule work against each other.

#![allow(unused_imports)]

pub mod errors;
pub use errors::{GenServerError, Result};

#[cfg(feature = "tokio_kanal")]
include!("kanal_channel.rs");

#[cfg(feature = "tokio_flume")]
include!("flume_channel.rs");

pub mod callback;
pub mod registry;
pub mod pid;
pub mod timer;
pub mod process;
pub mod environment;

pub mod prelude;

pub use callback::{GenServer, Context, Cast, InitOutcome, CallOutcome, CastOutcome, ReplyTo, TerminateReason};
pub use pid::{Pid, PidId};
pub use registry::Name;
pub use environment::{Environment, SpawnOptions, SpawnOutcome};
pub use timer::Timer;

pub const DEFAULT_MAILBOX_SIZE: usize = 100;

/*
 * funnel every log call through these crate-local macros instead of calling `tracing` directly,
 * so the logging backend can be swapped in one place if one is ever needed.
 */

#[macro_export]
macro_rules! trace { ( $( $e:expr ),* ) => { tracing::trace!( $( $e ),* ) } }

#[macro_export]
macro_rules! debug { ( $( $e:expr ),* ) => { tracing::debug!( $( $e ),* ) } }

#[macro_export]
macro_rules! info { ( $( $e:expr ),* ) => { tracing::info!( $( $e ),* ) } }

#[macro_export]
macro_rules! warn { ( $( $e:expr ),* ) => { tracing::warn!( $( $e ),* ) } }

#[macro_export]
macro_rules! error { ( $( $e:expr ),* ) => { tracing::error!( $( $e ),* ) } }

pub(crate) use {trace, debug, info, warn, error};
