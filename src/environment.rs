//! [`Environment`]: the spawn/registry surface actor authors and callers go through (spec §4.5,
//! §5). Grounded on the source's package-level `act` singleton (`act.go`'s `env *act`, built
//! once in `init()`); `OnceLock` stands in for what the source gets from Go's `init()` running
//! exactly once.

use std::sync::OnceLock;
use std::time::Duration;

use crate::callback::GenServer;
use crate::errors::Result;
use crate::pid::Pid;
use crate::process;
use crate::registry::RegistryHandle;
use crate::DEFAULT_MAILBOX_SIZE;

/// per-spawn knobs; `..Default::default()` keeps call sites terse when only one field matters.
#[derive(Clone, Debug)]
pub struct SpawnOptions<N> {
    pub prefix: String,
    pub name: Option<N>,
    pub mailbox_size: usize,
    /// for `spawn_or_locate`: if an actor is already registered under `name`, return its `Pid`
    /// instead of failing with `NameTaken`.
    pub return_if_registered: bool,
}

impl<N> Default for SpawnOptions<N> {
    fn default() -> Self {
        SpawnOptions {
            prefix: String::new(),
            name: None,
            mailbox_size: DEFAULT_MAILBOX_SIZE,
            return_if_registered: false,
        }
    }
}

/// the result of a `spawn_or_locate` call - distinguishes "I created this actor" from "this
/// actor already existed under that name" so callers can tell whether their `args` were used.
#[derive(Debug)]
pub struct SpawnOutcome<G: GenServer> {
    pub pid: Pid<G>,
    pub located_existing: bool,
}

/// an isolated namespace of actors and their name registry. Most programs use the process-wide
/// [`Environment::default`]; tests that need actors in different environments not to see each
/// other's registrations construct their own with [`Environment::new`].
pub struct Environment {
    registry: RegistryHandle,
    default_call_timeout: Option<Duration>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { registry: RegistryHandle::spawn(), default_call_timeout: None }
    }

    /// opts every `call` against actors spawned in this environment into a default timeout
    /// when the caller passes `None`; left disabled by default so a hang only happens if a
    /// caller asks for one, explicitly or via this setting.
    pub fn with_default_call_timeout(mut self, timeout: Duration) -> Self {
        self.default_call_timeout = Some(timeout);
        self
    }

    pub fn default_call_timeout(&self) -> Option<Duration> {
        self.default_call_timeout
    }

    /// the lazily-created, process-wide environment package-level `spawn`/`register`/`whereis`
    /// free functions would delegate to, matching the source's single `env` instance.
    pub fn global() -> &'static Environment {
        static DEFAULT: OnceLock<Environment> = OnceLock::new();
        DEFAULT.get_or_init(Environment::new)
    }

    pub async fn spawn<G: GenServer>(&self, state: G) -> Result<Pid<G>> {
        Ok(self.spawn_with_options(state, SpawnOptions::default()).await?.pid)
    }

    pub async fn spawn_named<G: GenServer>(&self, state: G, name: G::Name) -> Result<Pid<G>> {
        let options = SpawnOptions { name: Some(name), ..Default::default() };
        Ok(self.spawn_with_options(state, options).await?.pid)
    }

    /// `options.return_if_registered` decides whether a taken name fails with `NameTaken` or
    /// hands back the actor already registered under it (spec §4.5 step 2); `located_existing`
    /// on the result says which happened. `state` is only ever constructed by the caller, so on
    /// the "hand back the existing actor" path it's simply dropped unused.
    pub async fn spawn_with_options<G: GenServer>(&self, state: G, options: SpawnOptions<G::Name>) -> Result<SpawnOutcome<G>> {
        let return_if_registered = options.return_if_registered;
        let (pid, newly_created) = process::spawn(
            move || state,
            self.registry.clone(),
            options.prefix,
            options.name,
            options.mailbox_size,
            return_if_registered,
            self.default_call_timeout,
        )
        .await?;
        Ok(SpawnOutcome { pid, located_existing: !newly_created })
    }

    /// atomic "spawn unless already registered under this name" (spec §4.5's `spawnOrLocate`):
    /// requires a name, and only calls `make_state` when no actor is registered under it yet -
    /// so constructing a potentially expensive initial state is never wasted.
    pub async fn spawn_or_locate<G: GenServer>(&self, make_state: impl FnOnce() -> G, options: SpawnOptions<G::Name>) -> Result<SpawnOutcome<G>> {
        if options.name.is_none() {
            return Err(crate::errors::GenServerError::NameRequired);
        }
        let (pid, newly_created) = process::spawn(
            make_state,
            self.registry.clone(),
            options.prefix,
            options.name,
            options.mailbox_size,
            true,
            self.default_call_timeout,
        )
        .await?;
        Ok(SpawnOutcome { pid, located_existing: !newly_created })
    }

    pub async fn register<G: GenServer>(&self, prefix: impl Into<String>, name: &G::Name, pid: Pid<G>) -> bool {
        self.registry.register::<G>(prefix, name, pid).await
    }

    pub async fn unregister<N: crate::registry::Name>(&self, prefix: impl Into<String>, name: &N) {
        self.registry.unregister(prefix, name).await;
    }

    pub async fn whereis<G: GenServer>(&self, prefix: impl Into<String>, name: &G::Name) -> Option<Pid<G>> {
        self.registry.whereis::<G>(prefix, name).await
    }

    pub async fn whereare<G: GenServer>(&self, prefix: impl Into<String>) -> Vec<(String, Pid<G>)> {
        self.registry.whereare::<G>(prefix).await
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
