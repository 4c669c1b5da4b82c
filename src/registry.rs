//! the name registry: a single task owning `(prefix, name) -> pid` bindings, serialized through
//! one inbound channel so every allocation and lookup is atomic (spec §4.1).
//!
//! Pids are stored type-erased (`Arc<dyn Any + Send + Sync>`) because a registry is shared by
//! every actor type spawned against one [`crate::Environment`]; callers downcast back to their
//! expected `Pid<G>` on the way out. The source's equivalent is untyped by construction
//! (`interface{}` channels); this is the statically-typed analogue - the `Arc` just gives us a
//! cheap way to clone out of the erased slot.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use crate::errors::{op_failed, GenServerError, Result};
use crate::pid::{Pid, PidId};
use crate::{channel, recv, send, MpscReceiver, MpscSender};

/// bound satisfied by any type usable as a registration name - the typed stand-in for the
/// source's plain `string` name, keyed internally by its `Display` rendering.
pub trait Name: Display + Clone + Eq + Hash + Send + Sync + 'static {}
impl<T> Name for T where T: Display + Clone + Eq + Hash + Send + Sync + 'static {}

type ErasedPid = Arc<dyn Any + Send + Sync>;

/// what `allocate_or_locate` handed back, before the caller downcasts it to a concrete `Pid<G>`.
enum RawAllocation {
    New(PidId),
    Existing(ErasedPid),
}

/// what [`RegistryHandle::allocate_or_locate`] found: either a fresh id for a brand-new actor
/// (the name, if any, is already reserved), or a live actor already registered under that name.
pub(crate) enum Allocation<G: crate::GenServer> {
    New(PidId),
    Existing(Pid<G>),
}

pub(crate) enum RegistryRequest {
    AllocatePid {
        prefix: String,
        name: Option<String>,
        return_if_registered: bool,
        reply: tokio::sync::oneshot::Sender<Result<RawAllocation>>,
    },
    Register {
        prefix: String,
        name: String,
        pid: ErasedPid,
        reply: tokio::sync::oneshot::Sender<bool>,
    },
    Unregister {
        prefix: String,
        name: String,
    },
    Whereis {
        prefix: String,
        name: String,
        reply: tokio::sync::oneshot::Sender<Option<ErasedPid>>,
    },
    Whereare {
        prefix: String,
        reply: tokio::sync::oneshot::Sender<Vec<(String, ErasedPid)>>,
    },
}

/// a cloneable front for the registry task; every [`crate::Environment`] holds one.
#[derive(Clone)]
pub(crate) struct RegistryHandle {
    tx: MpscSender<RegistryRequest>,
}

impl RegistryHandle {
    pub(crate) fn spawn() -> Self {
        let (tx, rx) = channel::<RegistryRequest>(256);
        tokio::spawn(run_registry(rx));
        RegistryHandle { tx }
    }

    /// the source's combined `makePid` request, generalized with `returnIfRegistered` (spec
    /// §4.1's `allocatePid` algorithm): if `name` is already bound to a live actor and
    /// `return_if_registered` is set, hand that actor back instead of reserving a new id.
    /// Otherwise reserve `(prefix, name)` for a fresh id in the same atomic step, so a second
    /// caller racing on the same name can never see it as still free.
    pub(crate) async fn allocate_or_locate<G: crate::GenServer>(
        &self,
        prefix: impl Into<String>,
        name: Option<&G::Name>,
        return_if_registered: bool,
    ) -> Result<Allocation<G>> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        let req = RegistryRequest::AllocatePid {
            prefix: prefix.into(),
            name: name.map(|n| n.to_string()),
            return_if_registered,
            reply,
        };
        send(&self.tx, req).await.map_err(|_| GenServerError::ReceiverClosed)?;
        let raw = rx.await.map_err(|_| GenServerError::ReceiverClosed)??;
        Ok(match raw {
            RawAllocation::New(id) => Allocation::New(id),
            RawAllocation::Existing(erased) => {
                let pid = erased
                    .downcast_ref::<Pid<G>>()
                    .cloned()
                    .ok_or_else(|| op_failed("name already registered to a different actor type"))?;
                Allocation::Existing(pid)
            }
        })
    }

    /// bind `name` to `pid`, replacing the reservation `allocate_or_locate` left behind. Returns
    /// `false` if the registry task is gone.
    pub(crate) async fn register<G: crate::GenServer>(&self, prefix: impl Into<String>, name: &G::Name, pid: Pid<G>) -> bool {
        let (reply, rx) = tokio::sync::oneshot::channel();
        let req = RegistryRequest::Register {
            prefix: prefix.into(),
            name: name.to_string(),
            pid: Arc::new(pid),
            reply,
        };
        if send(&self.tx, req).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub(crate) async fn unregister<N: Name>(&self, prefix: impl Into<String>, name: &N) {
        let req = RegistryRequest::Unregister { prefix: prefix.into(), name: name.to_string() };
        let _ = send(&self.tx, req).await;
    }

    pub(crate) async fn whereis<G: crate::GenServer>(&self, prefix: impl Into<String>, name: &G::Name) -> Option<Pid<G>> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        let req = RegistryRequest::Whereis { prefix: prefix.into(), name: name.to_string(), reply };
        if send(&self.tx, req).await.is_err() {
            return None;
        }
        rx.await.ok().flatten().and_then(|erased| erased.downcast_ref::<Pid<G>>().cloned())
    }

    pub(crate) async fn whereare<G: crate::GenServer>(&self, prefix: impl Into<String>) -> Vec<(String, Pid<G>)> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        let req = RegistryRequest::Whereare { prefix: prefix.into(), reply };
        if send(&self.tx, req).await.is_err() {
            return Vec::new();
        }
        let Ok(entries) = rx.await else { return Vec::new() };
        entries
            .into_iter()
            .filter_map(|(k, erased)| erased.downcast_ref::<Pid<G>>().cloned().map(|p| (k, p)))
            .collect()
    }
}

#[derive(Default)]
struct Bucket {
    by_name: HashMap<String, ErasedPid>,
}

async fn run_registry(rx: MpscReceiver<RegistryRequest>) {
    let mut serial: u64 = 0;
    let mut buckets: HashMap<String, Bucket> = HashMap::new();
    buckets.entry(String::new()).or_default();

    while let Ok(req) = recv(&rx).await {
        match req {
            RegistryRequest::AllocatePid { prefix, name, return_if_registered, reply } => {
                let result = match name {
                    None => {
                        serial += 1;
                        Ok(RawAllocation::New(PidId::new(serial)))
                    }
                    Some(name) => {
                        let bucket = buckets.entry(prefix).or_default();
                        match bucket.by_name.get(&name) {
                            Some(existing) if existing.is::<Reserved>() => Err(GenServerError::NameTaken),
                            Some(existing) if return_if_registered => Ok(RawAllocation::Existing(existing.clone())),
                            Some(_) => Err(GenServerError::NameTaken),
                            None => {
                                serial += 1;
                                let id = PidId::new(serial);
                                bucket.by_name.insert(name, Arc::new(Reserved));
                                Ok(RawAllocation::New(id))
                            }
                        }
                    }
                };
                let _ = reply.send(result);
            }

            RegistryRequest::Register { prefix, name, pid, reply } => {
                let bucket = buckets.entry(prefix).or_default();
                bucket.by_name.insert(name, pid);
                let _ = reply.send(true);
            }

            RegistryRequest::Unregister { prefix, name } => {
                if let Some(bucket) = buckets.get_mut(&prefix) {
                    bucket.by_name.remove(&name);
                }
            }

            RegistryRequest::Whereis { prefix, name, reply } => {
                let found = buckets
                    .get(&prefix)
                    .and_then(|b| b.by_name.get(&name))
                    .filter(|erased| !erased.is::<Reserved>())
                    .cloned();
                let _ = reply.send(found);
            }

            RegistryRequest::Whereare { prefix, reply } => {
                let snapshot: Vec<(String, ErasedPid)> = buckets
                    .get(&prefix)
                    .map(|b| {
                        b.by_name
                            .iter()
                            .filter(|(_, v)| !v.is::<Reserved>())
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let _ = reply.send(snapshot);
            }
        }
    }
}

/// placeholder bound to a name between `allocate_or_locate` reserving it and `register` filling
/// it in - closes the race where a second spawn could otherwise see the name as free, or hand
/// back a not-yet-live actor as "existing".
struct Reserved;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CallOutcome, Context, GenServer};
    use crate::pid::StopReq;
    use async_trait::async_trait;

    struct Dummy;

    #[async_trait]
    impl GenServer for Dummy {
        type CallMsg = ();
        type CastMsg = ();
        type Reply = ();
        type Name = String;

        async fn handle_call(&mut self, _ctx: &Context<'_, Self>, _payload: ()) -> CallOutcome<()> {
            CallOutcome::ReplyOk
        }
    }

    fn dummy_pid(id: u64) -> Pid<Dummy> {
        let (mailbox, _mailbox_rx) = channel::<crate::pid::Envelope<Dummy>>(1);
        let (stop, _stop_rx) = channel::<StopReq>(1);
        Pid::new(PidId::new(id), mailbox, stop, None)
    }

    #[tokio::test]
    async fn anonymous_allocation_always_new() {
        let handle = RegistryHandle::spawn();
        let a = handle.allocate_or_locate::<Dummy>("", None, false).await.unwrap();
        let b = handle.allocate_or_locate::<Dummy>("", None, false).await.unwrap();
        match (a, b) {
            (Allocation::New(id_a), Allocation::New(id_b)) => assert_ne!(id_a, id_b),
            _ => panic!("expected two fresh allocations"),
        }
    }

    #[tokio::test]
    async fn named_allocation_reserves_then_blocks() {
        let handle = RegistryHandle::spawn();
        let first = handle.allocate_or_locate::<Dummy>("g", Some(&"x".to_string()), false).await.unwrap();
        assert!(matches!(first, Allocation::New(_)));

        let second = handle.allocate_or_locate::<Dummy>("g", Some(&"x".to_string()), false).await;
        assert!(second.is_err());
        assert!(second.unwrap_err().is_name_taken());
    }

    #[tokio::test]
    async fn return_if_registered_hands_back_live_pid() {
        let handle = RegistryHandle::spawn();
        match handle.allocate_or_locate::<Dummy>("g", Some(&"y".to_string()), false).await.unwrap() {
            Allocation::New(_) => {}
            _ => panic!("expected a fresh allocation"),
        }

        let live = dummy_pid(7);
        assert!(handle.register::<Dummy>("g", &"y".to_string(), live.clone()).await);

        match handle.allocate_or_locate::<Dummy>("g", Some(&"y".to_string()), true).await.unwrap() {
            Allocation::Existing(pid) => assert_eq!(pid.id(), live.id()),
            _ => panic!("expected the already-registered actor back"),
        }
    }

    #[tokio::test]
    async fn whereis_hides_reserved_not_yet_registered_names() {
        let handle = RegistryHandle::spawn();
        handle.allocate_or_locate::<Dummy>("g", Some(&"z".to_string()), false).await.unwrap();
        assert!(handle.whereis::<Dummy>("g", &"z".to_string()).await.is_none());
    }
}
