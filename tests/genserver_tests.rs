use std::time::Duration;

use async_trait::async_trait;
use odin_genserver::prelude::*;

struct Counter {
    i: i64,
}

enum CounterMsg {
    Inc,
    Get,
}

#[async_trait]
impl GenServer for Counter {
    type CallMsg = CounterMsg;
    type CastMsg = ();
    type Reply = i64;
    type Name = String;

    async fn handle_call(&mut self, _ctx: &Context<'_, Self>, payload: CounterMsg) -> CallOutcome<i64> {
        match payload {
            CounterMsg::Inc => {
                self.i += 1;
                CallOutcome::Reply(self.i)
            }
            CounterMsg::Get => CallOutcome::Reply(self.i),
        }
    }
}

struct CrashActor;

enum CrashCall {
    Ping,
    Crash,
}

#[async_trait]
impl GenServer for CrashActor {
    type CallMsg = CrashCall;
    type CastMsg = ();
    type Reply = i64;
    type Name = String;

    async fn handle_call(&mut self, _ctx: &Context<'_, Self>, payload: CrashCall) -> CallOutcome<i64> {
        match payload {
            CrashCall::Ping => CallOutcome::Reply(1),
            CrashCall::Crash => {
                let zero: i64 = 0;
                let _ = 10 / zero;
                CallOutcome::Reply(0)
            }
        }
    }
}

#[derive(Default)]
struct SilentActor {
    // holds every deferred reply forever so the caller's `call` never gets an answer -
    // used to exercise the call-timeout path.
    held: Vec<ReplyTo<()>>,
}

enum SilentCall {
    Ping,
}

#[async_trait]
impl GenServer for SilentActor {
    type CallMsg = SilentCall;
    type CastMsg = ();
    type Reply = ();
    type Name = String;

    async fn handle_call(&mut self, ctx: &Context<'_, Self>, _payload: SilentCall) -> CallOutcome<()> {
        if let Some(reply_to) = ctx.defer_reply() {
            self.held.push(reply_to);
        }
        CallOutcome::NoReply
    }
}

struct InactivityActor {
    timed_out: bool,
}

enum InactCall {
    GetTimedOut,
}

#[async_trait]
impl GenServer for InactivityActor {
    type CallMsg = InactCall;
    type CastMsg = ();
    type Reply = bool;
    type Name = String;

    async fn init(&mut self, _ctx: &Context<'_, Self>) -> InitOutcome {
        InitOutcome::OkTimeout(Duration::from_millis(300))
    }

    async fn handle_call(&mut self, _ctx: &Context<'_, Self>, payload: InactCall) -> CallOutcome<bool> {
        match payload {
            InactCall::GetTimedOut => CallOutcome::Reply(self.timed_out),
        }
    }

    async fn handle_cast(&mut self, _ctx: &Context<'_, Self>, payload: Cast<()>) -> CastOutcome {
        if let Cast::Timeout = payload {
            self.timed_out = true;
        }
        CastOutcome::NoReply
    }
}

struct TimerActor {
    fired: bool,
    timer: Option<Timer>,
}

enum TimerCall {
    Start,
    Stop,
    GetFired,
}

enum TimerCast {
    Fired,
}

#[async_trait]
impl GenServer for TimerActor {
    type CallMsg = TimerCall;
    type CastMsg = TimerCast;
    type Reply = bool;
    type Name = String;

    async fn handle_call(&mut self, ctx: &Context<'_, Self>, payload: TimerCall) -> CallOutcome<bool> {
        match payload {
            TimerCall::Start => {
                self.timer = Some(ctx.pid().send_after_with_stop(Duration::from_millis(500), TimerCast::Fired));
                CallOutcome::ReplyOk
            }
            TimerCall::Stop => {
                if let Some(timer) = &mut self.timer {
                    timer.stop();
                }
                CallOutcome::ReplyOk
            }
            TimerCall::GetFired => CallOutcome::Reply(self.fired),
        }
    }

    async fn handle_cast(&mut self, _ctx: &Context<'_, Self>, payload: Cast<TimerCast>) -> CastOutcome {
        if let Cast::User(TimerCast::Fired) = payload {
            self.fired = true;
        }
        CastOutcome::NoReply
    }
}

#[tokio::test]
async fn counter_increments() {
    let env = Environment::new();
    let pid = env.spawn(Counter { i: 10 }).await.unwrap();

    let v1 = pid.call(CounterMsg::Inc, None).await.unwrap();
    assert_eq!(v1, 11);

    let v2 = pid.call(CounterMsg::Inc, None).await.unwrap();
    assert_eq!(v2, 12);
}

#[tokio::test]
async fn spawn_or_locate_returns_same_actor() {
    let env = Environment::new();
    let opts = SpawnOptions { name: Some("n1".to_string()), ..Default::default() };

    let first = env.spawn_or_locate(|| Counter { i: 10 }, opts.clone()).await.unwrap();
    assert!(!first.located_existing);

    for _ in 0..10 {
        first.pid.call(CounterMsg::Inc, None).await.unwrap();
    }
    assert_eq!(first.pid.call(CounterMsg::Get, None).await.unwrap(), 20);

    let second = env.spawn_or_locate(|| Counter { i: 10 }, opts).await.unwrap();
    assert!(second.located_existing);
    assert_eq!(second.pid.id(), first.pid.id());
    assert_eq!(second.pid.call(CounterMsg::Get, None).await.unwrap(), 20);
}

#[tokio::test]
async fn duplicate_name_fails_and_whereare_snapshots() {
    let env = Environment::new();
    let opts_a = SpawnOptions { prefix: "g".to_string(), name: Some("a".to_string()), ..Default::default() };

    let outcome = env.spawn_with_options(Counter { i: 0 }, opts_a.clone()).await.unwrap();
    assert!(!outcome.located_existing);

    let dup = env.spawn_with_options(Counter { i: 0 }, opts_a).await;
    assert!(dup.unwrap_err().is_name_taken());

    let opts_b = SpawnOptions { prefix: "g".to_string(), name: Some("b".to_string()), ..Default::default() };
    env.spawn_with_options(Counter { i: 0 }, opts_b).await.unwrap();

    let snapshot: Vec<(String, Pid<Counter>)> = env.whereare("g").await;
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn crash_in_call_then_no_proc() {
    let env = Environment::new();
    let pid = env.spawn(CrashActor).await.unwrap();

    assert_eq!(pid.call(CrashCall::Ping, None).await.unwrap(), 1);

    let crashed = pid.call(CrashCall::Crash, None).await;
    assert!(crashed.unwrap_err().is_crashed());

    let after = pid.call(CrashCall::Ping, None).await;
    assert!(after.unwrap_err().is_no_proc());
}

#[tokio::test]
async fn environment_default_call_timeout_applies_when_none_passed() {
    let env = Environment::new().with_default_call_timeout(Duration::from_millis(50));
    let pid = env.spawn(SilentActor::default()).await.unwrap();

    let result = pid.call(SilentCall::Ping, None).await;
    assert!(matches!(result, Err(GenServerError::Timeout(_))));
}

#[tokio::test]
async fn inactivity_timer_fires_when_idle() {
    let env = Environment::new();
    let pid = env.spawn(InactivityActor { timed_out: false }).await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(pid.call(InactCall::GetTimedOut, None).await.unwrap());
}

#[tokio::test]
async fn inactivity_timer_cancelled_by_activity() {
    let env = Environment::new();
    let pid = env.spawn(InactivityActor { timed_out: false }).await.unwrap();

    // each call below lands well within the 300ms window and is itself activity that
    // resets the timer, so it never gets a chance to fire.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pid.call(InactCall::GetTimedOut, None).await.unwrap());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pid.call(InactCall::GetTimedOut, None).await.unwrap());
}

#[tokio::test]
async fn stoppable_timer_can_be_cancelled() {
    let env = Environment::new();
    let pid = env.spawn(TimerActor { fired: false, timer: None }).await.unwrap();

    pid.call(TimerCall::Start, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    pid.call(TimerCall::Stop, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!pid.call(TimerCall::GetFired, None).await.unwrap());

    // stopping an already-stopped timer is a no-op, not an error.
    pid.call(TimerCall::Stop, None).await.unwrap();
}

#[tokio::test]
async fn environments_are_isolated() {
    let env_a = Environment::new();
    let env_b = Environment::new();

    env_a.spawn_named(Counter { i: 0 }, "shared".to_string()).await.unwrap();

    assert!(env_b.whereis::<Counter>("", &"shared".to_string()).await.is_none());
}
