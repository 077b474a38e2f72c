//! Supervision tree behavior observed through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use procvisor::{
    BackoffPolicy, CallError, ChildSpec, Context, Directive, EventDown, ExitReason, GenServer,
    HandlerError, JitterPolicy, LifecycleKind, Payload, PayloadTag, ProcessId, ProcessRef,
    RestartPolicy, Runtime, RuntimeConfig, Server, SpawnError, StrategyKind, Supervisor,
    SupervisorSpec, SupervisorStrategy, TimerId, which_children,
};
use tokio::sync::broadcast::error::TryRecvError;

struct Counted {
    starts: Arc<AtomicUsize>,
}

#[async_trait]
impl GenServer for Counted {
    async fn init(&mut self, _ctx: &Context) -> Result<(), HandlerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn counted(name: &str, starts: &Arc<AtomicUsize>) -> ChildSpec {
    let starts = Arc::clone(starts);
    ChildSpec::server(name.to_string(), move || Counted {
        starts: Arc::clone(&starts),
    })
}

fn strategy(kind: StrategyKind) -> SupervisorStrategy {
    SupervisorStrategy::new(kind, 5, Duration::from_secs(5))
}

fn lookup(rt: &Runtime, name: &str) -> ProcessRef {
    let pid = rt.whereis(name).expect("registered");
    rt.process(pid).expect("live")
}

fn counters<const N: usize>() -> [Arc<AtomicUsize>; N] {
    std::array::from_fn(|_| Arc::new(AtomicUsize::new(0)))
}

/// Stops the named child with `reason` and waits until it is gone.
async fn stop_with(rt: &Runtime, name: &str, reason: ExitReason) -> ProcessId {
    let child = lookup(rt, name);
    child.stop(reason);
    child.wait().await;
    child.pid()
}

async fn fail(rt: &Runtime, name: &str) -> ProcessId {
    stop_with(rt, name, ExitReason::failure("boom")).await
}

/// Round-trips through the supervisor mailbox so pending exits are handled.
async fn children(rt: &Runtime, sup: &ProcessRef) -> Vec<Option<ProcessId>> {
    which_children(rt, sup.pid())
        .await
        .expect("supervisor alive")
        .into_iter()
        .map(|c| c.pid)
        .collect()
}

#[tokio::test]
async fn one_for_one_restarts_only_the_failed_child() {
    let rt = Runtime::new(RuntimeConfig::default());
    let [a, b, c] = counters();
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForOne))
        .with_children([counted("a", &a), counted("b", &b), counted("c", &c)]);
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    let before = children(&rt, &sup).await;
    let old_b = fail(&rt, "b").await;
    let after = children(&rt, &sup).await;

    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert_ne!(after[1], Some(old_b));
    assert_eq!(rt.whereis("b"), after[1]);
    let counts: Vec<usize> = [&a, &b, &c]
        .iter()
        .map(|n| n.load(Ordering::SeqCst))
        .collect();
    assert_eq!(counts, vec![1, 2, 1]);
}

#[tokio::test]
async fn one_for_all_restarts_every_child_with_fresh_state() {
    let rt = Runtime::new(RuntimeConfig::default());
    let [a, b, c] = counters();
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForAll))
        .with_children([counted("a", &a), counted("b", &b), counted("c", &c)]);
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    let before = children(&rt, &sup).await;
    fail(&rt, "b").await;
    let after = children(&rt, &sup).await;

    for (old, new) in before.iter().zip(&after) {
        assert!(new.is_some());
        assert_ne!(old, new);
    }
    for starts in [&a, &b, &c] {
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }
}

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Ping;

/// On every restart, queues a message to itself from `init`.
struct EagerRestart {
    starts: Arc<AtomicUsize>,
    log: Log,
}

#[async_trait]
impl GenServer for EagerRestart {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        if self.starts.fetch_add(1, Ordering::SeqCst) > 0 {
            ctx.send(ctx.pid(), Payload::new(Ping))?;
        }
        Ok(())
    }

    async fn handle_info(
        &mut self,
        _ctx: &Context,
        _from: Option<ProcessId>,
        _payload: Payload,
    ) -> Result<Directive, HandlerError> {
        self.log.lock().expect("lock").push("a handled");
        Ok(Directive::Continue)
    }
}

/// Takes a second to come back after a restart.
struct SlowRestart {
    starts: Arc<AtomicUsize>,
    log: Log,
}

#[async_trait]
impl GenServer for SlowRestart {
    async fn init(&mut self, _ctx: &Context) -> Result<(), HandlerError> {
        if self.starts.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.log.lock().expect("lock").push("c ready");
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn one_for_all_siblings_wait_for_the_whole_group() {
    let rt = Runtime::new(RuntimeConfig::default());
    let [a, b, c] = counters();
    let log: Log = Arc::default();
    let (a_log, c_log) = (Arc::clone(&log), Arc::clone(&log));
    let (a_starts, c_starts) = (Arc::clone(&a), Arc::clone(&c));

    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForAll))
        .with_child(ChildSpec::server("a", move || EagerRestart {
            starts: Arc::clone(&a_starts),
            log: Arc::clone(&a_log),
        }))
        .with_child(counted("b", &b))
        .with_child(ChildSpec::server("c", move || SlowRestart {
            starts: Arc::clone(&c_starts),
            log: Arc::clone(&c_log),
        }));
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    fail(&rt, "b").await;
    children(&rt, &sup).await;
    // FIFO mailbox: the answer comes after the self-sent message was handled.
    rt.call(lookup(&rt, "a").pid(), Payload::new(()))
        .await
        .expect("a answers");

    assert_eq!(*log.lock().expect("lock"), vec!["c ready", "a handled"]);
    for starts in [&a, &b, &c] {
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn which_children_rejects_a_plain_server() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let worker = rt
        .spawn("worker", Server::new(Counted { starts }))
        .await
        .expect("spawn");

    let err = which_children(&rt, worker.pid())
        .await
        .expect_err("not a supervisor");
    assert!(matches!(err, CallError::UnexpectedReply { pid, got, .. }
        if pid == worker.pid() && got == "()"));
    assert!(worker.is_alive());
}

#[tokio::test]
async fn rest_for_one_leaves_earlier_siblings_untouched() {
    let rt = Runtime::new(RuntimeConfig::default());
    let [a, b, c] = counters();
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::RestForOne))
        .with_children([counted("a", &a), counted("b", &b), counted("c", &c)]);
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    let before = children(&rt, &sup).await;
    fail(&rt, "b").await;
    let after = children(&rt, &sup).await;

    assert_eq!(after[0], before[0]);
    assert_ne!(after[1], before[1]);
    assert_ne!(after[2], before[2]);
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(c.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn sixth_restart_within_the_period_escalates() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForOne))
        .with_child(counted("w", &starts));
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    for _ in 0..5 {
        fail(&rt, "w").await;
        children(&rt, &sup).await;
    }
    assert_eq!(starts.load(Ordering::SeqCst), 6);

    fail(&rt, "w").await;
    let reason = sup.wait().await;
    assert!(matches!(reason, ExitReason::Escalation(ref m) if m.contains("sup")));
    assert_eq!(rt.whereis("w"), None);
    assert_eq!(rt.whereis("sup"), None);
}

#[tokio::test(start_paused = true)]
async fn restart_budget_slides_with_time() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForOne))
        .with_child(counted("w", &starts));
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    for _ in 0..5 {
        fail(&rt, "w").await;
        children(&rt, &sup).await;
    }
    tokio::time::advance(Duration::from_secs(6)).await;

    fail(&rt, "w").await;
    let after = children(&rt, &sup).await;
    assert!(after[0].is_some());
    assert!(sup.is_alive());
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_each_restart() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let backoff = BackoffPolicy {
        first: Duration::from_secs(1),
        max: Duration::from_secs(10),
        factor: 2.0,
        jitter: JitterPolicy::None,
    };
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForOne).with_backoff(backoff))
        .with_child(counted("w", &starts));
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    let t0 = tokio::time::Instant::now();
    fail(&rt, "w").await;
    children(&rt, &sup).await;
    assert!(t0.elapsed() >= Duration::from_secs(1));

    let t1 = tokio::time::Instant::now();
    fail(&rt, "w").await;
    children(&rt, &sup).await;
    assert!(t1.elapsed() >= Duration::from_secs(2));
    assert_eq!(starts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn transient_and_temporary_children_follow_their_policy() {
    let rt = Runtime::new(RuntimeConfig::default());
    let [t, p, tmp] = counters();
    let spec = SupervisorSpec::new("sup")
        .with_strategy(strategy(StrategyKind::OneForOne))
        .with_child(counted("transient", &t).with_restart(RestartPolicy::Transient))
        .with_child(counted("permanent", &p))
        .with_child(counted("temporary", &tmp).with_restart(RestartPolicy::Temporary));
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    stop_with(&rt, "transient", ExitReason::Normal).await;
    stop_with(&rt, "permanent", ExitReason::Normal).await;
    children(&rt, &sup).await;
    fail(&rt, "temporary").await;

    let info = which_children(&rt, sup.pid()).await.expect("alive");
    assert_eq!(info[0].pid, None);
    assert_eq!(info[0].restart, RestartPolicy::Transient);
    assert!(info[1].pid.is_some());
    assert_eq!(info[2].pid, None);
    assert_eq!(p.load(Ordering::SeqCst), 2);
    assert_eq!(tmp.load(Ordering::SeqCst), 1);

    fail(&rt, "permanent").await;
    let info = which_children(&rt, sup.pid()).await.expect("alive");
    assert!(info[1].pid.is_some());
    assert_eq!(p.load(Ordering::SeqCst), 3);
}

struct FailingInit;

#[async_trait]
impl GenServer for FailingInit {
    async fn init(&mut self, _ctx: &Context) -> Result<(), HandlerError> {
        Err(HandlerError::fail("no database"))
    }
}

#[tokio::test]
async fn child_init_failure_fails_the_supervisor_spawn() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let spec = SupervisorSpec::new("sup")
        .with_child(counted("first", &starts))
        .with_child(ChildSpec::server("broken", || FailingInit));

    let err = rt
        .spawn("sup", Supervisor::new(spec))
        .await
        .expect_err("init fails");
    assert!(matches!(err, SpawnError::InitFailed { ref name, ref reason }
        if name == "sup" && reason.contains("no database")));

    assert_eq!(rt.whereis("sup"), None);
    assert_eq!(rt.whereis("first"), None);
    assert!(rt.processes().is_empty());
}

/// Starts fine once, then refuses every later start.
struct OneShot {
    starts: Arc<AtomicUsize>,
}

#[async_trait]
impl GenServer for OneShot {
    async fn init(&mut self, _ctx: &Context) -> Result<(), HandlerError> {
        if self.starts.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(HandlerError::fail("refusing restart"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn failed_restarts_consume_the_budget() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let shared = Arc::clone(&starts);
    let spec = SupervisorSpec::new("sup")
        .with_strategy(SupervisorStrategy::new(
            StrategyKind::OneForOne,
            3,
            Duration::from_secs(5),
        ))
        .with_child(ChildSpec::server("w", move || OneShot {
            starts: Arc::clone(&shared),
        }));
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    fail(&rt, "w").await;
    assert!(matches!(sup.wait().await, ExitReason::Escalation(_)));
    assert_eq!(starts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn escalation_is_handled_by_the_parent_supervisor() {
    let rt = Runtime::new(RuntimeConfig::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let inner = SupervisorSpec::new("inner")
        .with_strategy(SupervisorStrategy::new(
            StrategyKind::OneForOne,
            0,
            Duration::from_secs(5),
        ))
        .with_child(counted("leaf", &starts));
    let outer = SupervisorSpec::new("outer")
        .with_strategy(strategy(StrategyKind::OneForOne))
        .with_child(ChildSpec::supervisor(inner));
    let outer = rt.spawn("outer", Supervisor::new(outer)).await.expect("spawn");

    let old_inner = lookup(&rt, "inner");
    fail(&rt, "leaf").await;
    assert!(matches!(old_inner.wait().await, ExitReason::Escalation(_)));

    let after = children(&rt, &outer).await;
    assert!(after[0].is_some());
    assert_ne!(after[0], Some(old_inner.pid()));
    assert!(rt.whereis("leaf").is_some());
    assert_eq!(starts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn strategy_defaults_to_runtime_config() {
    let cfg = RuntimeConfig {
        default_strategy: SupervisorStrategy::new(
            StrategyKind::OneForAll,
            1,
            Duration::from_secs(5),
        ),
        ..RuntimeConfig::default()
    };
    let rt = Runtime::new(cfg);
    let [a, b] = counters();
    let spec = SupervisorSpec::new("sup").with_children([counted("a", &a), counted("b", &b)]);
    let sup = rt.spawn("sup", Supervisor::new(spec)).await.expect("spawn");

    fail(&rt, "b").await;
    children(&rt, &sup).await;
    assert_eq!(a.load(Ordering::SeqCst), 2);

    fail(&rt, "a").await;
    assert!(matches!(sup.wait().await, ExitReason::Escalation(_)));
}

// ---- producer / consumer tree ----

const NOTIFY: &str = "notify";

struct Tick;

#[derive(Default)]
struct Producer {
    sent: u32,
}

#[async_trait]
impl GenServer for Producer {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.register_event(NOTIFY, PayloadTag::of::<String>())?;
        ctx.send_after(ctx.pid(), Payload::new(Tick), Duration::from_secs(1));
        Ok(())
    }

    async fn handle_timer(
        &mut self,
        ctx: &Context,
        _id: TimerId,
        _payload: Payload,
    ) -> Result<Directive, HandlerError> {
        self.sent += 1;
        ctx.publish(NOTIFY, Payload::new(format!("EVNT {}", self.sent)))?;
        if self.sent == 3 {
            return Ok(Directive::Stop(ExitReason::Normal));
        }
        ctx.send_after(ctx.pid(), Payload::new(Tick), Duration::from_secs(1));
        Ok(Directive::Continue)
    }
}

#[derive(Default)]
struct Inbox {
    events: Mutex<Vec<String>>,
    downs: AtomicUsize,
}

struct Consumer {
    inbox: Arc<Inbox>,
}

#[async_trait]
impl GenServer for Consumer {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.monitor_event(NOTIFY)?;
        Ok(())
    }

    async fn handle_event(
        &mut self,
        _ctx: &Context,
        _event: &str,
        _producer: ProcessId,
        payload: Payload,
    ) -> Result<Directive, HandlerError> {
        if let Some(text) = payload.downcast_ref::<String>() {
            self.inbox.events.lock().expect("lock").push(text.clone());
        }
        Ok(Directive::Continue)
    }

    async fn handle_event_down(
        &mut self,
        _ctx: &Context,
        _down: EventDown,
    ) -> Result<Directive, HandlerError> {
        self.inbox.downs.fetch_add(1, Ordering::SeqCst);
        Ok(Directive::Continue)
    }
}

#[tokio::test(start_paused = true)]
async fn producer_consumer_tree_winds_down_without_restarts() {
    let rt = Runtime::new(RuntimeConfig::default());
    let mut lifecycle = rt.lifecycle();

    let names = ["cons01", "cons02", "cons03"];
    let inboxes: Vec<Arc<Inbox>> = names.iter().map(|_| Arc::default()).collect();

    let workers = SupervisorSpec::new("consumerWorkersSup")
        .with_strategy(strategy(StrategyKind::OneForOne).with_restart(RestartPolicy::Transient))
        .with_children(names.iter().zip(&inboxes).map(|(name, inbox)| {
            let inbox = Arc::clone(inbox);
            ChildSpec::new(name.to_string(), move || {
                Server::new(Consumer {
                    inbox: Arc::clone(&inbox),
                })
                .stop_on_event_down()
            })
        }));
    let app = SupervisorSpec::new("appSup")
        .with_strategy(strategy(StrategyKind::OneForAll).with_restart(RestartPolicy::Transient))
        .with_child(ChildSpec::server("producer", Producer::default))
        .with_child(ChildSpec::supervisor(workers));
    let app = rt.spawn("appSup", Supervisor::new(app)).await.expect("spawn");

    let producer = lookup(&rt, "producer");
    let consumers: Vec<ProcessRef> = names.iter().map(|n| lookup(&rt, n)).collect();

    assert_eq!(producer.wait().await, ExitReason::Normal);
    for consumer in &consumers {
        assert_eq!(consumer.wait().await, ExitReason::Normal);
    }

    for inbox in &inboxes {
        assert_eq!(
            *inbox.events.lock().expect("lock"),
            vec!["EVNT 1", "EVNT 2", "EVNT 3"]
        );
        assert_eq!(inbox.downs.load(Ordering::SeqCst), 1);
    }

    let top = which_children(&rt, app.pid()).await.expect("appSup alive");
    assert_eq!(top[0].pid, None);
    let workers = top[1].pid.expect("workers supervisor alive");
    let leaves = which_children(&rt, workers).await.expect("workers alive");
    assert!(leaves.iter().all(|c| c.pid.is_none()));
    assert!(!rt.events().is_registered(NOTIFY));

    let mut missed = 0;
    loop {
        match lifecycle.try_recv() {
            Ok(ev) => {
                assert_ne!(ev.kind, LifecycleKind::ChildRestarted);
                assert_ne!(ev.kind, LifecycleKind::RestartIntensityExceeded);
            }
            Err(TryRecvError::Lagged(n)) => missed += n,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    assert_eq!(missed, 0, "every lifecycle record was inspected");

    rt.shutdown().await.expect("clean shutdown");
}
