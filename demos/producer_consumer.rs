//! # Producer / Consumer Example
//!
//! A producer registers the `notify` event and publishes three payloads one
//! second apart, then stops. Three consumers monitor the event, print what
//! they receive and stop once the producer is gone.
//!
//! ```text
//! appSup (OneForAll, Transient)
//! ├── producer
//! └── consumerWorkersSup (OneForOne, Transient)
//!     ├── cons01
//!     ├── cons02
//!     └── cons03
//! ```
//!
//! No restart happens: every process stops with a clean reason.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example producer_consumer
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use procvisor::{
    ChildSpec, Context, Directive, EventDown, ExitReason, GenServer, HandlerError, LogWriter,
    Payload, PayloadTag, ProcessId, RestartPolicy, Runtime, RuntimeConfig, Server, StrategyKind,
    Subscribe, Supervisor, SupervisorSpec, SupervisorStrategy, TimerId, which_children,
};
use tracing_subscriber::EnvFilter;

const EVENT: &str = "notify";
const CONSUMERS: [&str; 3] = ["cons01", "cons02", "cons03"];

struct Tick;

#[derive(Default)]
struct Producer {
    sent: u32,
}

#[async_trait]
impl GenServer for Producer {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.register_event(EVENT, PayloadTag::of::<String>())?;
        ctx.send_after(ctx.pid(), Payload::new(Tick), Duration::from_secs(1));
        println!("[producer] registered {EVENT:?}");
        Ok(())
    }

    async fn handle_timer(
        &mut self,
        ctx: &Context,
        _id: TimerId,
        _payload: Payload,
    ) -> Result<Directive, HandlerError> {
        self.sent += 1;
        let text = format!("EVNT {}", self.sent);
        let reached = ctx.publish(EVENT, Payload::new(text.clone()))?;
        println!("[producer] sent {text:?} to {reached} consumer(s)");

        if self.sent == 3 {
            return Ok(Directive::Stop(ExitReason::Normal));
        }
        ctx.send_after(ctx.pid(), Payload::new(Tick), Duration::from_secs(1));
        Ok(Directive::Continue)
    }
}

struct Consumer;

#[async_trait]
impl GenServer for Consumer {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.monitor_event(EVENT)?;
        Ok(())
    }

    async fn handle_event(
        &mut self,
        ctx: &Context,
        event: &str,
        _producer: ProcessId,
        payload: Payload,
    ) -> Result<Directive, HandlerError> {
        if let Some(text) = payload.downcast_ref::<String>() {
            println!("[{}] {event}: {text}", ctx.name().unwrap_or("?"));
        }
        Ok(Directive::Continue)
    }

    async fn handle_event_down(
        &mut self,
        ctx: &Context,
        down: EventDown,
    ) -> Result<Directive, HandlerError> {
        println!(
            "[{}] producer of {:?} is down ({})",
            ctx.name().unwrap_or("?"),
            down.event,
            down.reason
        );
        Ok(Directive::Continue)
    }
}

fn app_spec() -> SupervisorSpec {
    let transient = |kind| {
        SupervisorStrategy::new(kind, 5, Duration::from_secs(5))
            .with_restart(RestartPolicy::Transient)
    };

    let workers = SupervisorSpec::new("consumerWorkersSup")
        .with_strategy(transient(StrategyKind::OneForOne))
        .with_children(CONSUMERS.map(|name| {
            ChildSpec::new(name, || Server::new(Consumer).stop_on_event_down())
        }));

    SupervisorSpec::new("appSup")
        .with_strategy(transient(StrategyKind::OneForAll))
        .with_child(ChildSpec::server("producer", Producer::default))
        .with_child(ChildSpec::supervisor(workers))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = RuntimeConfig {
        grace: Duration::from_secs(5),
        ..RuntimeConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let rt = Runtime::builder(cfg).with_subscribers(subs).build();

    let app = rt.spawn("appSup", Supervisor::new(app_spec())).await?;

    let consumers: Vec<_> = CONSUMERS
        .iter()
        .filter_map(|name| rt.whereis(name))
        .filter_map(|pid| rt.process(pid))
        .collect();
    for consumer in &consumers {
        let reason = consumer.wait().await;
        println!("[main] {} stopped: {reason}", consumer.display_name());
    }

    for child in which_children(&rt, app.pid()).await? {
        println!("[main] appSup child {} → {:?}", child.name, child.pid);
    }

    rt.shutdown().await?;
    println!("[main] done");
    Ok(())
}
