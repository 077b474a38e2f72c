use async_trait::async_trait;
use tracing::debug;

use crate::core::{Behavior, Context, Directive, ExitReason, Message};
use crate::error::HandlerError;
use crate::server::{CallReply, GenServer};

/// Adapts a [`GenServer`] into a process [`Behavior`].
///
/// By default a server keeps running when the producer of a monitored event
/// goes down; [`stop_on_event_down`](Server::stop_on_event_down) turns that into
/// a clean stop (`ExitReason::Normal`) unless the callback already decided.
pub struct Server<S> {
    inner: S,
    stop_on_event_down: bool,
}

impl<S: GenServer> Server<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stop_on_event_down: false,
        }
    }

    /// Stop normally after `handle_event_down` returns `Continue`.
    pub fn stop_on_event_down(mut self) -> Self {
        self.stop_on_event_down = true;
        self
    }
}

#[async_trait]
impl<S: GenServer> Behavior for Server<S> {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        self.inner.init(ctx).await
    }

    async fn handle_message(
        &mut self,
        ctx: &Context,
        msg: Message,
    ) -> Result<Directive, HandlerError> {
        match msg {
            Message::Call {
                from,
                request,
                reply,
            } => {
                let CallReply {
                    reply: answer,
                    directive,
                } = self.inner.handle_call(ctx, from, request).await?;
                if !reply.send(answer) {
                    debug!(pid = %ctx.pid(), caller = ?from, "caller gave up before reply");
                }
                Ok(directive)
            }
            Message::Cast { from, payload } => self.inner.handle_cast(ctx, from, payload).await,
            Message::Info { from, payload } => self.inner.handle_info(ctx, from, payload).await,
            Message::Timer { id, payload } => self.inner.handle_timer(ctx, id, payload).await,
            Message::Event {
                event,
                producer,
                payload,
            } => {
                self.inner
                    .handle_event(ctx, &event, producer, payload)
                    .await
            }
            Message::EventDown(down) => {
                let directive = self.inner.handle_event_down(ctx, down).await?;
                match directive {
                    Directive::Continue if self.stop_on_event_down => {
                        Ok(Directive::Stop(ExitReason::Normal))
                    }
                    other => Ok(other),
                }
            }
            Message::Exit(exit) => self.inner.handle_exit(ctx, exit).await,
        }
    }

    async fn terminate(&mut self, ctx: &Context, reason: &ExitReason) {
        self.inner.terminate(ctx, reason).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::{Payload, ProcessId, Runtime, RuntimeConfig};
    use crate::error::CallError;

    enum Cmd {
        Add(u64),
        Get,
        Crash,
        Quit,
    }

    #[derive(Default)]
    struct Counter {
        total: u64,
    }

    #[async_trait]
    impl GenServer for Counter {
        async fn handle_call(
            &mut self,
            _ctx: &Context,
            _from: Option<ProcessId>,
            request: Payload,
        ) -> Result<CallReply, HandlerError> {
            match request.downcast_ref::<Cmd>() {
                Some(Cmd::Get) => Ok(CallReply::reply(Payload::new(self.total))),
                Some(Cmd::Quit) => Ok(CallReply::stop(Payload::new(self.total), ExitReason::Normal)),
                Some(Cmd::Crash) => Err(HandlerError::fail("asked to crash")),
                _ => Ok(CallReply::reply(Payload::new(()))),
            }
        }

        async fn handle_cast(
            &mut self,
            _ctx: &Context,
            _from: Option<ProcessId>,
            payload: Payload,
        ) -> Result<Directive, HandlerError> {
            if let Some(Cmd::Add(n)) = payload.downcast_ref::<Cmd>() {
                self.total += n;
            }
            Ok(Directive::Continue)
        }

        async fn handle_info(
            &mut self,
            _ctx: &Context,
            _from: Option<ProcessId>,
            payload: Payload,
        ) -> Result<Directive, HandlerError> {
            if payload.is::<&'static str>() {
                panic!("info handler blew up");
            }
            Ok(Directive::Continue)
        }
    }

    fn total(p: Payload) -> u64 {
        *p.downcast_ref::<u64>().expect("u64 reply")
    }

    #[tokio::test]
    async fn casts_are_applied_before_later_calls() {
        let rt = Runtime::new(RuntimeConfig::default());
        let counter = rt.spawn("counter", Server::new(Counter::default())).await.expect("spawn");

        for n in 1..=4 {
            rt.cast(counter.pid(), Payload::new(Cmd::Add(n))).expect("cast");
        }
        let got = rt.call(counter.pid(), Payload::new(Cmd::Get)).await.expect("call");
        assert_eq!(total(got), 10);

        let last = rt.call(counter.pid(), Payload::new(Cmd::Quit)).await.expect("quit");
        assert_eq!(total(last), 10);
        assert_eq!(counter.wait().await, ExitReason::Normal);
        assert_eq!(rt.whereis("counter"), None);
    }

    #[tokio::test]
    async fn handler_error_fails_the_process_and_drops_the_reply() {
        let rt = Runtime::new(RuntimeConfig::default());
        let counter = rt.spawn_unnamed(Server::new(Counter::default())).await.expect("spawn");

        let err = rt
            .call(counter.pid(), Payload::new(Cmd::Crash))
            .await
            .expect_err("no reply");
        assert_eq!(err, CallError::NoReply { pid: counter.pid() });
        assert_eq!(counter.wait().await, ExitReason::failure("asked to crash"));
    }

    #[tokio::test]
    async fn handler_panic_is_contained() {
        let rt = Runtime::new(RuntimeConfig::default());
        let victim = rt.spawn_unnamed(Server::new(Counter::default())).await.expect("spawn");
        let bystander = rt.spawn_unnamed(Server::new(Counter::default())).await.expect("spawn");

        rt.send(victim.pid(), Payload::new("boom")).expect("send");
        let reason = victim.wait().await;
        assert!(matches!(reason, ExitReason::Failure(ref m) if m.contains("info handler blew up")));

        let got = rt.call(bystander.pid(), Payload::new(Cmd::Get)).await.expect("alive");
        assert_eq!(total(got), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn call_to_a_busy_server_times_out() {
        struct Sleepy;

        #[async_trait]
        impl GenServer for Sleepy {
            async fn handle_call(
                &mut self,
                _ctx: &Context,
                _from: Option<ProcessId>,
                _request: Payload,
            ) -> Result<CallReply, HandlerError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(CallReply::reply(Payload::new(())))
            }
        }

        let rt = Runtime::new(RuntimeConfig::default());
        let sleepy = rt.spawn_unnamed(Server::new(Sleepy)).await.expect("spawn");
        let err = rt
            .call_timeout(sleepy.pid(), Payload::new(()), Duration::from_millis(100))
            .await
            .expect_err("timeout");
        assert_eq!(
            err,
            CallError::Timeout {
                pid: sleepy.pid(),
                timeout: Duration::from_millis(100),
            }
        );
    }

    #[tokio::test]
    async fn unhandled_call_replies_unit() {
        struct Silent;
        impl GenServer for Silent {}

        let rt = Runtime::new(RuntimeConfig::default());
        let silent = rt.spawn_unnamed(Server::new(Silent)).await.expect("spawn");
        let reply = rt.call(silent.pid(), Payload::new(1_u8)).await.expect("reply");
        assert!(reply.is::<()>());
    }
}
