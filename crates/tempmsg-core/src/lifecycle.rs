//! Process lifecycle coordination.
//!
//! A [`Lifecycle`] starts a long-lived workload (typically a server) on its
//! own task, parks the caller until a termination event arrives, and then
//! runs the shutdown procedure exactly once within a fixed grace period.
//!
//! ```text
//! Idle --run--> Running --event--> ShuttingDown --procedure done--> Stopped
//! ```

use core::{fmt, future::Future, pin::pin, time::Duration};

use tokio::sync::{mpsc, oneshot, watch};

use crate::{BoxError, LifecycleError, ShutdownError};

/// Where a [`Lifecycle`] is in its one-way progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

/// Termination events delivered by [`shutdown_signals`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl+C / SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

/// Runs a workload until a termination event, then shuts it down once.
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
    grace_period: Duration,
}

impl Lifecycle {
    /// Creates an idle coordinator whose shutdown procedure may run for at
    /// most `grace_period`.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            state: watch::Sender::new(LifecycleState::Idle),
            grace_period,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Observes state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
        let mut actual = from;
        let moved = self.state.send_if_modified(|state| {
            actual = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::debug!(?from, ?to, "Lifecycle transition");
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition { from: actual, to })
        }
    }

    /// Drives the full lifecycle.
    ///
    /// 1. Spawns `workload` on a tokio task and waits until it has been polled
    ///    once.
    /// 2. Waits for the first event on the channel returned by
    ///    `event_source`. Later events are ignored. A channel that closes
    ///    without an event keeps this waiting forever.
    /// 3. Runs `on_shutdown` under the grace period.
    ///
    /// The workload's own failures are not observed here; it is expected to
    /// report them and end the process itself.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidTransition`] if this coordinator has already
    ///   been run.
    /// - [`LifecycleError::Shutdown`] if `on_shutdown` failed or overran the
    ///   grace period. The coordinator is stopped either way.
    pub async fn run<W, S, F, E, Ev>(
        &self,
        workload: W,
        on_shutdown: S,
        event_source: E,
    ) -> Result<(), LifecycleError>
    where
        W: Future<Output = ()> + Send + 'static,
        S: FnOnce() -> F,
        F: Future<Output = Result<(), BoxError>>,
        E: FnOnce() -> mpsc::Receiver<Ev>,
        Ev: fmt::Debug,
    {
        self.transition(LifecycleState::Idle, LifecycleState::Running)?;

        let (started_tx, started_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut workload = Box::pin(workload);
            let mut started = Some(started_tx);
            core::future::poll_fn(move |cx| {
                let poll = workload.as_mut().poll(cx);
                if let Some(tx) = started.take() {
                    let _ = tx.send(());
                }
                poll
            })
            .await;
        });
        // An error here means the workload panicked on its first poll, which
        // is the workload's own failure to report.
        let _ = started_rx.await;

        let mut events = event_source();
        match events.recv().await {
            Some(event) => tracing::info!(?event, "Shutdown signal received"),
            None => core::future::pending::<()>().await,
        }

        self.transition(LifecycleState::Running, LifecycleState::ShuttingDown)?;
        let outcome = self.shutdown(on_shutdown).await;
        self.transition(LifecycleState::ShuttingDown, LifecycleState::Stopped)?;

        match &outcome {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(e) => tracing::error!(error = %e, "Shutdown did not complete cleanly"),
        }
        outcome.map_err(LifecycleError::from)
    }

    async fn shutdown<S, F>(&self, on_shutdown: S) -> Result<(), ShutdownError>
    where
        S: FnOnce() -> F,
        F: Future<Output = Result<(), BoxError>>,
    {
        let procedure = pin!(on_shutdown());
        match tokio::time::timeout(self.grace_period, procedure).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(ShutdownError::Failed { source }),
            Err(_) => Err(ShutdownError::GracePeriodExceeded {
                grace: self.grace_period,
            }),
        }
    }
}

/// Builds the production event channel: one [`Signal`] per Ctrl+C or SIGTERM
/// received by the process.
///
/// Must be called from within a tokio runtime.
pub fn shutdown_signals() -> mpsc::Receiver<Signal> {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    None
                }
            };

        loop {
            let terminate_recv = async {
                #[cfg(unix)]
                if let Some(signal) = terminate.as_mut() {
                    signal.recv().await;
                    return;
                }
                core::future::pending::<()>().await;
            };

            let signal = tokio::select! {
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => Signal::Interrupt,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                        return;
                    }
                },
                () = terminate_recv => Signal::Terminate,
            };

            if tx.send(signal).await.is_err() {
                return;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use super::*;

    const GRACE: Duration = Duration::from_secs(5);

    fn channel_source(rx: mpsc::Receiver<()>) -> impl FnOnce() -> mpsc::Receiver<()> {
        move || rx
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_runs_once_despite_repeated_events() {
        let lifecycle = Lifecycle::new(GRACE);
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(8);
        for _ in 0..5 {
            tx.send(()).await.unwrap();
        }

        let counter = Arc::clone(&calls);
        lifecycle
            .run(
                core::future::pending(),
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(())
                },
                channel_source(rx),
            )
            .await
            .unwrap();

        // Events after the first go nowhere.
        let _ = tx.send(()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn workload_starts_before_shutdown_and_shutdown_before_return() {
        let lifecycle = Lifecycle::new(GRACE);
        let started = Arc::new(AtomicBool::new(false));
        let started_at_shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_done = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(1);
        // The event is already queued, so only the start handshake orders
        // the workload ahead of shutdown.
        tx.send(()).await.unwrap();

        let workload = {
            let started = Arc::clone(&started);
            async move {
                started.store(true, Ordering::SeqCst);
                core::future::pending::<()>().await;
            }
        };
        let on_shutdown = {
            let started = Arc::clone(&started);
            let started_at_shutdown = Arc::clone(&started_at_shutdown);
            let shutdown_done = Arc::clone(&shutdown_done);
            move || async move {
                started_at_shutdown.store(started.load(Ordering::SeqCst), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                shutdown_done.store(true, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }
        };

        lifecycle
            .run(workload, on_shutdown, channel_source(rx))
            .await
            .unwrap();

        assert!(started_at_shutdown.load(Ordering::SeqCst));
        assert!(shutdown_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn waits_until_an_event_arrives() {
        let lifecycle = Lifecycle::new(GRACE);
        let called = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<()>(1);

        let flag = Arc::clone(&called);
        let run = lifecycle.run(
            async {},
            move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            },
            channel_source(rx),
        );

        let waited = tokio::time::timeout(Duration::from_millis(100), run).await;
        assert!(waited.is_err(), "run returned without an event");
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        drop(tx);
    }

    #[tokio::test]
    async fn closed_event_channel_keeps_waiting() {
        let lifecycle = Lifecycle::new(GRACE);
        let (tx, rx) = mpsc::channel::<()>(1);
        drop(tx);

        let run = lifecycle.run(async {}, || async { Ok::<_, BoxError>(()) }, channel_source(rx));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), run)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn shutdown_failure_is_reported_and_stops() {
        let lifecycle = Lifecycle::new(GRACE);
        let (tx, rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();

        let err = lifecycle
            .run(
                async {},
                || async { Err::<(), BoxError>("server refused to stop".into()) },
                channel_source(rx),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Shutdown(ShutdownError::Failed { .. })
        ));
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_past_grace_period_is_abandoned() {
        let grace = Duration::from_millis(50);
        let lifecycle = Lifecycle::new(grace);
        let (tx, rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();

        let err = lifecycle
            .run(
                async {},
                || async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, BoxError>(())
                },
                channel_source(rx),
            )
            .await
            .unwrap_err();

        match err {
            LifecycleError::Shutdown(ShutdownError::GracePeriodExceeded { grace: g }) => {
                assert_eq!(g, grace);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn cannot_run_twice() {
        let lifecycle = Lifecycle::new(GRACE);
        let (tx, rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();
        lifecycle
            .run(async {}, || async { Ok::<_, BoxError>(()) }, channel_source(rx))
            .await
            .unwrap();

        let (_tx, rx) = mpsc::channel::<()>(1);
        let err = lifecycle
            .run(async {}, || async { Ok::<_, BoxError>(()) }, channel_source(rx))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: LifecycleState::Stopped,
                to: LifecycleState::Running,
            }
        ));
    }

    #[tokio::test]
    async fn subscribers_see_every_transition() {
        let lifecycle = Lifecycle::new(GRACE);
        let mut states = lifecycle.subscribe();
        assert_eq!(*states.borrow_and_update(), LifecycleState::Idle);

        let (tx, rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();

        let during_shutdown = {
            let states = lifecycle.subscribe();
            move || async move { Ok::<_, BoxError>(*states.borrow()) }
        };
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let recorder = Arc::clone(&seen);
        lifecycle
            .run(
                async {},
                move || async move {
                    let state = during_shutdown().await?;
                    *recorder.lock() = Some(state);
                    Ok::<_, BoxError>(())
                },
                channel_source(rx),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock(), Some(LifecycleState::ShuttingDown));
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), LifecycleState::Stopped);
    }
}
