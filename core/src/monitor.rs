//! Background connectivity monitoring.
//!
//! # Design
//! `ConnectivityState` is an owned cell backed by a `watch` channel: the
//! monitor writes the latest probe result, consumers either read it or
//! subscribe for changes. It starts optimistic (online) until the first probe
//! resolves. `ConnectivityMonitor::start` probes once immediately and then on
//! a fixed interval until the returned `MonitorHandle` is stopped or dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::service::TwinService;

/// Something that can tell whether the backend is reachable.
///
/// `Ok(false)` means the probe ran and found the backend down; `Err` means
/// the probe itself failed. The monitor treats both as offline.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> Result<bool, ApiError>;
}

#[async_trait]
impl ConnectivityProbe for TwinService {
    async fn probe(&self) -> Result<bool, ApiError> {
        Ok(self.test_connection().await)
    }
}

/// Shared online/offline flag. Cloning yields another handle to the same cell.
#[derive(Debug, Clone)]
pub struct ConnectivityState {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Overwrite the flag. Subscribers are only woken when the value changes.
    pub fn set(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    interval: Duration,
    state: ConnectivityState,
}

impl ConnectivityMonitor {
    pub fn new(interval: Duration, state: ConnectivityState) -> Self {
        Self { interval, state }
    }

    pub fn state(&self) -> &ConnectivityState {
        &self.state
    }

    /// Spawn the probe loop on the current tokio runtime.
    pub fn start<P>(&self, probe: Arc<P>) -> MonitorHandle
    where
        P: ConnectivityProbe + ?Sized + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(probe, self.interval, self.state.clone(), token.clone()));
        tracing::info!(interval_secs = self.interval.as_secs(), "connectivity monitor started");
        MonitorHandle {
            token,
            task: Some(task),
        }
    }
}

async fn run<P>(probe: Arc<P>, period: Duration, state: ConnectivityState, token: CancellationToken)
where
    P: ConnectivityProbe + ?Sized,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let online = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = probe.probe() => match result {
                Ok(online) => online,
                Err(err) => {
                    tracing::warn!(error = %err, "connectivity probe errored, marking offline");
                    false
                }
            },
        };

        if online != state.is_online() {
            tracing::info!(online, "connectivity changed");
        }
        state.set(online);
    }

    tracing::debug!("connectivity monitor stopped");
}

/// Owner of a running monitor. Dropping it cancels the probe loop.
#[derive(Debug)]
pub struct MonitorHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "connectivity monitor task ended abnormally");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Counts calls and replays scripted results, then answers `fallback`.
    struct CountingProbe {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<bool, ApiError>>>,
        fallback: bool,
    }

    impl CountingProbe {
        fn new(fallback: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(VecDeque::new()),
                fallback,
            })
        }

        fn scripted(script: Vec<Result<bool, ApiError>>, fallback: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
                fallback,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectivityProbe for CountingProbe {
        async fn probe(&self) -> Result<bool, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(self.fallback))
        }
    }

    const PERIOD: Duration = Duration::from_secs(30);

    /// Let spawned tasks run up to their next await point.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn state_starts_online() {
        assert!(ConnectivityState::new().is_online());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let state = ConnectivityState::new();
        let mut rx = state.subscribe();
        state.set(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        state.set(false);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn probes_immediately_then_every_interval() {
        let probe = CountingProbe::new(true);
        let monitor = ConnectivityMonitor::new(PERIOD, ConnectivityState::new());
        let handle = monitor.start(probe.clone());

        settle().await;
        assert_eq!(probe.calls(), 1);

        tokio::time::advance(PERIOD).await;
        settle().await;
        assert_eq!(probe.calls(), 2);

        tokio::time::advance(PERIOD * 2).await;
        settle().await;
        assert!(probe.calls() >= 3);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn state_follows_latest_probe() {
        let probe = CountingProbe::scripted(vec![Ok(false), Ok(true)], false);
        let monitor = ConnectivityMonitor::new(PERIOD, ConnectivityState::new());
        let handle = monitor.start(probe.clone());

        settle().await;
        assert!(!monitor.state().is_online());

        tokio::time::advance(PERIOD).await;
        settle().await;
        assert!(monitor.state().is_online());

        tokio::time::advance(PERIOD).await;
        settle().await;
        assert!(!monitor.state().is_online());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_counts_as_offline() {
        let probe = CountingProbe::scripted(vec![Err(ApiError::Transport("probe crashed".into()))], true);
        let monitor = ConnectivityMonitor::new(PERIOD, ConnectivityState::new());
        let handle = monitor.start(probe);

        settle().await;
        assert!(!monitor.state().is_online());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_monitor_never_probes_again() {
        let probe = CountingProbe::new(true);
        let monitor = ConnectivityMonitor::new(PERIOD, ConnectivityState::new());
        let handle = monitor.start(probe.clone());

        settle().await;
        handle.stop().await;
        let calls = probe.calls();

        tokio::time::advance(PERIOD * 10).await;
        settle().await;
        assert_eq!(probe.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let probe = CountingProbe::new(true);
        let monitor = ConnectivityMonitor::new(PERIOD, ConnectivityState::new());
        drop(monitor.start(probe.clone()));

        settle().await;
        let calls = probe.calls();
        tokio::time::advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(calls, 0);
    }
}
