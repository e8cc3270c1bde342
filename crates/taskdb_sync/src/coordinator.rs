//! Replication coordinator state machine.

use crate::config::ReplicatorConfig;
use crate::error::ReplicationResult;
use crate::transport::{ReplicationTransport, TransportStatus};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How long the status listener waits between stop-flag checks.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The current state of the background replication process.
///
/// Independent of the session lifecycle state; it tracks only the sync
/// process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationState {
    /// No replication session exists.
    Stopped,
    /// A replication session is being established.
    Starting,
    /// The replication session is live.
    Running,
    /// The replication session is being torn down.
    Stopping,
    /// Establishing or tearing down the session failed.
    Failed(String),
}

/// The most recently observed transport status, for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationStatus {
    /// Last activity transition seen from the transport.
    pub last_activity: Option<crate::transport::Activity>,
    /// Last error seen from the transport.
    pub last_error: Option<String>,
}

/// Handle for the background status listener.
struct StatusListener {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl StatusListener {
    fn teardown(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Coordinates the background replication session for one store.
///
/// The coordinator drives the transport through `Stopped → Starting →
/// Running → Stopping → Stopped` and records the transport's status
/// transitions. It never retries on its own: reconnect and backoff are
/// the transport's responsibility.
///
/// `pause`/`resume` reuse the configuration built at the first `start`,
/// so repeated cycles never re-derive the endpoint or credentials.
pub struct ReplicationCoordinator {
    transport: Arc<dyn ReplicationTransport>,
    config: RwLock<Option<Arc<ReplicatorConfig>>>,
    state: RwLock<ReplicationState>,
    status: Arc<RwLock<ReplicationStatus>>,
    listener: Mutex<Option<StatusListener>>,
}

impl ReplicationCoordinator {
    /// Creates a coordinator over the given transport.
    pub fn new(transport: Arc<dyn ReplicationTransport>) -> Self {
        Self {
            transport,
            config: RwLock::new(None),
            state: RwLock::new(ReplicationState::Stopped),
            status: Arc::new(RwLock::new(ReplicationStatus::default())),
            listener: Mutex::new(None),
        }
    }

    /// Returns the current replication state.
    pub fn state(&self) -> ReplicationState {
        self.state.read().clone()
    }

    /// Returns the most recently observed transport status.
    pub fn status(&self) -> ReplicationStatus {
        self.status.read().clone()
    }

    /// Returns the configuration the coordinator was last started with.
    pub fn config(&self) -> Option<Arc<ReplicatorConfig>> {
        self.config.read().clone()
    }

    /// Starts replication with the given configuration.
    ///
    /// Transitions `Stopped | Failed → Starting → Running`; a transport
    /// failure moves to `Failed(detail)`. Starting while already
    /// `Starting` or `Running` is a no-op.
    ///
    /// The state lock is not held across `transport.connect`, so a
    /// concurrent `stop` may win the race while the connect is in
    /// flight; in that case the connect is undone and the stop's
    /// `Stopped` state stands.
    pub fn start(&self, config: Arc<ReplicatorConfig>) -> ReplicationResult<()> {
        {
            let mut state = self.state.write();
            match *state {
                ReplicationState::Starting | ReplicationState::Running => return Ok(()),
                ReplicationState::Stopping => {
                    // A concurrent stop is in flight; let it finish first
                    return Ok(());
                }
                ReplicationState::Stopped | ReplicationState::Failed(_) => {
                    *state = ReplicationState::Starting;
                }
            }
        }

        *self.config.write() = Some(Arc::clone(&config));

        // Subscribe before connecting so the first transitions are seen
        let events = self.transport.status_events();

        if let Err(e) = self.transport.connect(&config) {
            let detail = e.to_string();
            tracing::warn!(error = %detail, "replication start failed");
            let mut state = self.state.write();
            if *state == ReplicationState::Starting {
                *state = ReplicationState::Failed(detail);
            }
            return Err(e);
        }

        // Commit only if this start still owns the transition; a stop
        // that raced the connect has already torn everything down.
        let mut state = self.state.write();
        if *state != ReplicationState::Starting {
            drop(state);
            if let Err(e) = self.transport.disconnect() {
                tracing::warn!(error = %e, "disconnect after superseded start failed");
            }
            return Ok(());
        }
        self.spawn_status_listener(events);
        *state = ReplicationState::Running;
        Ok(())
    }

    /// Stops replication.
    ///
    /// Transitions `Running | Starting → Stopping → Stopped`. Stopping an
    /// already-stopped (or failed, or never-started) coordinator is a
    /// no-op. The status listener is removed before the transport is
    /// disconnected.
    pub fn stop(&self) -> ReplicationResult<()> {
        {
            let mut state = self.state.write();
            match *state {
                ReplicationState::Running | ReplicationState::Starting => {
                    *state = ReplicationState::Stopping;
                }
                _ => return Ok(()),
            }
        }

        if let Some(listener) = self.listener.lock().take() {
            listener.teardown();
        }

        if let Err(e) = self.transport.disconnect() {
            let detail = e.to_string();
            tracing::warn!(error = %detail, "replication stop failed");
            *self.state.write() = ReplicationState::Failed(detail);
            return Err(e);
        }

        *self.state.write() = ReplicationState::Stopped;
        Ok(())
    }

    /// Pauses replication.
    ///
    /// Thin alias for [`stop`](Self::stop); the built configuration is
    /// retained for [`resume`](Self::resume).
    pub fn pause(&self) -> ReplicationResult<()> {
        self.stop()
    }

    /// Resumes replication with the previously built configuration.
    ///
    /// A no-op if the coordinator was never started.
    pub fn resume(&self) -> ReplicationResult<()> {
        let config = self.config.read().clone();
        match config {
            Some(config) => self.start(config),
            None => Ok(()),
        }
    }

    fn spawn_status_listener(&self, events: Receiver<TransportStatus>) {
        let stop = Arc::new(AtomicBool::new(false));
        let status = Arc::clone(&self.status);

        let worker = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                run_status_listener(&events, &stop, &status);
            })
        };

        let mut listener = self.listener.lock();
        if let Some(previous) = listener.take() {
            previous.teardown();
        }
        *listener = Some(StatusListener {
            stop,
            worker: Some(worker),
        });
    }
}

impl Drop for ReplicationCoordinator {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.teardown();
        }
    }
}

/// Records transport status transitions; observability only, no retry.
fn run_status_listener(
    events: &Receiver<TransportStatus>,
    stop: &AtomicBool,
    status: &RwLock<ReplicationStatus>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                match &event.error {
                    Some(error) => {
                        tracing::warn!(activity = ?event.activity, error = %error, "replicator error state");
                    }
                    None => {
                        tracing::debug!(activity = ?event.activity, "replicator activity");
                    }
                }
                let mut status = status.write();
                status.last_activity = Some(event.activity);
                if event.error.is_some() {
                    status.last_error = event.error;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasicCredentials;
    use crate::transport::{Activity, MockTransport};
    use std::time::Instant;

    fn make_config() -> Arc<ReplicatorConfig> {
        Arc::new(ReplicatorConfig::new(
            "wss://sync.example.com/tasks",
            "tasks",
            BasicCredentials::new("alice", "secret"),
        ))
    }

    fn wait_for<F: Fn() -> bool>(condition: F) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn initial_state_is_stopped() {
        let coordinator = ReplicationCoordinator::new(Arc::new(MockTransport::new()));
        assert_eq!(coordinator.state(), ReplicationState::Stopped);
        assert!(coordinator.config().is_none());
    }

    #[test]
    fn start_transitions_to_running() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        coordinator.start(make_config()).unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Running);
        assert!(transport.is_connected());
    }

    #[test]
    fn start_failure_transitions_to_failed() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next_connect("auth rejected");
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        let result = coordinator.start(make_config());
        assert!(result.is_err());
        assert!(matches!(coordinator.state(), ReplicationState::Failed(_)));
    }

    #[test]
    fn start_after_failure_recovers() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next_connect("transient");
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        let _ = coordinator.start(make_config());
        coordinator.start(make_config()).unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Running);
    }

    #[test]
    fn start_while_running_is_noop() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        coordinator.start(make_config()).unwrap();
        coordinator.start(make_config()).unwrap();
        assert_eq!(transport.connect_count(), 1);
    }

    #[test]
    fn stop_when_stopped_is_noop() {
        let coordinator = ReplicationCoordinator::new(Arc::new(MockTransport::new()));
        coordinator.stop().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Stopped);
    }

    #[test]
    fn stop_transitions_to_stopped() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        coordinator.start(make_config()).unwrap();
        coordinator.stop().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Stopped);
        assert!(!transport.is_connected());
    }

    #[test]
    fn pause_resume_reuses_configuration() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        let config = make_config();
        coordinator.start(Arc::clone(&config)).unwrap();

        coordinator.pause().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Stopped);

        coordinator.resume().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Running);

        // Same configuration object, not a rebuilt one
        let reused = coordinator.config().unwrap();
        assert!(Arc::ptr_eq(&reused, &config));
        assert_eq!(transport.connect_count(), 2);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        coordinator.start(make_config()).unwrap();
        coordinator.pause().unwrap();
        coordinator.pause().unwrap();
        coordinator.resume().unwrap();
        coordinator.resume().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Running);
    }

    #[test]
    fn resume_without_start_is_noop() {
        let coordinator = ReplicationCoordinator::new(Arc::new(MockTransport::new()));
        coordinator.resume().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Stopped);
    }

    /// A transport whose `connect` blocks until the test releases it,
    /// for exercising stop/start interleavings.
    struct GatedTransport {
        inner: MockTransport,
        entered: Mutex<std::sync::mpsc::Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl GatedTransport {
        fn new() -> (Arc<Self>, Receiver<()>, std::sync::mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = std::sync::mpsc::channel();
            let (release_tx, release_rx) = std::sync::mpsc::channel();
            let transport = Arc::new(Self {
                inner: MockTransport::new(),
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            });
            (transport, entered_rx, release_tx)
        }
    }

    impl crate::transport::ReplicationTransport for GatedTransport {
        fn connect(&self, config: &ReplicatorConfig) -> crate::error::ReplicationResult<()> {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv();
            self.inner.connect(config)
        }

        fn disconnect(&self) -> crate::error::ReplicationResult<()> {
            self.inner.disconnect()
        }

        fn status_events(&self) -> Receiver<TransportStatus> {
            self.inner.status_events()
        }

        fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }
    }

    #[test]
    fn stop_during_start_keeps_the_stop() {
        let (transport, entered, release) = GatedTransport::new();
        let coordinator = Arc::new(ReplicationCoordinator::new(
            Arc::clone(&transport) as Arc<dyn crate::transport::ReplicationTransport>,
        ));

        let starter = {
            let coordinator = Arc::clone(&coordinator);
            std::thread::spawn(move || coordinator.start(make_config()))
        };
        entered
            .recv_timeout(Duration::from_secs(2))
            .expect("connect was not entered");

        // The start is parked inside connect; stop wins the race
        coordinator.stop().unwrap();
        assert_eq!(coordinator.state(), ReplicationState::Stopped);

        release.send(()).unwrap();
        starter.join().unwrap().unwrap();

        // The superseded start must not clobber the stop
        assert_eq!(coordinator.state(), ReplicationState::Stopped);
        assert!(!transport.is_connected());

        // No listener was installed for the superseded start
        transport.inner.emit_status(TransportStatus::activity(Activity::Busy));
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(coordinator.status(), ReplicationStatus::default());
    }

    #[test]
    fn status_listener_records_transitions() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        coordinator.start(make_config()).unwrap();
        wait_for(|| coordinator.status().last_activity == Some(Activity::Idle));

        transport.emit_status(TransportStatus::error(Activity::Offline, "socket reset"));
        wait_for(|| coordinator.status().last_error.is_some());

        let status = coordinator.status();
        assert_eq!(status.last_activity, Some(Activity::Offline));
        assert_eq!(status.last_error.as_deref(), Some("socket reset"));
    }

    #[test]
    fn listener_is_removed_on_stop() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = ReplicationCoordinator::new(Arc::clone(&transport) as _);

        coordinator.start(make_config()).unwrap();
        coordinator.stop().unwrap();

        // Events after stop are not recorded
        transport.emit_status(TransportStatus::error(Activity::Offline, "late error"));
        std::thread::sleep(Duration::from_millis(150));
        assert!(coordinator.status().last_error.is_none());
    }
}
