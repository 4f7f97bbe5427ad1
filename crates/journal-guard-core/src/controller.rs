//! Lock session controller
//!
//! Gates the journal behind device authentication and locks it again after a
//! fixed dwell time.
//!
//! The controller is a single task owning all lock state. Requests arrive on
//! a command channel and are serialized with the in-flight authentication and
//! the two deadlines in one `select!` loop, so no state is ever shared or
//! locked. Tearing the task down drops the deadlines and any pending
//! authentication together.

use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LockConfig;
use crate::device::{verify_user, DeviceAuthenticator};
use crate::error::{AuthFailure, GuardError, Result};
use crate::events::LockEvent;
use crate::services::{Navigator, Notifier};
use crate::state::{LockState, TransitionReason};
use crate::timer::{OneShotTimer, TimerKind};

/// Capacity of the lifecycle event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Title used for failure notices
const FAILURE_TITLE: &str = "Error";

/// How an unlock request was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Authentication succeeded and the view is unlocked
    Unlocked,
    /// The request arrived outside `Locked` and was ignored
    Ignored(LockState),
    /// Authentication was refused and the view stays locked
    Failed(AuthFailure),
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: LockState,
    pub relock_armed: bool,
    pub navigation_armed: bool,
    pub unlock_in_flight: bool,
}

enum Command {
    RequestUnlock {
        reply: oneshot::Sender<UnlockOutcome>,
    },
    NavigateAway {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Teardown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle for driving a running controller
#[derive(Clone)]
pub struct LockHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<LockState>,
    events: broadcast::Sender<LockEvent>,
}

impl LockHandle {
    /// Ask the device to authenticate the user and unlock the view
    ///
    /// Resolves once the attempt settles. Calls made while an attempt is in
    /// flight, or while already unlocked, resolve immediately as
    /// [`UnlockOutcome::Ignored`].
    pub async fn request_unlock(&self) -> Result<UnlockOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::RequestUnlock { reply })?;
        rx.await.map_err(|_| GuardError::ControllerClosed)
    }

    /// Request an unlock, joining an attempt that is already in flight
    ///
    /// Unlike [`request_unlock`](Self::request_unlock), a request made while
    /// `Unlocking` waits for that attempt and reports how it settled. A request
    /// made while already unlocked still resolves as `Ignored(Unlocked)`.
    pub async fn unlock(&self) -> Result<UnlockOutcome> {
        // Subscribe first so the settling events cannot slip past
        let mut events = self.events();

        match self.request_unlock().await? {
            UnlockOutcome::Ignored(LockState::Unlocking) => {}
            outcome => return Ok(outcome),
        }

        debug!("Joining in-flight unlock");
        loop {
            match events.recv().await {
                Ok(LockEvent::StateChanged {
                    to: LockState::Unlocked,
                    ..
                }) => return Ok(UnlockOutcome::Unlocked),
                Ok(LockEvent::UnlockFailed { failure, .. }) => {
                    return Ok(UnlockOutcome::Failed(failure))
                }
                Ok(LockEvent::TornDown { .. }) | Err(broadcast::error::RecvError::Closed) => {
                    return Err(GuardError::ControllerClosed)
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Settling events may be lost; fall back to the live view
                    let snapshot = self.snapshot().await?;
                    if !snapshot.unlock_in_flight {
                        return Ok(match snapshot.state {
                            LockState::Unlocked => UnlockOutcome::Unlocked,
                            _ => UnlockOutcome::Failed(AuthFailure::AuthenticationFailed),
                        });
                    }
                }
            }
        }
    }

    /// Leave the protected view, locking it if it was unlocked
    ///
    /// Returns whether the view was unlocked.
    pub async fn navigate_away(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::NavigateAway { reply })?;
        rx.await.map_err(|_| GuardError::ControllerClosed)
    }

    /// Timers and in-flight authentication as the controller sees them
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| GuardError::ControllerClosed)
    }

    /// Stop the controller, cancelling every pending timer
    ///
    /// Safe to call more than once.
    pub async fn teardown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Teardown { reply }).is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    /// Current lock state
    pub fn state(&self) -> LockState {
        *self.state.borrow()
    }

    /// Watch the lock state
    pub fn subscribe(&self) -> watch::Receiver<LockState> {
        self.state.clone()
    }

    /// Subscribe to lifecycle events emitted from now on
    pub fn events(&self) -> broadcast::Receiver<LockEvent> {
        self.events.subscribe()
    }

    /// Whether the controller task is still accepting commands
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| GuardError::ControllerClosed)
    }
}

/// Controls access to the protected view
pub struct LockSessionController {
    config: LockConfig,
    device: Arc<dyn DeviceAuthenticator>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,

    state: LockState,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<LockState>,
    event_tx: broadcast::Sender<LockEvent>,

    /// In-flight authentication, if any
    pending_auth: Option<BoxFuture<'static, std::result::Result<(), AuthFailure>>>,
    /// Caller waiting on the in-flight authentication
    pending_reply: Option<oneshot::Sender<UnlockOutcome>>,

    relock: OneShotTimer,
    navigation: OneShotTimer,
}

impl LockSessionController {
    /// Create a controller and its handle without starting it
    pub fn new(
        config: LockConfig,
        device: Arc<dyn DeviceAuthenticator>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(Self, LockHandle)> {
        config.validate()?;

        let (command_tx, commands) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LockState::Locked);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let handle = LockHandle {
            commands: command_tx,
            state: state_rx,
            events: event_tx.clone(),
        };

        let controller = Self {
            config,
            device,
            navigator,
            notifier,
            state: LockState::Locked,
            commands,
            state_tx,
            event_tx,
            pending_auth: None,
            pending_reply: None,
            relock: OneShotTimer::new(),
            navigation: OneShotTimer::new(),
        };

        Ok((controller, handle))
    }

    /// Create a controller and run it on the current tokio runtime
    pub fn spawn(
        config: LockConfig,
        device: Arc<dyn DeviceAuthenticator>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(LockHandle, JoinHandle<()>)> {
        let (controller, handle) = Self::new(config, device, navigator, notifier)?;
        let task = tokio::spawn(controller.run());
        Ok((handle, task))
    }

    /// Run the controller until teardown or until every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Lock controller started (method: {}, relock after {}ms)",
            self.device.method_name(),
            self.config.relock_delay_ms
        );

        if self.config.unlock_on_start {
            self.request_unlock(None);
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::RequestUnlock { reply }) => self.request_unlock(Some(reply)),
                    Some(Command::NavigateAway { reply }) => {
                        let _ = reply.send(self.navigate_away());
                    }
                    Some(Command::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Command::Teardown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.teardown();
                        break;
                    }
                },
                result = settle(&mut self.pending_auth) => self.finish_unlock(result),
                _ = self.relock.fired() => self.on_relock_timer_fired(),
                _ = self.navigation.fired() => self.on_navigation_due(),
            }
        }

        debug!("Lock controller stopped");
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            relock_armed: self.relock.is_armed(),
            navigation_armed: self.navigation.is_armed(),
            unlock_in_flight: self.pending_auth.is_some(),
        }
    }

    fn request_unlock(&mut self, reply: Option<oneshot::Sender<UnlockOutcome>>) {
        if self.state != LockState::Locked || self.pending_auth.is_some() {
            debug!("Unlock request ignored while {}", self.state);
            if let Some(reply) = reply {
                let _ = reply.send(UnlockOutcome::Ignored(self.state));
            }
            return;
        }

        self.transition(LockState::Unlocking, TransitionReason::UnlockRequested);

        let device = Arc::clone(&self.device);
        let prompt = self.config.unlock_prompt.clone();
        self.pending_auth = Some(async move { verify_user(device.as_ref(), &prompt).await }.boxed());
        self.pending_reply = reply;
    }

    fn finish_unlock(&mut self, result: std::result::Result<(), AuthFailure>) {
        let outcome = match result {
            Ok(()) => {
                self.transition(LockState::Unlocked, TransitionReason::Authenticated);
                self.arm(TimerKind::ReLock);
                self.arm(TimerKind::Navigation);
                UnlockOutcome::Unlocked
            }
            Err(failure) => {
                warn!("Unlock failed: {}", failure);
                self.transition(LockState::Locked, TransitionReason::AuthFailed);
                self.notifier.show(FAILURE_TITLE, failure.user_message());
                self.emit(LockEvent::UnlockFailed {
                    failure: failure.clone(),
                    timestamp: Utc::now(),
                });
                UnlockOutcome::Failed(failure)
            }
        };

        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(outcome);
        }
    }

    fn on_relock_timer_fired(&mut self) {
        self.cancel(TimerKind::Navigation);
        self.transition(LockState::Locked, TransitionReason::ReLockTimer);
    }

    fn on_navigation_due(&mut self) {
        let route = self.config.unlock_route;
        self.navigator.go_to(route, None);
        self.emit(LockEvent::Navigated {
            route,
            timestamp: Utc::now(),
        });
    }

    fn navigate_away(&mut self) -> bool {
        if self.state != LockState::Unlocked {
            return false;
        }

        self.cancel(TimerKind::ReLock);
        self.cancel(TimerKind::Navigation);
        self.transition(LockState::Locked, TransitionReason::NavigatedAway);
        self.navigator.go_back();
        true
    }

    fn teardown(&mut self) {
        self.cancel(TimerKind::ReLock);
        self.cancel(TimerKind::Navigation);

        if self.pending_auth.take().is_some() {
            debug!("Dropping in-flight authentication");
        }
        // Waiting caller sees the controller close
        self.pending_reply = None;

        if self.state != LockState::Locked {
            self.transition(LockState::Locked, TransitionReason::Teardown);
        }

        self.emit(LockEvent::TornDown {
            timestamp: Utc::now(),
        });
        info!("Lock controller torn down");
    }

    fn arm(&mut self, kind: TimerKind) {
        let delay = match kind {
            TimerKind::ReLock => self.config.relock_delay(),
            TimerKind::Navigation => self.config.navigation_delay(),
        };
        self.timer_mut(kind).arm(delay);

        debug!("Armed {} timer for {:?}", kind, delay);
        self.emit(LockEvent::TimerArmed {
            timer: kind,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
        });
    }

    fn cancel(&mut self, kind: TimerKind) {
        if self.timer_mut(kind).cancel() {
            debug!("Cancelled {} timer", kind);
            self.emit(LockEvent::TimerCancelled {
                timer: kind,
                timestamp: Utc::now(),
            });
        }
    }

    fn timer_mut(&mut self, kind: TimerKind) -> &mut OneShotTimer {
        match kind {
            TimerKind::ReLock => &mut self.relock,
            TimerKind::Navigation => &mut self.navigation,
        }
    }

    fn transition(&mut self, to: LockState, reason: TransitionReason) {
        let from = self.state;
        if !from.can_transition_to(to) {
            warn!("Refusing transition {} -> {} ({})", from, to, reason);
            return;
        }

        self.state = to;
        self.state_tx.send_replace(to);

        let event = LockEvent::StateChanged {
            from,
            to,
            reason,
            timestamp: Utc::now(),
        };
        info!("{}", event.to_audit_string());
        self.emit(event);
    }

    fn emit(&self, event: LockEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

/// Wait for the in-flight authentication, clearing the slot when it settles
async fn settle(
    slot: &mut Option<BoxFuture<'static, std::result::Result<(), AuthFailure>>>,
) -> std::result::Result<(), AuthFailure> {
    match slot {
        Some(auth) => {
            let result = auth.await;
            *slot = None;
            result
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{SimulatedAuthenticator, SimulatedOutcome};
    use crate::services::{NavigationAction, NotificationCenter, Route, Router};
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;

    struct Harness {
        handle: LockHandle,
        task: JoinHandle<()>,
        device: Arc<SimulatedAuthenticator>,
        router: Arc<Router>,
        notices: Arc<NotificationCenter>,
        events: broadcast::Receiver<LockEvent>,
    }

    fn start(config: LockConfig, device: SimulatedAuthenticator) -> Harness {
        let device = Arc::new(device);
        let router = Arc::new(Router::starting_at(Route::JournalCover));
        let notices = Arc::new(NotificationCenter::new());

        let (controller, handle) = LockSessionController::new(
            config,
            device.clone(),
            router.clone(),
            notices.clone(),
        )
        .unwrap();
        let events = handle.events();
        let task = tokio::spawn(controller.run());

        Harness {
            handle,
            task,
            device,
            router,
            notices,
            events,
        }
    }

    fn test_config() -> LockConfig {
        LockConfig::default()
            .with_relock_delay(Duration::from_secs(1))
            .with_navigation_delay(Duration::from_millis(500))
    }

    fn drain(events: &mut broadcast::Receiver<LockEvent>) -> Vec<LockEvent> {
        let mut out = Vec::new();
        loop {
            match events.try_recv() {
                Ok(event) => out.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        out
    }

    fn states(events: &[LockEvent]) -> Vec<LockState> {
        let mut seq = Vec::new();
        for (from, to) in events.iter().filter_map(LockEvent::transition) {
            if seq.is_empty() {
                seq.push(from);
            }
            seq.push(to);
        }
        seq
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_unlock_then_relock() {
        let mut h = start(test_config(), SimulatedAuthenticator::new(SimulatedOutcome::Success));

        let outcome = h.handle.request_unlock().await.unwrap();
        assert_eq!(outcome, UnlockOutcome::Unlocked);
        assert_eq!(h.handle.state(), LockState::Unlocked);

        let snap = h.handle.snapshot().await.unwrap();
        assert!(snap.relock_armed);
        assert!(snap.navigation_armed);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let snap = h.handle.snapshot().await.unwrap();
        assert_eq!(snap.state, LockState::Locked);
        assert!(!snap.relock_armed);
        assert!(!snap.navigation_armed);

        let events = drain(&mut h.events);
        assert_eq!(
            states(&events),
            vec![
                LockState::Locked,
                LockState::Unlocking,
                LockState::Unlocked,
                LockState::Locked
            ]
        );
        assert_eq!(h.router.visits(Route::JournalBody), 1);
        assert!(h.notices.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_relock_timer_per_unlock() {
        let mut h = start(test_config(), SimulatedAuthenticator::new(SimulatedOutcome::Success));

        h.handle.request_unlock().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let events = drain(&mut h.events);
        let armed = events
            .iter()
            .filter(|e| matches!(e, LockEvent::TimerArmed { timer: TimerKind::ReLock, .. }))
            .count();
        let relocks = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    LockEvent::StateChanged {
                        reason: TransitionReason::ReLockTimer,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(armed, 1);
        assert_eq!(relocks, 1);
        assert_eq!(h.handle.state(), LockState::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentrant_requests_are_ignored() {
        let device = SimulatedAuthenticator::new(SimulatedOutcome::Success)
            .with_latency(Duration::from_millis(200));
        let h = start(test_config(), device);

        let first = {
            let handle = h.handle.clone();
            tokio::spawn(async move { handle.request_unlock().await })
        };

        let mut state = h.handle.subscribe();
        state
            .wait_for(|s| *s == LockState::Unlocking)
            .await
            .unwrap();

        for _ in 0..3 {
            let outcome = h.handle.request_unlock().await.unwrap();
            assert_eq!(outcome, UnlockOutcome::Ignored(LockState::Unlocking));
        }

        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, UnlockOutcome::Unlocked);
        assert_eq!(h.device.attempts(), 1);

        // Already unlocked
        let outcome = h.handle.request_unlock().await.unwrap();
        assert_eq!(outcome, UnlockOutcome::Ignored(LockState::Unlocked));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_hardware_stays_locked() {
        let mut h = start(
            test_config(),
            SimulatedAuthenticator::new(SimulatedOutcome::NoHardware),
        );

        let outcome = h.handle.request_unlock().await.unwrap();
        assert_eq!(outcome, UnlockOutcome::Failed(AuthFailure::HardwareUnavailable));
        assert_eq!(h.handle.state(), LockState::Locked);

        let snap = h.handle.snapshot().await.unwrap();
        assert!(!snap.relock_armed);
        assert!(!snap.navigation_armed);

        let notice = h.notices.latest().unwrap();
        assert_eq!(notice.title, "Error");
        assert_eq!(
            notice.message,
            AuthFailure::HardwareUnavailable.user_message()
        );

        let events = drain(&mut h.events);
        assert!(!events
            .iter()
            .any(|e| matches!(e, LockEvent::TimerArmed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_prompt_reverts_to_locked() {
        let mut h = start(test_config(), SimulatedAuthenticator::new(SimulatedOutcome::Cancel));

        let outcome = h.handle.request_unlock().await.unwrap();
        assert_eq!(outcome, UnlockOutcome::Failed(AuthFailure::AuthenticationFailed));

        let events = drain(&mut h.events);
        assert_eq!(
            states(&events),
            vec![LockState::Locked, LockState::Unlocking, LockState::Locked]
        );
        assert_eq!(
            h.notices.latest().unwrap().message,
            AuthFailure::AuthenticationFailed.user_message()
        );
        assert_eq!(h.router.visits(Route::JournalBody), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_retried() {
        let h = start(
            test_config(),
            SimulatedAuthenticator::scripted(vec![
                SimulatedOutcome::Error,
                SimulatedOutcome::Success,
            ]),
        );

        let outcome = h.handle.request_unlock().await.unwrap();
        assert!(matches!(
            outcome,
            UnlockOutcome::Failed(AuthFailure::AuthenticationError(_))
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.device.attempts(), 1);
        assert_eq!(h.handle.state(), LockState::Locked);

        // User retries
        let outcome = h.handle.request_unlock().await.unwrap();
        assert_eq!(outcome, UnlockOutcome::Unlocked);
        assert_eq!(h.device.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_relock() {
        let mut h = start(test_config(), SimulatedAuthenticator::new(SimulatedOutcome::Success));

        h.handle.request_unlock().await.unwrap();
        h.handle.teardown().await.unwrap();
        h.task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;

        let events = drain(&mut h.events);
        assert!(events
            .iter()
            .any(|e| matches!(e, LockEvent::TimerCancelled { timer: TimerKind::ReLock, .. })));
        assert!(!events.iter().any(|e| matches!(
            e,
            LockEvent::StateChanged {
                reason: TransitionReason::ReLockTimer,
                ..
            }
        )));
        assert!(matches!(events.last(), Some(LockEvent::TornDown { .. })));
        assert_eq!(h.router.visits(Route::JournalBody), 0);

        assert!(!h.handle.is_running());
        assert!(matches!(
            h.handle.request_unlock().await,
            Err(GuardError::ControllerClosed)
        ));
        // Second teardown is a no-op
        h.handle.teardown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_during_unlock_closes_request() {
        let device = SimulatedAuthenticator::new(SimulatedOutcome::Success)
            .with_latency(Duration::from_secs(1));
        let h = start(test_config(), device);

        let pending = {
            let handle = h.handle.clone();
            tokio::spawn(async move { handle.request_unlock().await })
        };
        let mut state = h.handle.subscribe();
        state
            .wait_for(|s| *s == LockState::Unlocking)
            .await
            .unwrap();

        h.handle.teardown().await.unwrap();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(GuardError::ControllerClosed)));
        assert_eq!(h.handle.state(), LockState::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relock_before_navigation_cancels_it() {
        let config = LockConfig::default()
            .with_relock_delay(Duration::from_millis(200))
            .with_navigation_delay(Duration::from_millis(500));
        let h = start(config, SimulatedAuthenticator::new(SimulatedOutcome::Success));

        h.handle.request_unlock().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.handle.state(), LockState::Locked);
        assert_eq!(h.router.visits(Route::JournalBody), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_away_locks_and_goes_back() {
        let mut h = start(test_config(), SimulatedAuthenticator::new(SimulatedOutcome::Success));

        // Nothing to leave while locked
        assert!(!h.handle.navigate_away().await.unwrap());

        h.handle.request_unlock().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(h.router.current(), Some(Route::JournalBody));

        assert!(h.handle.navigate_away().await.unwrap());
        assert_eq!(h.handle.state(), LockState::Locked);
        assert_eq!(h.router.current(), Some(Route::JournalCover));
        assert_eq!(h.router.actions().last(), Some(&NavigationAction::Back));

        tokio::time::sleep(Duration::from_secs(5)).await;
        let events = drain(&mut h.events);
        assert!(!events.iter().any(|e| matches!(
            e,
            LockEvent::StateChanged {
                reason: TransitionReason::ReLockTimer,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_on_start() {
        let mut config = test_config();
        config.unlock_on_start = true;
        let h = start(config, SimulatedAuthenticator::new(SimulatedOutcome::Success));

        let mut state = h.handle.subscribe();
        state.wait_for(|s| *s == LockState::Unlocked).await.unwrap();
        assert_eq!(h.device.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_joins_start_up_attempt() {
        let mut config = test_config();
        config.unlock_on_start = true;
        let h = start(
            config,
            SimulatedAuthenticator::new(SimulatedOutcome::Success)
                .with_latency(Duration::from_millis(300)),
        );

        let outcome = h.handle.unlock().await.unwrap();
        assert_eq!(outcome, UnlockOutcome::Unlocked);
        assert_eq!(h.handle.state(), LockState::Unlocked);
        assert_eq!(h.device.attempts(), 1);

        let again = h.handle.unlock().await.unwrap();
        assert_eq!(again, UnlockOutcome::Ignored(LockState::Unlocked));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_reports_joined_failure() {
        let mut config = test_config();
        config.unlock_on_start = true;
        let h = start(
            config,
            SimulatedAuthenticator::new(SimulatedOutcome::Cancel)
                .with_latency(Duration::from_millis(300)),
        );

        let outcome = h.handle.unlock().await.unwrap();
        assert_eq!(
            outcome,
            UnlockOutcome::Failed(AuthFailure::AuthenticationFailed)
        );
        assert_eq!(h.handle.state(), LockState::Locked);
        assert_eq!(h.device.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_sees_teardown_of_joined_attempt() {
        let mut config = test_config();
        config.unlock_on_start = true;
        let h = start(
            config,
            SimulatedAuthenticator::new(SimulatedOutcome::Success)
                .with_latency(Duration::from_secs(5)),
        );

        let other = h.handle.clone();
        let waiter = tokio::spawn(async move { other.unlock().await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        h.handle.teardown().await.unwrap();
        assert!(matches!(
            waiter.await.unwrap(),
            Err(GuardError::ControllerClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_controller() {
        let h = start(test_config(), SimulatedAuthenticator::new(SimulatedOutcome::Success));
        h.handle.request_unlock().await.unwrap();

        let Harness { handle, task, .. } = h;
        drop(handle);
        task.await.unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LockConfig::default().with_relock_delay(Duration::ZERO);
        let result = LockSessionController::new(
            config,
            Arc::new(SimulatedAuthenticator::new(SimulatedOutcome::Success)),
            Arc::new(Router::new()),
            Arc::new(NotificationCenter::new()),
        );
        assert!(matches!(result, Err(GuardError::Config(_))));
    }
}
