//! Countdown - the state machine between "scheduled" and "time reached"
//!
//! # States
//!
//! ```text
//!                start()
//!   (Stopped) ─────────► Standby ──tick, remaining > 0──► Ticking ─┐
//!                           │                              ▲       │
//!                           │                              └───────┘
//!                           │ remaining <= 0                   │ remaining <= 0
//!                           ▼                                  ▼
//!                        Reached ◄─────────────────────────────┘
//!
//!   stop() from Standby / Ticking ──► Stopped
//! ```
//!
//! Reached and Stopped are terminal. A fresh `start()` replaces whatever ran
//! before it (last writer wins).
//!
//! # Modes
//!
//! | Mode | Driver | Renders |
//! |------|--------|---------|
//! | `ImmediateFire` | one check, at most one sleep | the alert only |
//! | `LiveCountdown` | tokio interval at `tick_interval` | one per tick, then the alert |
//!
//! `ImmediateFire` follows a wake dispatch: the host already slept until the
//! target, so no polling loop is created.
//!
//! # Exactly-once alert
//!
//! State, generation and the running task live behind one mutex. Every
//! transition re-checks the generation it was started under, so a tick that
//! races with `stop()` or a replacing `start()` sees the bump and does nothing.
//! The alert is rendered and played while the lock is held, right after the
//! state becomes Reached, and only then published to watchers.

mod view;

pub use view::{Category, NotificationView, Priority};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::core::paths::ids;
use crate::platform::{AlertSound, Clock, Notifier, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownMode {
    /// Check once, fire if due. Used after a wake dispatch.
    ImmediateFire,
    /// Tick every interval until the target. Keeps the process resident.
    LiveCountdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CountdownState {
    Standby { target_ms: i64, label: String },
    Ticking { remaining_ms: i64, label: String },
    Reached { label: String },
    Stopped,
}

impl CountdownState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CountdownState::Reached { .. } | CountdownState::Stopped)
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            CountdownState::Standby { label, .. }
            | CountdownState::Ticking { label, .. }
            | CountdownState::Reached { label } => Some(label),
            CountdownState::Stopped => None,
        }
    }
}

/// Process-wide "foreground active" flag: the service is running and the
/// host should not reclaim it.
#[derive(Debug, Clone, Default)]
pub struct Foreground(Arc<AtomicBool>);

impl Foreground {
    pub fn new() -> Self { Self::default() }
    pub fn set(&self, active: bool) { self.0.store(active, Ordering::SeqCst); }
    pub fn is_active(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    /// Still ticking, `remaining_ms` to go.
    Continue(i64),
    Done,
}

struct Run {
    state: CountdownState,
    target_ms: i64,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Core {
    run: Mutex<Run>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    sound: Arc<dyn AlertSound>,
    foreground: Foreground,
    tick_interval: Duration,
    state_tx: watch::Sender<CountdownState>,
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, Run> {
        self.run.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publish(&self, state: &CountdownState) {
        self.state_tx.send_replace(state.clone());
    }

    fn render(&self, state: &CountdownState) {
        if let Some(view) = NotificationView::for_state(state) {
            self.notifier.show(ids::NOTIFICATION, &view);
        }
    }

    /// One evaluation of `target - now` for run `generation`.
    fn advance(&self, generation: u64) -> Flow {
        let mut run = self.lock();
        if run.generation != generation || run.state.is_terminal() {
            return Flow::Done;
        }
        let label = run.state.label().unwrap_or_default().to_string();
        let remaining_ms = run.target_ms.saturating_sub(self.clock.now_ms());

        if remaining_ms <= 0 {
            self.reach(&mut run, label);
            return Flow::Done;
        }

        run.state = CountdownState::Ticking { remaining_ms, label: label.clone() };
        self.render(&run.state);
        tracing::debug!(label = %label, remaining_ms, "Countdown tick");
        self.publish(&run.state);
        Flow::Continue(remaining_ms)
    }

    /// Terminal transition. Caller holds the lock and has checked the run is live.
    fn reach(&self, run: &mut Run, label: String) {
        run.state = CountdownState::Reached { label: label.clone() };
        run.task = None;
        self.render(&run.state);
        self.sound.play(&label);
        self.foreground.set(false);
        tracing::info!(label = %label, "Prayer time reached, adzan playing");
        self.publish(&run.state);
    }
}

/// Runs at most one countdown at a time.
pub struct CountdownCoordinator {
    core: Arc<Core>,
}

impl CountdownCoordinator {
    pub fn new(platform: &Platform, foreground: Foreground, tick_interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(CountdownState::Stopped);
        Self {
            core: Arc::new(Core {
                run: Mutex::new(Run {
                    state: CountdownState::Stopped,
                    target_ms: 0,
                    generation: 0,
                    task: None,
                }),
                clock: platform.clock.clone(),
                notifier: platform.notifier.clone(),
                sound: platform.sound.clone(),
                foreground,
                tick_interval,
                state_tx,
            }),
        }
    }

    /// Begin a countdown to `target_ms`, replacing any run in progress.
    pub fn start(&self, target_ms: i64, label: &str, mode: CountdownMode) {
        let generation = {
            let mut run = self.core.lock();
            if let Some(task) = run.task.take() {
                task.abort();
            }
            if !run.state.is_terminal() {
                tracing::info!(previous = ?run.state.label(), label, "Replacing running countdown");
            }
            run.generation += 1;
            run.target_ms = target_ms;
            run.state = CountdownState::Standby { target_ms, label: label.to_string() };
            self.core.foreground.set(true);
            self.core.publish(&run.state);
            run.generation
        };
        tracing::info!(label, target_ms, ?mode, "Countdown started");

        match mode {
            CountdownMode::ImmediateFire => {
                if target_ms.saturating_sub(self.core.clock.now_ms()) <= 0 {
                    self.core.advance(generation);
                    return;
                }
                // Wake arrived early: sleep to the target, no tick renders.
                let core = self.core.clone();
                self.spawn(generation, async move {
                    loop {
                        let remaining_ms = target_ms.saturating_sub(core.clock.now_ms());
                        if remaining_ms <= 0 {
                            break;
                        }
                        tokio::time::sleep(Duration::from_millis(remaining_ms as u64)).await;
                    }
                    core.advance(generation);
                });
            }
            CountdownMode::LiveCountdown => {
                let core = self.core.clone();
                self.spawn(generation, async move {
                    let tick = core.tick_interval.max(Duration::from_millis(1));
                    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // First evaluation runs at start. The last wait is cut
                    // short so Reached lands on the target, not the next tick.
                    while let Flow::Continue(remaining_ms) = core.advance(generation) {
                        let remaining = Duration::from_millis(remaining_ms as u64);
                        if remaining < tick {
                            tokio::time::sleep(remaining).await;
                        } else {
                            ticker.tick().await;
                        }
                    }
                });
            }
        }
    }

    fn spawn<F>(&self, generation: u64, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "No runtime for countdown task, stopping");
                self.stop();
                return;
            }
        };
        let task = handle.spawn(fut);
        let mut run = self.core.lock();
        if run.generation == generation && !run.state.is_terminal() {
            run.task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Cancel the running countdown. No-op when nothing is running.
    pub fn stop(&self) {
        let mut run = self.core.lock();
        if run.state.is_terminal() {
            return;
        }
        run.generation += 1;
        if let Some(task) = run.task.take() {
            task.abort();
        }
        run.state = CountdownState::Stopped;
        self.core.notifier.dismiss(ids::NOTIFICATION);
        self.core.foreground.set(false);
        tracing::info!("Countdown stopped");
        self.core.publish(&run.state);
    }

    pub fn state(&self) -> CountdownState { self.core.lock().state.clone() }
    pub fn is_running(&self) -> bool { !self.core.lock().state.is_terminal() }
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> { self.core.state_tx.subscribe() }
}

impl Drop for CountdownCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.core.lock().task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::MemoryHost;

    const NOW: i64 = 1_710_068_700_000;

    fn coordinator(host: &MemoryHost) -> CountdownCoordinator {
        CountdownCoordinator::new(&host.platform(), Foreground::new(), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_fire_past_target_renders_alert_once() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(NOW - 500, "Ashar", CountdownMode::ImmediateFire);
        assert_eq!(countdown.state(), CountdownState::Reached { label: "Ashar".into() });

        tokio::time::sleep(Duration::from_secs(5)).await;
        let shown = host.notifier.shown();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].is_alert());
        assert_eq!(host.sound.played(), vec!["Ashar".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_fire_early_wake_sleeps_once() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(NOW + 2_500, "Dzuhur", CountdownMode::ImmediateFire);
        assert!(matches!(countdown.state(), CountdownState::Standby { .. }));
        assert!(host.notifier.shown().is_empty());

        tokio::time::sleep(Duration::from_millis(2_600)).await;
        assert_eq!(countdown.state(), CountdownState::Reached { label: "Dzuhur".into() });
        assert_eq!(host.notifier.shown().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn live_countdown_ticks_then_fires() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(NOW + 3_000, "Maghrib", CountdownMode::LiveCountdown);
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        let shown = host.notifier.shown();
        let bodies: Vec<&str> = shown.iter().map(|v| v.body.as_str()).collect();
        assert_eq!(
            bodies,
            vec![
                "Menuju Maghrib: 00:00:03 lagi",
                "Menuju Maghrib: 00:00:02 lagi",
                "Menuju Maghrib: 00:00:01 lagi",
                "Sudah waktunya Sholat Maghrib",
            ]
        );
        assert_eq!(host.sound.played().len(), 1);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_run_cancels_without_render() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(NOW + 10_000, "Isya", CountdownMode::LiveCountdown);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let before = host.notifier.shown().len();

        countdown.stop();
        assert_eq!(countdown.state(), CountdownState::Stopped);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(host.notifier.shown().len(), before);
        assert!(host.sound.played().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_noop_before_start_and_after_reached() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);
        countdown.stop();
        assert_eq!(host.notifier.dismissed(), 0);

        countdown.start(NOW, "Subuh", CountdownMode::ImmediateFire);
        countdown.stop();
        countdown.stop();
        assert_eq!(countdown.state(), CountdownState::Reached { label: "Subuh".into() });
        assert_eq!(host.notifier.shown().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_running_countdown() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(NOW + 60_000, "Ashar", CountdownMode::LiveCountdown);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        countdown.start(NOW, "Maghrib", CountdownMode::ImmediateFire);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(host.sound.played(), vec!["Maghrib".to_string()]);
        assert_eq!(host.notifier.shown().iter().filter(|v| v.is_alert()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn watchers_see_terminal_state() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);
        let mut rx = countdown.subscribe();

        countdown.start(NOW + 2_000, "Isya", CountdownMode::LiveCountdown);
        let reached = loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if state.is_terminal() {
                break state;
            }
        };
        assert_eq!(reached, CountdownState::Reached { label: "Isya".into() });
        assert_eq!(host.sound.played().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_follows_lifecycle() {
        let host = MemoryHost::new(NOW);
        let foreground = Foreground::new();
        let countdown = CountdownCoordinator::new(&host.platform(), foreground.clone(), Duration::from_secs(1));

        countdown.start(NOW + 5_000, "Ashar", CountdownMode::LiveCountdown);
        assert!(foreground.is_active());
        countdown.stop();
        assert!(!foreground.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn live_alert_lands_on_target_between_ticks() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(NOW + 2_500, "Ashar", CountdownMode::LiveCountdown);
        tokio::time::sleep(Duration::from_millis(2_499)).await;
        assert!(countdown.is_running());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(countdown.state(), CountdownState::Reached { label: "Ashar".into() });
        let bodies: Vec<String> = host.notifier.shown().into_iter().map(|v| v.body).collect();
        assert_eq!(
            bodies,
            vec![
                "Menuju Ashar: 00:00:03 lagi".to_string(),
                "Menuju Ashar: 00:00:02 lagi".to_string(),
                "Menuju Ashar: 00:00:01 lagi".to_string(),
                "Sudah waktunya Sholat Ashar".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn extreme_targets_do_not_overflow() {
        let host = MemoryHost::new(NOW);
        let countdown = coordinator(&host);

        countdown.start(i64::MIN, "Isya", CountdownMode::ImmediateFire);
        assert_eq!(countdown.state(), CountdownState::Reached { label: "Isya".into() });

        countdown.start(i64::MIN, "Isya", CountdownMode::LiveCountdown);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(countdown.state(), CountdownState::Reached { label: "Isya".into() });

        countdown.start(i64::MAX, "Subuh", CountdownMode::ImmediateFire);
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert!(matches!(countdown.state(), CountdownState::Standby { .. }));

        countdown.start(i64::MAX, "Subuh", CountdownMode::LiveCountdown);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(matches!(countdown.state(), CountdownState::Ticking { .. }));
        countdown.stop();

        assert_eq!(host.sound.played(), vec!["Isya".to_string(), "Isya".to_string()]);
    }
}
