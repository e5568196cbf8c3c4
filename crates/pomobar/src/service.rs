//! Timer service: the single control task that owns the `SessionTimer`
//!
//! User actions arrive as `Command`s through a cloneable `TimerHandle`.
//! The countdown is a tokio `Interval` that only exists while the timer is
//! running: it is armed on the transition into Running and dropped on any
//! transition out, which is how pause/reset/skip cancel it. Ticks and
//! commands are multiplexed by one `select!`, so they never interleave.

use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::labels::Language;
use crate::prefs::{PreferenceStore, SettingKey};
use crate::timer::{SessionTimer, TimerSnapshot};

const COMMAND_BUFFER: usize = 32;

/// A request to the timer service
#[derive(Debug)]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    Skip,
    SetProgress(f64),
    ResetDay,
    SetSetting {
        key: SettingKey,
        value: i64,
        reply: oneshot::Sender<Result<()>>,
    },
    SetLanguage {
        language: Language,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot(oneshot::Sender<TimerSnapshot>),
    Shutdown,
}

/// Cloneable sender side of the service
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
}

impl TimerHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Timer service is not running"))
    }

    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(Command::Toggle).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    pub async fn skip(&self) -> Result<()> {
        self.send(Command::Skip).await
    }

    pub async fn set_progress(&self, progress: f64) -> Result<()> {
        self.send(Command::SetProgress(progress)).await
    }

    pub async fn reset_day(&self) -> Result<()> {
        self.send(Command::ResetDay).await
    }

    pub async fn set_setting(&self, key: SettingKey, value: i64) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetSetting { key, value, reply }).await?;
        rx.await.map_err(|_| anyhow!("Timer service dropped the request"))?
    }

    pub async fn set_language(&self, language: Language) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetLanguage { language, reply }).await?;
        rx.await.map_err(|_| anyhow!("Timer service dropped the request"))?
    }

    pub async fn snapshot(&self) -> Result<TimerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| anyhow!("Timer service dropped the request"))
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

/// Runs a `SessionTimer` on one task, ticking it while it runs
pub struct TimerService<S> {
    timer: SessionTimer<S>,
    commands: mpsc::Receiver<Command>,
    period: Duration,
}

impl<S> TimerService<S>
where
    S: PreferenceStore + Send + 'static,
{
    /// Wrap `timer`; `period` is the countdown wake-up interval
    pub fn new(timer: SessionTimer<S>, period: Duration) -> (Self, TimerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let period = period.max(Duration::from_millis(1));

        let service = Self {
            timer,
            commands: rx,
            period,
        };
        (service, TimerHandle { commands: tx })
    }

    /// Run on a new tokio task; the timer is handed back on shutdown
    pub fn spawn(self) -> JoinHandle<SessionTimer<S>> {
        tokio::spawn(self.run())
    }

    /// Serve commands until `Shutdown` or every handle is dropped
    pub async fn run(mut self) -> SessionTimer<S> {
        let mut countdown: Option<Interval> = None;

        loop {
            self.sync_countdown(&mut countdown);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = next_tick(&mut countdown) => self.timer.tick(),
            }
        }

        debug!("timer service stopped");
        self.timer
    }

    /// Arm the countdown on entering Running, drop it on leaving
    fn sync_countdown(&self, countdown: &mut Option<Interval>) {
        match (self.timer.is_running(), countdown.is_some()) {
            (true, false) => {
                let mut interval = time::interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *countdown = Some(interval);
                debug!(period_ms = self.period.as_millis() as u64, "countdown armed");
            }
            (false, true) => {
                *countdown = None;
                debug!("countdown cancelled");
            }
            _ => {}
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.timer.start(),
            Command::Pause => self.timer.pause(),
            Command::Toggle => self.timer.toggle_start_pause(),
            Command::Reset => self.timer.reset(),
            Command::Skip => self.timer.skip(),
            Command::SetProgress(progress) => self.timer.set_progress(progress),
            Command::ResetDay => self.timer.reset_day(),
            Command::SetSetting { key, value, reply } => {
                let _ = reply.send(self.timer.set_setting(key, value));
            }
            Command::SetLanguage { language, reply } => {
                let _ = reply.send(self.timer.set_language(language));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.timer.snapshot());
            }
            Command::Shutdown => {}
        }
    }
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, TimerEvent};
    use crate::prefs::{keys, MemoryPreferenceStore, Settings};
    use crate::session::{SessionType, TimerState};

    const SECOND: Duration = Duration::from_secs(1);

    fn service_with_work_minutes(
        minutes: i64,
    ) -> (TimerService<MemoryPreferenceStore>, TimerHandle, EventBus) {
        let mut store = MemoryPreferenceStore::new();
        store.set_int(keys::WORK_DURATION, minutes).unwrap();

        let bus = EventBus::new(512);
        let timer = SessionTimer::new(Settings::new(store), bus.clone());
        let (service, handle) = TimerService::new(timer, SECOND);
        (service, handle, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (service, handle, _bus) = service_with_work_minutes(25);
        let task = service.spawn();

        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(3500)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Running);
        assert_eq!(snap.remaining_seconds, 25 * 60 - 3);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_countdown() {
        let (service, handle, _bus) = service_with_work_minutes(25);
        let task = service.spawn();

        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(2500)).await;
        handle.pause().await.unwrap();
        time::sleep(Duration::from_secs(30)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Paused);
        assert_eq!(snap.remaining_seconds, 25 * 60 - 2);

        handle.toggle().await.unwrap();
        time::sleep(Duration::from_millis(1500)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.remaining_seconds, 25 * 60 - 3);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_runs_to_completion() {
        let (service, handle, bus) = service_with_work_minutes(1);
        let mut events = bus.subscribe();
        let task = service.spawn();

        handle.start().await.unwrap();
        time::sleep(Duration::from_secs(90)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Idle);
        assert_eq!(snap.session_type, SessionType::ShortBreak);
        assert_eq!(snap.completed_work_sessions, 1);

        let mut completions = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let TimerEvent::SessionCompleted(kind) = event {
                completions.push(kind);
            }
        }
        assert_eq!(completions, vec![SessionType::Work]);

        handle.shutdown().await.unwrap();
        let timer = task.await.unwrap();
        assert_eq!(timer.completed_work_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_while_running_stops_ticking() {
        let (service, handle, _bus) = service_with_work_minutes(25);
        let task = service.spawn();

        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(1500)).await;
        handle.skip().await.unwrap();
        time::sleep(Duration::from_secs(10)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Idle);
        assert_eq!(snap.session_type, SessionType::ShortBreak);
        assert_eq!(snap.remaining_seconds, 5 * 60);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_through_handle() {
        let (service, handle, _bus) = service_with_work_minutes(25);
        let task = service.spawn();

        handle.set_setting(SettingKey::WorkDuration, 45).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().remaining_seconds, 45 * 60);

        assert!(handle.set_setting(SettingKey::DailyGoal, 99).await.is_err());

        handle.set_language(Language::English).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().language, Language::English);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_errors_after_shutdown() {
        let (service, handle, _bus) = service_with_work_minutes(25);
        let task = service.spawn();

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(handle.start().await.is_err());
        assert!(handle.snapshot().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_handles_dropped() {
        let (service, handle, _bus) = service_with_work_minutes(25);
        let task = service.spawn();

        handle.skip().await.unwrap();
        drop(handle);

        let timer = task.await.unwrap();
        assert_eq!(timer.completed_work_sessions(), 1);
    }
}
