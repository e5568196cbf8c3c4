//! The session timer
//!
//! Owns the countdown, the work/break cadence, and today's completed count.
//! It is a plain state machine: something else (normally `TimerService`)
//! calls `tick()` once per second while the timer is running. Every mutation
//! emits `TimerEvent::Updated`; completions also emit `SessionCompleted`
//! and, at the crossing point, `DailyGoalReached`.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use pomobar_core::format;

use crate::events::{EventSink, TimerEvent};
use crate::labels::Language;
use crate::prefs::{PreferenceStore, SettingKey, Settings};
use crate::progress::DailyProgress;
use crate::session::{SessionType, TimerState};

/// Point-in-time view of the timer for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub session_type: SessionType,
    pub remaining_seconds: u32,
    pub duration_seconds: u32,
    pub progress: f64,
    pub formatted_time: String,
    pub status_title: String,
    pub completed_work_sessions: u32,
    pub daily_goal: u32,
    pub language: Language,
}

impl TimerSnapshot {
    pub fn daily_progress(&self) -> DailyProgress {
        DailyProgress::new(self.completed_work_sessions, self.daily_goal)
    }
}

/// Status-bar text: the clock while counting, an icon while idle
pub fn status_title(
    state: TimerState,
    session_type: SessionType,
    remaining_seconds: u32,
) -> String {
    match state {
        TimerState::Running => format::clock(remaining_seconds),
        TimerState::Paused => format!("{} \u{23F8}", format::clock(remaining_seconds)),
        TimerState::Idle if session_type.is_break() => "\u{2615}".to_string(),
        TimerState::Idle => "\u{1F345}".to_string(),
    }
}

/// Pomodoro countdown and daily goal accounting
pub struct SessionTimer<S> {
    settings: Settings<S>,
    sink: Box<dyn EventSink>,
    state: TimerState,
    session_type: SessionType,
    remaining_seconds: u32,
    completed_work_sessions: u32,
}

impl<S: PreferenceStore> SessionTimer<S> {
    /// Create an idle timer at the start of a work session
    pub fn new(mut settings: Settings<S>, sink: impl EventSink + 'static) -> Self {
        let completed_work_sessions = settings.completed_today();
        let remaining_seconds = settings.duration_seconds(SessionType::Work);

        Self {
            settings,
            sink: Box::new(sink),
            state: TimerState::Idle,
            session_type: SessionType::Work,
            remaining_seconds,
            completed_work_sessions,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings<S> {
        &mut self.settings
    }

    /// Configured length of `session` in seconds
    pub fn duration_for(&self, session: SessionType) -> u32 {
        self.settings.duration_seconds(session)
    }

    pub fn current_duration(&self) -> u32 {
        self.duration_for(self.session_type)
    }

    /// Elapsed share of the current session, in [0, 1]
    pub fn progress_fraction(&self) -> f64 {
        let duration = f64::from(self.current_duration().max(1));
        (1.0 - f64::from(self.remaining_seconds) / duration).clamp(0.0, 1.0)
    }

    pub fn formatted_time(&self) -> String {
        format::clock(self.remaining_seconds)
    }

    pub fn start(&mut self) {
        if self.state == TimerState::Running {
            return;
        }
        debug!(session = %self.session_type, remaining = self.remaining_seconds, "timer started");
        self.state = TimerState::Running;
        self.notify_update();
    }

    pub fn pause(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        debug!(remaining = self.remaining_seconds, "timer paused");
        self.state = TimerState::Paused;
        self.notify_update();
    }

    pub fn toggle_start_pause(&mut self) {
        if self.state == TimerState::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Stop counting and rewind the current session; the session type is kept
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.remaining_seconds = self.current_duration();
        debug!(session = %self.session_type, "timer reset");
        self.notify_update();
    }

    /// Finish the current session now, whatever is left on the clock
    pub fn skip(&mut self) {
        debug!(session = %self.session_type, remaining = self.remaining_seconds, "session skipped");
        self.complete_session();
    }

    /// Scrub to `progress` (0.0 = start, 1.0 = end)
    ///
    /// Leaves at least one second on the clock, so scrubbing never completes
    /// a session by itself.
    pub fn set_progress(&mut self, progress: f64) {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let duration = self.current_duration();
        let remaining = (f64::from(duration) * (1.0 - progress)).round() as u32;
        self.remaining_seconds = remaining.clamp(1, duration.max(1));
        self.notify_update();
    }

    /// Pick up changed durations; only an idle timer is rewound
    pub fn apply_settings(&mut self) {
        if self.state == TimerState::Idle {
            self.remaining_seconds = self.current_duration();
            self.notify_update();
        }
    }

    /// Validate and store a setting, then apply it
    pub fn set_setting(&mut self, key: SettingKey, value: i64) -> Result<()> {
        self.settings.set(key, value)?;
        if key.is_duration() {
            self.apply_settings();
        } else {
            self.notify_update();
        }
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.settings.set_language(language)?;
        self.notify_update();
        Ok(())
    }

    /// Start the day over at zero completed sessions
    pub fn reset_day(&mut self) {
        self.completed_work_sessions = 0;
        if let Err(e) = self.settings.set_completed_today(0) {
            warn!(error = %e, "failed to persist day reset");
        }
        info!("daily count reset");
        self.notify_update();
    }

    /// Advance the countdown by one second; ignored unless running
    pub fn tick(&mut self) {
        if self.state != TimerState::Running {
            return;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.complete_session();
        } else {
            self.notify_update();
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            session_type: self.session_type,
            remaining_seconds: self.remaining_seconds,
            duration_seconds: self.current_duration(),
            progress: self.progress_fraction(),
            formatted_time: self.formatted_time(),
            status_title: status_title(self.state, self.session_type, self.remaining_seconds),
            completed_work_sessions: self.completed_work_sessions,
            daily_goal: self.settings.daily_goal(),
            language: self.settings.language(),
        }
    }

    fn complete_session(&mut self) {
        let completed_type = self.session_type;

        if completed_type == SessionType::Work {
            self.completed_work_sessions += 1;
            if let Err(e) = self.settings.set_completed_today(self.completed_work_sessions) {
                warn!(error = %e, "failed to persist completed count");
            }

            // Equality, not >=: fires once at the crossing point
            if self.completed_work_sessions == self.settings.daily_goal() {
                info!(goal = self.completed_work_sessions, "daily goal reached");
                self.sink.emit(TimerEvent::DailyGoalReached);
            }

            let every = self.settings.sessions_until_long_break().max(1);
            self.session_type = if self.completed_work_sessions % every == 0 {
                SessionType::LongBreak
            } else {
                SessionType::ShortBreak
            };
        } else {
            self.session_type = SessionType::Work;
        }

        self.remaining_seconds = self.current_duration();
        self.state = TimerState::Idle;

        info!(
            completed = %completed_type,
            next = %self.session_type,
            today = self.completed_work_sessions,
            "session completed"
        );
        self.sink.emit(TimerEvent::SessionCompleted(completed_type));
        self.notify_update();
    }

    fn notify_update(&self) {
        self.sink.emit(TimerEvent::Updated);
    }
}
