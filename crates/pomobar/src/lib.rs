//! pomobar - Pomodoro session timer with daily goals
//!
//! "One tomato at a time."
//!
//! The library holds everything a status-bar front end needs:
//! - Session sequencing (work, short break, long break) and the countdown
//! - Daily goal accounting with automatic reset at the local day boundary
//! - Key-value preferences with validated settings
//! - Event fan-out to presentation layers
//! - A single-task timer service that owns the one-second ticker
//! - A small persisted task list

pub mod events;
pub mod labels;
pub mod prefs;
pub mod progress;
pub mod service;
pub mod session;
pub mod tasks;
pub mod timer;

pub use events::{EventBus, EventSink, TimerEvent};
pub use labels::Language;
pub use prefs::{
    JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore, SettingKey, Settings,
    SettingsError,
};
pub use progress::DailyProgress;
pub use service::{TimerHandle, TimerService};
pub use session::{SessionType, TimerState};
pub use tasks::{Task, TaskStore};
pub use timer::{SessionTimer, TimerSnapshot};
