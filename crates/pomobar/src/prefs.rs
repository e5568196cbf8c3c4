//! Preference storage and validated settings
//!
//! `PreferenceStore` is the key-value seam: the timer only ever sees it
//! through `Settings`, which applies defaults, bounds, and the daily reset
//! of the completed-session counter.
//! - In-memory store: tests and embedding
//! - JSON store: ~/.config/pomobar/preferences.json

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::labels::Language;
use crate::session::SessionType;

/// Preference key names
pub mod keys {
    pub const WORK_DURATION: &str = "workDuration";
    pub const SHORT_BREAK_DURATION: &str = "shortBreakDuration";
    pub const LONG_BREAK_DURATION: &str = "longBreakDuration";
    pub const SESSIONS_UNTIL_LONG_BREAK: &str = "sessionsUntilLongBreak";
    pub const DAILY_GOAL: &str = "dailyGoal";
    pub const COMPLETED_TODAY: &str = "completedToday";
    pub const LAST_DATE: &str = "lastDate";
    pub const LANGUAGE: &str = "language";
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Synchronous key-value storage for integers and strings
pub trait PreferenceStore {
    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_int(&mut self, key: &str, value: i64) -> Result<()>;
    fn get_str(&self, key: &str) -> Option<String>;
    fn set_str(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Preferences held in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: Map<String, Value>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.values.insert(key.to_string(), Value::from(value));
        Ok(())
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), Value::from(value));
        Ok(())
    }
}

/// Preferences persisted as a flat JSON object
///
/// Every write re-reads the file and changes only its own key, so writers in
/// other processes only collide on the same key, where the last one wins.
#[derive(Debug)]
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: MemoryPreferenceStore,
}

impl JsonPreferenceStore {
    /// Open the store, creating the parent directory if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create preference directory: {}", parent.display())
            })?;
        }

        let mut values = MemoryPreferenceStore::new();
        if let Some(map) = read_map(path)? {
            values.values = map;
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge the file's current contents, set one key, and write back
    fn write_key(&mut self, key: &str, value: Value) -> Result<()> {
        if let Some(map) = read_map(&self.path)? {
            self.values.values = map;
        }
        self.values.values.insert(key.to_string(), value);

        let content = serde_json::to_string_pretty(&self.values.values)
            .context("Failed to serialize preferences")?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))
    }
}

/// Read the preference file; missing, empty or corrupt files give `None`
fn read_map(path: &Path) -> Result<Option<Map<String, Value>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Map<String, Value>>(&content) {
        Ok(map) => Ok(Some(map)),
        Err(e) => {
            // Corrupt file: start empty
            warn!(path = %path.display(), error = %e, "ignoring unreadable preferences");
            Ok(None)
        }
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get_int(key)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.write_key(key, Value::from(value))
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.values.get_str(key)
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.write_key(key, Value::from(value))
    }
}

/// Validation failures for user-edited settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("{key} must be between {min} and {max} (got {value})")]
    OutOfRange {
        key: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// A user-editable integer setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    WorkDuration,
    ShortBreakDuration,
    LongBreakDuration,
    SessionsUntilLongBreak,
    DailyGoal,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::WorkDuration,
        SettingKey::ShortBreakDuration,
        SettingKey::LongBreakDuration,
        SettingKey::SessionsUntilLongBreak,
        SettingKey::DailyGoal,
    ];

    /// Name of the key in the preference store
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::WorkDuration => keys::WORK_DURATION,
            SettingKey::ShortBreakDuration => keys::SHORT_BREAK_DURATION,
            SettingKey::LongBreakDuration => keys::LONG_BREAK_DURATION,
            SettingKey::SessionsUntilLongBreak => keys::SESSIONS_UNTIL_LONG_BREAK,
            SettingKey::DailyGoal => keys::DAILY_GOAL,
        }
    }

    pub fn default_value(&self) -> i64 {
        match self {
            SettingKey::WorkDuration => 25,
            SettingKey::ShortBreakDuration => 5,
            SettingKey::LongBreakDuration => 15,
            SettingKey::SessionsUntilLongBreak => 4,
            SettingKey::DailyGoal => 8,
        }
    }

    /// Inclusive bounds accepted by `Settings::set`
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            SettingKey::WorkDuration => (1, 60),
            SettingKey::ShortBreakDuration => (1, 30),
            SettingKey::LongBreakDuration => (5, 45),
            SettingKey::SessionsUntilLongBreak => (2, 10),
            SettingKey::DailyGoal => (1, 20),
        }
    }

    /// Whether changing this key changes a session duration
    pub fn is_duration(&self) -> bool {
        matches!(
            self,
            SettingKey::WorkDuration
                | SettingKey::ShortBreakDuration
                | SettingKey::LongBreakDuration
        )
    }

    pub fn for_session(session: SessionType) -> Self {
        match session {
            SessionType::Work => SettingKey::WorkDuration,
            SessionType::ShortBreak => SettingKey::ShortBreakDuration,
            SessionType::LongBreak => SettingKey::LongBreakDuration,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "work" | "workduration" | "focus" => Ok(SettingKey::WorkDuration),
            "shortbreak" | "shortbreakduration" | "break" => Ok(SettingKey::ShortBreakDuration),
            "longbreak" | "longbreakduration" => Ok(SettingKey::LongBreakDuration),
            "sessions" | "sessionsuntillongbreak" => Ok(SettingKey::SessionsUntilLongBreak),
            "goal" | "dailygoal" => Ok(SettingKey::DailyGoal),
            _ => Err(SettingsError::UnknownKey(s.to_string())),
        }
    }
}

/// Current settings, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSnapshot {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_until_long_break: u32,
    pub daily_goal: u32,
    pub language: Language,
}

/// Typed view over a preference store
#[derive(Debug)]
pub struct Settings<S> {
    store: S,
}

impl<S: PreferenceStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read a setting; missing or out-of-range values fall back to the default
    pub fn get(&self, key: SettingKey) -> i64 {
        let (min, max) = key.bounds();
        match self.store.get_int(key.name()) {
            Some(value) if (min..=max).contains(&value) => value,
            _ => key.default_value(),
        }
    }

    /// Validate and persist a setting
    pub fn set(&mut self, key: SettingKey, value: i64) -> Result<()> {
        let (min, max) = key.bounds();
        if value < min || value > max {
            return Err(SettingsError::OutOfRange {
                key: key.name(),
                value,
                min,
                max,
            }
            .into());
        }

        debug!(key = key.name(), value, "setting updated");
        self.store.set_int(key.name(), value)
    }

    pub fn duration_minutes(&self, session: SessionType) -> u32 {
        self.get(SettingKey::for_session(session)) as u32
    }

    /// Configured length of a session in seconds, always > 0
    pub fn duration_seconds(&self, session: SessionType) -> u32 {
        self.duration_minutes(session).saturating_mul(60)
    }

    pub fn sessions_until_long_break(&self) -> u32 {
        self.get(SettingKey::SessionsUntilLongBreak) as u32
    }

    pub fn daily_goal(&self) -> u32 {
        self.get(SettingKey::DailyGoal) as u32
    }

    pub fn language(&self) -> Language {
        self.store
            .get_str(keys::LANGUAGE)
            .and_then(|code| code.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.store.set_str(keys::LANGUAGE, language.code())
    }

    /// Completed work sessions for `today`, resetting the counter on a new day
    pub fn completed_today_on(&mut self, today: NaiveDate) -> u32 {
        let today_str = today.format(DATE_FORMAT).to_string();
        let last = self.store.get_str(keys::LAST_DATE).unwrap_or_default();

        if last != today_str {
            debug!(last = %last, today = %today_str, "new day, resetting completed count");
            if let Err(e) = self.write_completed(0, &today_str) {
                warn!(error = %e, "failed to persist daily reset");
            }
            return 0;
        }

        self.store
            .get_int(keys::COMPLETED_TODAY)
            .unwrap_or(0)
            .max(0) as u32
    }

    pub fn completed_today(&mut self) -> u32 {
        self.completed_today_on(Local::now().date_naive())
    }

    /// Store the completed count, stamping it with `today`
    pub fn set_completed_today_on(&mut self, count: u32, today: NaiveDate) -> Result<()> {
        let today_str = today.format(DATE_FORMAT).to_string();
        self.write_completed(count, &today_str)
    }

    pub fn set_completed_today(&mut self, count: u32) -> Result<()> {
        self.set_completed_today_on(count, Local::now().date_naive())
    }

    fn write_completed(&mut self, count: u32, date: &str) -> Result<()> {
        self.store.set_int(keys::COMPLETED_TODAY, i64::from(count))?;
        self.store.set_str(keys::LAST_DATE, date)
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            work_minutes: self.duration_minutes(SessionType::Work),
            short_break_minutes: self.duration_minutes(SessionType::ShortBreak),
            long_break_minutes: self.duration_minutes(SessionType::LongBreak),
            sessions_until_long_break: self.sessions_until_long_break(),
            daily_goal: self.daily_goal(),
            language: self.language(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::new(MemoryPreferenceStore::new());
        assert_eq!(settings.duration_minutes(SessionType::Work), 25);
        assert_eq!(settings.duration_minutes(SessionType::ShortBreak), 5);
        assert_eq!(settings.duration_minutes(SessionType::LongBreak), 15);
        assert_eq!(settings.sessions_until_long_break(), 4);
        assert_eq!(settings.daily_goal(), 8);
        assert_eq!(settings.language(), Language::French);
    }

    #[test]
    fn test_non_positive_stored_values_fall_back() {
        let mut store = MemoryPreferenceStore::new();
        store.set_int(keys::WORK_DURATION, 0).unwrap();
        store.set_int(keys::SHORT_BREAK_DURATION, -3).unwrap();
        let settings = Settings::new(store);

        assert_eq!(settings.duration_seconds(SessionType::Work), 25 * 60);
        assert_eq!(settings.duration_seconds(SessionType::ShortBreak), 5 * 60);
    }

    #[test]
    fn test_out_of_range_stored_values_fall_back() {
        let mut store = MemoryPreferenceStore::new();
        store.set_int(keys::WORK_DURATION, 1 << 32).unwrap();
        store.set_int(keys::LONG_BREAK_DURATION, 500).unwrap();
        store.set_int(keys::SESSIONS_UNTIL_LONG_BREAK, i64::MAX).unwrap();
        store.set_int(keys::DAILY_GOAL, 20).unwrap();
        let settings = Settings::new(store);

        assert_eq!(settings.duration_seconds(SessionType::Work), 25 * 60);
        assert_eq!(settings.duration_minutes(SessionType::LongBreak), 15);
        assert_eq!(settings.sessions_until_long_break(), 4);
        assert_eq!(settings.daily_goal(), 20);
    }

    #[test]
    fn test_set_validates_bounds() {
        let mut settings = Settings::new(MemoryPreferenceStore::new());

        settings.set(SettingKey::WorkDuration, 50).unwrap();
        assert_eq!(settings.duration_minutes(SessionType::Work), 50);

        let err = settings.set(SettingKey::LongBreakDuration, 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SettingsError>(),
            Some(&SettingsError::OutOfRange {
                key: keys::LONG_BREAK_DURATION,
                value: 4,
                min: 5,
                max: 45,
            })
        );
        assert_eq!(settings.duration_minutes(SessionType::LongBreak), 15);

        assert!(settings.set(SettingKey::DailyGoal, 0).is_err());
        assert!(settings.set(SettingKey::SessionsUntilLongBreak, 11).is_err());
    }

    #[test]
    fn test_setting_key_parse() {
        assert_eq!("work".parse::<SettingKey>().unwrap(), SettingKey::WorkDuration);
        assert_eq!("short-break".parse::<SettingKey>().unwrap(), SettingKey::ShortBreakDuration);
        assert_eq!(
            "sessionsUntilLongBreak".parse::<SettingKey>().unwrap(),
            SettingKey::SessionsUntilLongBreak
        );
        assert_eq!("daily_goal".parse::<SettingKey>().unwrap(), SettingKey::DailyGoal);
        assert_eq!(
            "volume".parse::<SettingKey>(),
            Err(SettingsError::UnknownKey("volume".to_string()))
        );
    }

    #[test]
    fn test_completed_today_same_day() {
        let mut settings = Settings::new(MemoryPreferenceStore::new());
        let today = day(2024, 3, 14);

        settings.set_completed_today_on(3, today).unwrap();
        assert_eq!(settings.completed_today_on(today), 3);
    }

    #[test]
    fn test_completed_today_resets_on_new_day() {
        let mut settings = Settings::new(MemoryPreferenceStore::new());

        settings.set_completed_today_on(6, day(2024, 3, 14)).unwrap();
        assert_eq!(settings.completed_today_on(day(2024, 3, 15)), 0);

        // The reset is persisted, going back does not restore the old count
        assert_eq!(settings.completed_today_on(day(2024, 3, 14)), 0);
        assert_eq!(
            settings.store.get_str(keys::LAST_DATE).as_deref(),
            Some("2024-03-14")
        );
    }

    #[test]
    fn test_completed_today_without_date_is_zero() {
        let mut store = MemoryPreferenceStore::new();
        store.set_int(keys::COMPLETED_TODAY, 4).unwrap();
        let mut settings = Settings::new(store);

        assert_eq!(settings.completed_today_on(day(2024, 1, 1)), 0);
    }

    #[test]
    fn test_language_roundtrip() {
        let mut settings = Settings::new(MemoryPreferenceStore::new());
        settings.set_language(Language::English).unwrap();
        assert_eq!(settings.language(), Language::English);
        assert_eq!(settings.snapshot().language, Language::English);
    }

    #[test]
    fn test_json_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        {
            let mut store = JsonPreferenceStore::open(&path).unwrap();
            store.set_int(keys::DAILY_GOAL, 12).unwrap();
            store.set_str(keys::LANGUAGE, "en").unwrap();
        }

        let store = JsonPreferenceStore::open(&path).unwrap();
        assert_eq!(store.get_int(keys::DAILY_GOAL), Some(12));
        assert_eq!(store.get_str(keys::LANGUAGE).as_deref(), Some("en"));
        assert_eq!(store.get_int(keys::WORK_DURATION), None);
    }

    #[test]
    fn test_json_store_keeps_other_writers_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");

        let mut running = Settings::new(JsonPreferenceStore::open(&path).unwrap());
        let mut other = Settings::new(JsonPreferenceStore::open(&path).unwrap());

        other.set(SettingKey::DailyGoal, 6).unwrap();
        running.set_completed_today(1).unwrap();

        let mut reopened = Settings::new(JsonPreferenceStore::open(&path).unwrap());
        assert_eq!(reopened.daily_goal(), 6);
        assert_eq!(reopened.completed_today(), 1);
        assert_eq!(running.daily_goal(), 6);
    }

    #[test]
    fn test_json_store_same_key_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");

        let mut first = JsonPreferenceStore::open(&path).unwrap();
        let mut second = JsonPreferenceStore::open(&path).unwrap();
        first.set_int(keys::WORK_DURATION, 30).unwrap();
        second.set_int(keys::WORK_DURATION, 45).unwrap();

        let reopened = JsonPreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get_int(keys::WORK_DURATION), Some(45));
    }

    #[test]
    fn test_json_store_ignores_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = JsonPreferenceStore::open(&path).unwrap();
        assert_eq!(store.get_int(keys::DAILY_GOAL), None);

        store.set_int(keys::DAILY_GOAL, 3).unwrap();
        let reopened = JsonPreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get_int(keys::DAILY_GOAL), Some(3));
    }
}
