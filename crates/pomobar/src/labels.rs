//! User-facing strings in English and French

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::session::SessionType;

/// Display language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "fr")]
    French,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::French => "Français",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "fr" | "french" | "français" => Ok(Language::French),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Keys for translated strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Focus,
    ShortBreak,
    LongBreak,
    Sessions,
    GoalReached,
    ExceededGoal,
    SessionComplete,
    LetsGo,
    GoalReachedMessage,
}

/// Look up a label
pub fn label(lang: Language, key: Label) -> &'static str {
    use Label::*;
    use Language::*;

    match (key, lang) {
        (Focus, _) => "Focus",
        (ShortBreak, English) => "Break",
        (ShortBreak, French) => "Pause",
        (LongBreak, English) => "Long Break",
        (LongBreak, French) => "Pause longue",
        (Sessions, _) => "sessions",
        (GoalReached, English) => "🎉 Goal reached!",
        (GoalReached, French) => "🎉 Objectif atteint!",
        (ExceededGoal, English) => "You exceeded your goal! 💪",
        (ExceededGoal, French) => "Tu as dépassé ton objectif! 💪",
        (SessionComplete, English) => "✅ Session complete!",
        (SessionComplete, French) => "✅ Session terminée!",
        (LetsGo, English) => "💪 Let's go!",
        (LetsGo, French) => "💪 C'est reparti!",
        (GoalReachedMessage, English) => {
            "Congratulations! You reached your daily goal!\nKeep it up 💪"
        }
        (GoalReachedMessage, French) => {
            "Félicitations! Tu as atteint ton objectif du jour!\nContinue comme ça 💪"
        }
    }
}

/// "N more to reach your goal"
pub fn remaining_goal(lang: Language, remaining: u32) -> String {
    match lang {
        Language::English => format!("{} more to reach your goal", remaining),
        Language::French => format!("Encore {} pour atteindre ton objectif", remaining),
    }
}

/// Localized session name
pub fn session_name(lang: Language, session: SessionType) -> &'static str {
    match session {
        SessionType::Work => label(lang, Label::Focus),
        SessionType::ShortBreak => label(lang, Label::ShortBreak),
        SessionType::LongBreak => label(lang, Label::LongBreak),
    }
}

/// Notice shown after a session finishes
pub fn completion_notice(lang: Language, completed: SessionType) -> &'static str {
    if completed.is_break() {
        label(lang, Label::LetsGo)
    } else {
        label(lang, Label::SessionComplete)
    }
}
