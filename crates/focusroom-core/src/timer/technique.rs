use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub const ALL: [SessionType; 3] = [
        SessionType::Work,
        SessionType::ShortBreak,
        SessionType::LongBreak,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }

    /// Human-facing label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            SessionType::Work => "Focus Time",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Work)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" | "focus" => Ok(SessionType::Work),
            "short_break" | "short-break" | "short" => Ok(SessionType::ShortBreak),
            "long_break" | "long-break" | "long" => Ok(SessionType::LongBreak),
            other => Err(ConfigError::InvalidValue {
                key: "session_type".into(),
                message: format!("unknown session type '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technique {
    #[serde(rename = "classic")]
    Classic,
    #[serde(rename = "52_17")]
    FiftyTwoSeventeen,
    #[serde(rename = "flow")]
    Flow,
    #[serde(rename = "90_30")]
    NinetyThirty,
}

impl Technique {
    pub const ALL: [Technique; 4] = [
        Technique::Classic,
        Technique::FiftyTwoSeventeen,
        Technique::Flow,
        Technique::NinetyThirty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Technique::Classic => "classic",
            Technique::FiftyTwoSeventeen => "52_17",
            Technique::Flow => "flow",
            Technique::NinetyThirty => "90_30",
        }
    }

    /// Whether completing a work session asks before taking the break.
    pub fn offers_break_skip(self) -> bool {
        self == Technique::Flow
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technique {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Technique::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "technique".into(),
                message: format!("unknown technique '{s}' (expected classic, 52_17, flow or 90_30)"),
            })
    }
}

/// Minutes per session type for one technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub work: u32,
    pub short_break: u32,
    pub long_break: u32,
}

impl Durations {
    pub const fn new(work: u32, short_break: u32, long_break: u32) -> Self {
        Self {
            work,
            short_break,
            long_break,
        }
    }

    /// Built-in profile for a technique.
    pub const fn builtin(technique: Technique) -> Self {
        match technique {
            Technique::Classic | Technique::Flow => Self::new(25, 5, 15),
            Technique::FiftyTwoSeventeen => Self::new(52, 17, 30),
            Technique::NinetyThirty => Self::new(90, 30, 45),
        }
    }

    pub fn minutes(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Work => self.work,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        }
    }
}

/// Validated mapping from technique to session durations.
///
/// Construction fails unless every technique has a positive duration for
/// every session type, so lookups afterwards are infallible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entries: BTreeMap<Technique, Durations>,
}

impl Catalog {
    pub fn new(
        entries: impl IntoIterator<Item = (Technique, Durations)>,
    ) -> Result<Self, ConfigError> {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();

        for technique in Technique::ALL {
            let durations = entries.get(&technique).ok_or(ConfigError::MissingDuration {
                technique,
                session_type: SessionType::Work,
            })?;
            for session_type in SessionType::ALL {
                if durations.minutes(session_type) == 0 {
                    return Err(ConfigError::NonPositiveDuration {
                        technique,
                        session_type,
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn builtin() -> Self {
        Self {
            entries: Technique::ALL
                .into_iter()
                .map(|t| (t, Durations::builtin(t)))
                .collect(),
        }
    }

    pub fn durations(&self, technique: Technique) -> Durations {
        self.entries
            .get(&technique)
            .copied()
            .unwrap_or_else(|| Durations::builtin(technique))
    }

    pub fn duration_minutes(&self, technique: Technique, session_type: SessionType) -> u32 {
        self.durations(technique).minutes(session_type)
    }

    pub fn duration_secs(&self, technique: Technique, session_type: SessionType) -> u64 {
        u64::from(self.duration_minutes(technique, session_type)).saturating_mul(60)
    }

    /// 0.0 .. 1.0 completion of a session with `remaining_secs` left.
    ///
    /// Exactly 0.0 at full duration and exactly 1.0 at zero.
    pub fn progress_fraction(
        &self,
        technique: Technique,
        session_type: SessionType,
        remaining_secs: u64,
    ) -> f64 {
        if remaining_secs == 0 {
            return 1.0;
        }
        let total = self.duration_secs(technique, session_type);
        (1.0 - remaining_secs as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Technique, Durations)> + '_ {
        self.entries.iter().map(|(t, d)| (*t, *d))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
