//! Planner dialect configuration.
//!
//! Every backend prints plans with its own textual conventions. Those
//! conventions live here as data so a new backend is a new TOML file rather
//! than a change to the assembler.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Textual sentinels a planner uses to frame plans inside its output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputMarkers {
    /// Substring announcing the start of a plan block.
    pub plan_start: String,

    /// Exact line closing a plan block on the batch path.
    /// The streaming path always closes on an empty line.
    pub plan_end: String,

    /// Prefix (after trimming) of a line proving the problem unsolvable.
    pub unsolvable: String,

    /// Prefix of a line whose third token is the search time in seconds.
    pub time_prefix: String,
}

impl Default for OutputMarkers {
    fn default() -> Self {
        Self {
            plan_start: "; Time".to_string(),
            plan_end: String::new(),
            unsolvable: ";; Problem unsolvable!".to_string(),
            time_prefix: "; Time".to_string(),
        }
    }
}

/// What to do with a plan block still open when the output ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrailingPlan {
    /// Treat the lines collected so far as a finished plan.
    Keep,
    /// Drop them; only explicitly closed plans count.
    Discard,
}

/// Fixed numeric tolerance of a backend's time and cost values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Epsilon {
    pub numerator: u64,
    pub denominator: u64,
}

impl Epsilon {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl std::fmt::Display for Epsilon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Configuration for one planner backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Engine name reported on every result.
    pub name: String,

    /// Path to the planner executable.
    pub binary: String,

    /// Arguments placed before the anytime flag and input files.
    pub args: Vec<String>,

    /// Token enabling anytime mode; removed for one-shot runs.
    /// Written as `""` in TOML when the backend has none.
    #[serde(with = "flag_or_empty")]
    pub anytime_flag: Option<String>,

    /// Trailing-block policy of the batch path.
    pub batch_trailing: TrailingPlan,

    /// Trailing-block policy of the streaming path.
    pub stream_trailing: TrailingPlan,

    /// Wall-clock limit in seconds (0 = unlimited).
    pub timeout_secs: u64,

    /// Backend tolerance, if the backend has one.
    /// Written as `epsilon = false` in TOML when the backend has none.
    #[serde(with = "epsilon_or_false")]
    pub epsilon: Option<Epsilon>,

    /// Output sentinels.
    pub markers: OutputMarkers,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::popf()
    }
}

impl PlannerConfig {
    /// The POPF dialect.
    pub fn popf() -> Self {
        Self {
            name: "popf".to_string(),
            binary: "popf".to_string(),
            args: Vec::new(),
            anytime_flag: Some("-n".to_string()),
            epsilon: Some(Epsilon::new(1, 1000)),
            markers: OutputMarkers::default(),
            batch_trailing: TrailingPlan::Keep,
            stream_trailing: TrailingPlan::Discard,
            timeout_secs: 0,
        }
    }

    /// Parse a dialect from TOML. Missing fields fall back to POPF.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a dialect file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Use both trailing policies from one flag.
    pub fn with_trailing(mut self, policy: TrailingPlan) -> Self {
        self.batch_trailing = policy;
        self.stream_trailing = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
        if self.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("binary must not be empty".to_string()));
        }
        if self.markers.plan_start.is_empty() {
            return Err(ConfigError::Invalid(
                "markers.plan_start must not be empty".to_string(),
            ));
        }
        if let Some(eps) = self.epsilon {
            if eps.denominator == 0 {
                return Err(ConfigError::Invalid(
                    "epsilon denominator must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// `None` is the empty string, so a dialect file can switch the flag off.
mod flag_or_empty {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flag: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(flag.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let flag = String::deserialize(d)?;
        Ok((!flag.is_empty()).then_some(flag))
    }
}

/// `None` is `false`, so a dialect file can switch the tolerance off.
mod epsilon_or_false {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Epsilon;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Off(bool),
        Ratio(Epsilon),
    }

    pub fn serialize<S: Serializer>(eps: &Option<Epsilon>, s: S) -> Result<S::Ok, S::Error> {
        match eps {
            Some(eps) => Repr::Ratio(*eps),
            None => Repr::Off(false),
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Epsilon>, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Ratio(eps) => Ok(Some(eps)),
            Repr::Off(false) => Ok(None),
            Repr::Off(true) => Err(D::Error::custom(
                "epsilon must be false or a numerator/denominator table",
            )),
        }
    }
}
