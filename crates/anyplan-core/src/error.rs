//! Error taxonomy for planner adapters.
//!
//! Solve outcomes ("no plan found", "unsolvable", planner crash) are status
//! values, not errors. The variants here cover the cases where the adapter
//! itself cannot do its job: the process never started, a plan could not be
//! translated, or a dialect file is invalid.

/// Errors produced while turning plan text into a structured plan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error("malformed plan line {line_no}: {line:?}")]
    MalformedLine { line_no: usize, line: String },

    #[error("unknown symbol {symbol:?} on plan line {line_no}")]
    UnknownSymbol { line_no: usize, symbol: String },

    #[error("invalid number {value:?} on plan line {line_no}")]
    InvalidNumber { line_no: usize, value: String },
}

/// Errors produced while loading a planner dialect.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read planner config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse planner config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render planner config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid planner config: {0}")]
    Invalid(String),
}

/// Planner adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("planner {engine} has an empty command line")]
    EmptyCommand { engine: String },

    #[error("failed to spawn planner {engine}: {source}")]
    Spawn {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("planner {engine} pipe unavailable: {stream}")]
    PipeUnavailable { engine: String, stream: &'static str },

    #[error("plan translation failed: {0}")]
    Translate(#[from] TranslateError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("output drain task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for planner adapter operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_error_display() {
        let err = TranslateError::UnknownSymbol {
            line_no: 3,
            symbol: "truck9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("truck9"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn test_translate_error_converts_into_planner_error() {
        let err: PlannerError = TranslateError::MalformedLine {
            line_no: 1,
            line: "garbage".to_string(),
        }
        .into();
        assert!(err.to_string().contains("plan translation failed"));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_empty_command_error() {
        let err = PlannerError::EmptyCommand {
            engine: "popf".to_string(),
        };
        assert!(err.to_string().contains("popf"));
    }
}
