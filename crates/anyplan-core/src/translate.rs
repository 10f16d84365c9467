//! Plan text to structured plans.
//!
//! The assembler only delimits plans; turning the raw lines into actions is
//! the job of a [`PlanTranslator`]. Two are provided: [`RawPlanTranslator`]
//! keeps the text as-is, and [`TimedPlanTranslator`] parses the timed action
//! lines printed by POPF-family planners.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// Maps newline-joined plan text to a structured plan.
///
/// The rendered form (`Display`) is what status classification inspects: a
/// header line plus one line per step, and nothing for an empty plan.
pub trait PlanTranslator: Send + Sync {
    type Plan: Clone + fmt::Display + Send + Sync + 'static;

    fn translate(&self, plan_text: &str) -> Result<Self::Plan, TranslateError>;
}

/// Plan kept as its raw output lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPlan {
    pub lines: Vec<String>,
}

impl RawPlan {
    /// The lines exactly as printed, joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Header line followed by one indented line per plan line; empty for an
/// empty plan.
impl fmt::Display for RawPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            return Ok(());
        }
        write!(f, "RawPlan ({} lines):", self.lines.len())?;
        for line in &self.lines {
            write!(f, "\n    {line}")?;
        }
        Ok(())
    }
}

/// Identity translator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPlanTranslator;

impl PlanTranslator for RawPlanTranslator {
    type Plan = RawPlan;

    fn translate(&self, plan_text: &str) -> Result<RawPlan, TranslateError> {
        Ok(RawPlan {
            lines: plan_text.lines().map(str::to_string).collect(),
        })
    }
}

/// One grounded action of a timed plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedAction {
    /// Start time; absent for sequential plan lines.
    pub start: Option<f64>,
    pub name: String,
    pub args: Vec<String>,
    pub duration: Option<f64>,
}

impl fmt::Display for TimedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{start:.3}: ")?;
        }
        write!(f, "({}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        f.write_str(")")?;
        if let Some(duration) = self.duration {
            write!(f, " [{duration:.3}]")?;
        }
        Ok(())
    }
}

/// Ordered actions of one plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimedPlan {
    pub actions: Vec<TimedAction>,
}

impl TimedPlan {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// End time of the last action to finish.
    pub fn makespan(&self) -> Option<f64> {
        self.actions
            .iter()
            .filter_map(|a| a.start.map(|s| s + a.duration.unwrap_or(0.0)))
            .fold(None, |acc: Option<f64>, end| {
                Some(acc.map_or(end, |m| m.max(end)))
            })
    }
}

impl fmt::Display for TimedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.actions.is_empty() {
            return Ok(());
        }
        write!(f, "TimedPlan ({} actions):", self.actions.len())?;
        for action in &self.actions {
            write!(f, "\n    {action}")?;
        }
        Ok(())
    }
}

/// Parses `<start>: (<action> <args>...) [<duration>]` lines.
///
/// Every action and object name is resolved through `lookup`; a name the
/// lookup rejects is an [`TranslateError::UnknownSymbol`]. Lines starting
/// with `;` are comments.
pub struct TimedPlanTranslator<F> {
    lookup: F,
}

impl<F> TimedPlanTranslator<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    fn resolve(&self, symbol: &str, line_no: usize) -> Result<String, TranslateError> {
        (self.lookup)(symbol).ok_or_else(|| TranslateError::UnknownSymbol {
            line_no,
            symbol: symbol.to_string(),
        })
    }

    fn parse_line(&self, line: &str, line_no: usize) -> Result<TimedAction, TranslateError> {
        let malformed = || TranslateError::MalformedLine {
            line_no,
            line: line.to_string(),
        };

        let open = line.find('(').ok_or_else(malformed)?;
        let close = line[open..].find(')').map(|i| open + i).ok_or_else(malformed)?;

        let head = line[..open].trim();
        let start = if head.is_empty() {
            None
        } else {
            let value = head.strip_suffix(':').ok_or_else(malformed)?.trim();
            Some(parse_number(value, line_no)?)
        };

        let mut tokens = line[open + 1..close].split_whitespace();
        let name = self.resolve(tokens.next().ok_or_else(malformed)?, line_no)?;
        let args = tokens
            .map(|token| self.resolve(token, line_no))
            .collect::<Result<Vec<_>, _>>()?;

        let tail = line[close + 1..].trim();
        let duration = if tail.is_empty() {
            None
        } else {
            let value = tail
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(malformed)?;
            Some(parse_number(value.trim(), line_no)?)
        };

        Ok(TimedAction {
            start,
            name,
            args,
            duration,
        })
    }
}

impl TimedPlanTranslator<fn(&str) -> Option<String>> {
    /// Accept every symbol as written.
    pub fn permissive() -> Self {
        fn identity(symbol: &str) -> Option<String> {
            Some(symbol.to_string())
        }
        Self::new(identity as fn(&str) -> Option<String>)
    }
}

impl<F> PlanTranslator for TimedPlanTranslator<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    type Plan = TimedPlan;

    fn translate(&self, plan_text: &str) -> Result<TimedPlan, TranslateError> {
        let mut actions = Vec::new();
        for (idx, line) in plan_text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            actions.push(self.parse_line(line, idx + 1)?);
        }
        Ok(TimedPlan { actions })
    }
}

fn parse_number(value: &str, line_no: usize) -> Result<f64, TranslateError> {
    value
        .parse::<f64>()
        .map_err(|_| TranslateError::InvalidNumber {
            line_no,
            value: value.to_string(),
        })
}
