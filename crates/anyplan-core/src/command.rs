//! Planner command lines.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};

/// A planner invocation: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerCommand {
    program: String,
    args: Vec<String>,
}

impl PlannerCommand {
    /// `binary [args] [anytime flag] domain problem [plan_out]`
    pub fn anytime(
        config: &PlannerConfig,
        domain: &Path,
        problem: &Path,
        plan_out: Option<&Path>,
    ) -> Self {
        let mut args = config.args.clone();
        if let Some(flag) = &config.anytime_flag {
            args.push(flag.clone());
        }
        args.push(domain.display().to_string());
        args.push(problem.display().to_string());
        if let Some(out) = plan_out {
            args.push(out.display().to_string());
        }
        Self {
            program: config.binary.clone(),
            args,
        }
    }

    /// The anytime command line with the anytime flag token removed.
    pub fn one_shot(
        config: &PlannerConfig,
        domain: &Path,
        problem: &Path,
        plan_out: Option<&Path>,
    ) -> Self {
        let command = Self::anytime(config, domain, problem, plan_out);
        match &config.anytime_flag {
            Some(flag) => command.without_token(flag),
            None => command,
        }
    }

    /// Drop every argument exactly equal to `token`.
    pub fn without_token(mut self, token: &str) -> Self {
        self.args.retain(|arg| arg != token);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A spawnable command with both output streams piped.
    ///
    /// On unix the planner leads its own process group, so stopping it also
    /// stops any helper processes a wrapper script started.
    pub(crate) fn to_command(&self, engine: &str) -> Result<tokio::process::Command> {
        if self.program.trim().is_empty() {
            return Err(PlannerError::EmptyCommand {
                engine: engine.to_string(),
            });
        }
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        Ok(command)
    }
}

impl fmt::Display for PlannerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
