//! Optional renderer build step run before any scene.

use std::process::{Command, Stdio};

use crate::foundation::error::{FoldError, FoldResult};
use crate::run::config::BuildConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// No build command configured.
    Skipped,
    Succeeded { output: String },
    Failed { code: Option<i32>, output: String },
}

pub fn run_build(cfg: &BuildConfig) -> FoldResult<BuildOutcome> {
    let Some((program, args)) = cfg.command.split_first() else {
        return Ok(BuildOutcome::Skipped);
    };

    tracing::info!(program = %program, "building renderer");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| FoldError::render(format!("failed to launch build '{program}': {e}")))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    if output.status.success() {
        Ok(BuildOutcome::Succeeded { output: text })
    } else {
        Ok(BuildOutcome::Failed {
            code: output.status.code(),
            output: text,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/run/build.rs"]
mod tests;
