use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::foundation::error::{FoldError, FoldResult};
use crate::render::params::{PARAMS_PATH_ENV, ParamsFormat, RenderParams};

/// Captured output kept for diagnostics when a render fails.
const MAX_LOGGED_OUTPUT: usize = 4096;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub executable: PathBuf,
    /// Passed as `--script=<path>`; omitted when `None`.
    pub script: Option<PathBuf>,
    pub extra_args: Vec<String>,
    /// Where the JSON parameter surface is written. Defaults next to the output directory.
    pub params_path: Option<PathBuf>,
    pub params_format: ParamsFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("Bin/x64/Release/Mogwai.exe"),
            script: Some(PathBuf::from("main.py")),
            extra_args: Vec::new(),
            params_path: None,
            params_format: ParamsFormat::Json,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Success { stdout: String },
    Failure { code: Option<i32>, stdout: String },
}

/// One renderer invocation per call. Implementations must not advance any sample state.
pub trait Renderer {
    fn render(&mut self, params: &RenderParams) -> FoldResult<RenderOutcome>;
}

/// Launches the external renderer as a child process and waits for it.
pub struct ProcessRenderer {
    cfg: RendererConfig,
    params_path: PathBuf,
}

impl ProcessRenderer {
    pub fn new(cfg: RendererConfig, default_params_path: PathBuf) -> Self {
        let params_path = cfg.params_path.clone().unwrap_or(default_params_path);
        Self { cfg, params_path }
    }

    pub fn params_path(&self) -> &std::path::Path {
        &self.params_path
    }

    /// Start the renderer without a script for a live session, inheriting stdio.
    pub fn launch_interactive(&self) -> FoldResult<ExitStatus> {
        Command::new(&self.cfg.executable)
            .args(&self.cfg.extra_args)
            .status()
            .map_err(|e| {
                FoldError::render(format!(
                    "failed to launch renderer '{}': {e}",
                    self.cfg.executable.display()
                ))
            })
    }

    fn command(&self, params: &RenderParams) -> FoldResult<Command> {
        let mut cmd = Command::new(&self.cfg.executable);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(&self.cfg.extra_args);
        if let Some(script) = &self.cfg.script {
            let mut arg = std::ffi::OsString::from("--script=");
            arg.push(script);
            cmd.arg(arg);
        }

        let surface = params.surface();
        match self.cfg.params_format {
            ParamsFormat::Json => {
                surface.write_json(&self.params_path)?;
                cmd.env(PARAMS_PATH_ENV, &self.params_path);
            }
            ParamsFormat::Env => {
                cmd.envs(surface.env_pairs());
            }
        }
        Ok(cmd)
    }
}

impl Renderer for ProcessRenderer {
    fn render(&mut self, params: &RenderParams) -> FoldResult<RenderOutcome> {
        let output = self.command(params)?.output().map_err(|e| {
            FoldError::render(format!(
                "failed to launch renderer '{}': {e}",
                self.cfg.executable.display()
            ))
        })?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            stdout.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        if output.status.success() {
            Ok(RenderOutcome::Success { stdout })
        } else {
            Ok(RenderOutcome::Failure {
                code: output.status.code(),
                stdout,
            })
        }
    }
}

/// Retry behaviour for failed renders. The default retries forever with no delay.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Invoke the renderer until it succeeds. Returns the number of attempts taken.
#[tracing::instrument(skip_all, fields(sample = params.sample_index, seed = params.seed_offset))]
pub fn render_with_retry(
    renderer: &mut dyn Renderer,
    params: &RenderParams,
    policy: &RetryPolicy,
) -> FoldResult<u32> {
    if policy.max_attempts == Some(0) {
        return Err(FoldError::validation("retry max_attempts must be >= 1 when set"));
    }
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        match renderer.render(params)? {
            RenderOutcome::Success { .. } => return Ok(attempt),
            RenderOutcome::Failure { code, stdout } => {
                tracing::warn!(attempt, ?code, "unsuccessful, retry");
                tracing::warn!("renderer output:\n{}", tail(&stdout, MAX_LOGGED_OUTPUT));
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(FoldError::render(format!(
                        "renderer failed {attempt} time(s) at sample {}",
                        params.sample_index
                    )));
                }
                if policy.backoff_ms > 0 {
                    std::thread::sleep(policy.backoff());
                }
            }
        }
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
#[path = "../../tests/unit/render/invoker.rs"]
mod tests;
