//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Default decoder binary, looked up in `PATH`.
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// How often a still-running process is reported in the logs.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);

/// How long pipe readers may lag behind the exit of the tool.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path or numbered pattern
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Whether to suppress the version banner
    hide_banner: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            hide_banner: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        if self.hide_banner {
            args.push("-hide_banner".to_string());
        }

        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// What a successful run left behind.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Everything the process wrote to stderr
    pub stderr: String,
    /// Wall-clock time spent waiting for the process
    pub elapsed: Duration,
}

/// Runner for FFmpeg commands with an optional deadline.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Binary name or path of the decoding tool
    program: PathBuf,
    /// Timeout after which the child is killed
    timeout: Option<Duration>,
    /// Interval between "still running" log lines
    heartbeat: Duration,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a runner for the `ffmpeg` binary found in `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_FFMPEG_BINARY),
            timeout: None,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    /// Use a different binary. Any tool honouring the FFmpeg CLI contract works.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set heartbeat interval.
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Locate the configured binary, searching `PATH` for bare names.
    pub fn resolve_program(&self) -> MediaResult<PathBuf> {
        which::which(&self.program)
            .map_err(|_| MediaError::ToolNotFound(self.program.display().to_string()))
    }

    /// Short tool name used in error messages.
    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Run a command and wait for it to exit.
    ///
    /// stdin is closed, stdout and stderr are captured. A non-zero exit
    /// status becomes [`MediaError::ToolFailed`] carrying the stderr text.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<ToolOutput> {
        let program = self.resolve_program()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", program.display(), args.join(" "));

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout also reaches helpers a wrapper script started
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| {
                warn!(program = %program.display(), error = %e, "Failed to spawn decoding tool");
                MediaError::ToolNotFound(format!("{}: {}", program.display(), e))
            })?;

        let pid = child.id();
        debug!(pid = ?pid, "Decoding tool started");

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;

        let stderr_handle = tokio::spawn(collect_lines(stderr, "stderr"));
        let stdout_handle = tokio::spawn(collect_lines(stdout, "stdout"));

        let started = Instant::now();
        let result = self.wait_for_completion(&mut child, pid).await;
        let elapsed = started.elapsed();

        let stderr_text = drain(stderr_handle, "stderr").await;
        drain(stdout_handle, "stdout").await;

        let status = result?;
        info!(
            pid = ?pid,
            code = ?status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Decoding tool exited"
        );

        if status.success() {
            Ok(ToolOutput {
                stderr: stderr_text,
                elapsed,
            })
        } else {
            warn!(code = ?status.code(), stderr = %stderr_text.trim_end(), "Decoding tool failed");
            Err(MediaError::tool_failed(
                &self.tool_name(),
                status.code(),
                stderr_text,
            ))
        }
    }

    /// Wait for the child, logging a heartbeat and enforcing the deadline.
    async fn wait_for_completion(&self, child: &mut Child, pid: Option<u32>) -> MediaResult<ExitStatus> {
        let started = Instant::now();
        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);
        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + self.heartbeat, self.heartbeat);

        let status = loop {
            let expired = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                status = child.wait() => break Some(status),
                _ = heartbeat.tick() => {
                    info!(
                        pid = ?pid,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Decoding tool still running"
                    );
                }
                _ = expired => break None,
            }
        };

        match status {
            Some(status) => Ok(status?),
            None => {
                let timeout = self.timeout.unwrap_or_default();
                warn!(
                    pid = ?pid,
                    timeout_ms = timeout.as_millis() as u64,
                    "Decoding tool timed out, killing process group"
                );
                kill_process_group(pid);
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout))
            }
        }
    }
}

/// Drain a child pipe, logging each line and returning the full text.
///
/// Bytes are read raw and decoded lossily per line. Stopping at the first
/// invalid UTF-8 sequence would close the pipe and kill the writer.
async fn collect_lines<R>(pipe: R, stream: &'static str) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    let mut collected = String::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                debug!(stream, "{}", line);
                collected.push_str(line);
                collected.push('\n');
            }
            Err(e) => {
                warn!(stream, error = %e, "Failed to read from decoding tool");
                break;
            }
        }
    }

    collected
}

/// Wait for a pipe reader, giving up after [`PIPE_DRAIN_GRACE`].
///
/// A descendant of the tool may still hold the pipe open after the tool
/// itself has exited or been killed.
async fn drain(mut handle: JoinHandle<String>, stream: &'static str) -> String {
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            warn!(stream, "Decoding tool pipe still open, abandoning reader");
            handle.abort();
            String::new()
        }
    }
}

/// SIGKILL the process group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %e, "Failed to signal process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
