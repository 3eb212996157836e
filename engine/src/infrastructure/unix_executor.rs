//! Unix process executor
//! Real implementation of the ProcessExecutor port: spawns children in
//! their own session, pipes their output into the unit's log sinks, and
//! reports exits through an event-driven handle.

use crate::domain::ports::{ProcessExecutor, ProcessExitHandle, SpawnConfig, SpawnResult};
use crate::domain::DomainError;
use crate::infrastructure::{LogStream, UnitLogSink};
use async_trait::async_trait;
use std::io::{BufRead, BufReader};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Executor backed by std::process with tokio blocking tasks for
/// wait and log forwarding
pub struct UnixProcessExecutor;

impl UnixProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Forward one child stream into the unit's log sink, line by line.
    /// The task ends when the child closes the stream (usually by exiting).
    fn forward_stream<R: std::io::Read + Send + 'static>(
        reader: R,
        sink: Arc<UnitLogSink>,
        stream: LogStream,
        pid: u32,
    ) {
        tokio::task::spawn_blocking(move || {
            let buffered = BufReader::new(reader);
            for line in buffered.lines() {
                match line {
                    Ok(line) => sink.write_line(stream, &line),
                    Err(e) => {
                        debug!(pid = pid, error = %e, "Log stream closed");
                        break;
                    }
                }
            }
        });
    }

    /// Create the exit handle: a future resolving to the child's exit code
    /// once it has been fully reaped.
    /// A signal death reports 128 + signal number, the shell convention.
    fn create_exit_handle(mut child: Child, pid: u32) -> Option<ProcessExitHandle> {
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let exit_result = tokio::task::spawn_blocking(move || match child.wait() {
                Ok(status) => {
                    let exit_code = status
                        .code()
                        .or_else(|| status.signal().map(|s| 128 + s))
                        .unwrap_or(-1);
                    debug!(pid = pid, exit_code = exit_code, "Child process exited");
                    Ok(exit_code)
                }
                Err(e) => {
                    error!(pid = pid, error = %e, "Failed to wait for child process");
                    Err(DomainError::Runtime(format!(
                        "failed to wait for child process: {}",
                        e
                    )))
                }
            })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Blocking wait task panicked");
                Err(DomainError::Runtime(format!("wait task panicked: {}", e)))
            });
            let _ = tx.send(exit_result);
        });

        let exit_fut = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DomainError::Runtime(
                    "child monitor task died unexpectedly".to_string(),
                )),
            }
        };
        Some(Box::pin(exit_fut) as ProcessExitHandle)
    }
}

impl Default for UnixProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessExecutor for UnixProcessExecutor {
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError> {
        info!(
            unit = %config.unit_name,
            command = %config.command,
            args = ?config.args,
            "Spawning child process"
        );

        let sink = UnitLogSink::open(&config.log).map_err(|e| DomainError::Launch {
            unit: config.unit_name.clone(),
            reason: format!("failed to open log sink: {}", e),
        })?;

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(ref dir) = config.working_dir {
            debug!(working_dir = %dir, "Setting working directory");
            cmd.current_dir(dir);
        }

        // Declared variables merge over the inherited environment
        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let capture_stdout = sink.as_ref().map(|s| s.captures_stdout()).unwrap_or(false);
        let capture_stderr = sink.as_ref().map(|s| s.captures_stderr()).unwrap_or(false);

        cmd.stdin(Stdio::null());
        cmd.stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stderr(if capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        unsafe {
            cmd.pre_exec(|| {
                // New session so the child never shares our controlling
                // terminal; ignore failure if already a session leader
                libc::setsid();
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!(
                unit = %config.unit_name,
                command = %config.command,
                error = %e,
                "Failed to spawn child process"
            );
            DomainError::Launch {
                unit: config.unit_name.clone(),
                reason: format!("failed to spawn '{}': {}", config.command, e),
            }
        })?;

        let pid = child.id();

        if let Some(sink) = sink {
            if let Some(stdout) = child.stdout.take() {
                Self::forward_stream(stdout, sink.clone(), LogStream::Stdout, pid);
            }
            if let Some(stderr) = child.stderr.take() {
                Self::forward_stream(stderr, sink.clone(), LogStream::Stderr, pid);
            }
        }

        info!(unit = %config.unit_name, pid = pid, "Child process spawned");

        let exit_handle = Self::create_exit_handle(child, pid);
        Ok(SpawnResult { pid, exit_handle })
    }

    async fn kill(&self, pid: u32, signal: i32) -> Result<(), DomainError> {
        info!(pid = pid, signal = signal, "Signalling child process");

        let result = unsafe { libc::kill(pid as i32, signal) };
        if result != 0 {
            let err = std::io::Error::last_os_error();
            warn!(
                pid = pid,
                signal = signal,
                error = %err,
                "Failed to send signal to child process"
            );
            return Err(DomainError::Runtime(format!(
                "failed to send signal {} to pid {}: {}",
                signal, pid, err
            )));
        }
        debug!(pid = pid, signal = signal, "Signal sent");
        Ok(())
    }

    async fn is_running(&self, pid: u32) -> Result<bool, DomainError> {
        let result = unsafe { libc::kill(pid as i32, 0) };
        Ok(result == 0)
    }
}
