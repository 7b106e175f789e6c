// src/utils/command.rs

use std::{
    io::Read,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, error, trace};

use crate::errors::TweakError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub program: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Converts a non-zero exit into `TweakError::ExternalTool`, keeping the output for diagnostics.
    pub fn into_success(self) -> Result<CommandOutput, TweakError> {
        if self.success() {
            Ok(self)
        } else {
            Err(TweakError::ExternalTool {
                program: self.program.clone(),
                code: self.code,
                output: self.combined_output(),
            })
        }
    }

    pub fn combined_output(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Runs external command-line tools synchronously.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, TweakError>;
}

/// Spawns real processes, hidden on Windows, and kills them once `timeout` elapses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, TweakError> {
        trace!("Running '{}' with args {:?}", program, args);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = command.spawn().map_err(|source| TweakError::Launch {
            program: program.to_string(),
            source,
        })?;

        // Drain both pipes concurrently so a chatty child can't block on a full buffer.
        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        let code = wait_with_timeout(&mut child, program, timeout)?;

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        debug!("'{}' exited with {:?}", program, code);

        Ok(CommandOutput {
            program: program.to_string(),
            code,
            stdout,
            stderr,
        })
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).to_string()
    })
}

fn wait_with_timeout(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<Option<i32>, TweakError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) if Instant::now() >= deadline => {
                error!("'{}' exceeded {:?}, killing it", program, timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(TweakError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(TweakError::Launch {
                    program: program.to_string(),
                    source,
                })
            }
        }
    }
}

/// Executes a PowerShell script and returns its trimmed stdout.
///
/// A non-zero exit code or any output on stderr is treated as failure.
pub fn execute_powershell_script(
    runner: &dyn CommandRunner,
    script: &str,
    timeout: Duration,
) -> Result<String, TweakError> {
    let output = runner
        .run(
            "powershell.exe",
            &[
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script,
            ],
            timeout,
        )?
        .into_success()?;

    if !output.stderr.trim().is_empty() {
        error!("PowerShell script error output: {}", output.stderr.trim());
        return Err(TweakError::ExternalTool {
            program: output.program,
            code: output.code,
            output: output.stderr.trim().to_string(),
        });
    }

    Ok(output.stdout.trim().to_string())
}
