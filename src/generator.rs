//! Launching the frame generator and relaying its console output.
//!
//! The generator is started with stdout and stderr piped. stdout is read
//! line by line on the calling thread and handed to a [`RelaySink`] as soon
//! as each line arrives. stderr is drained on a helper thread so a chatty
//! child cannot stall on a full pipe, and is relayed in one piece once the
//! child has exited.
//!
//! The step is complete only after stdout reached end-of-file, the child
//! has been reaped, and the stderr thread has been joined. No line written
//! before exit can be missed.

use std::{
    io::{BufRead, BufReader, Read},
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread,
};

use crate::error::ReelError;

/// What to do when the generator exits with a non-zero status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Log a warning and assemble whatever frames were produced.
    #[default]
    Proceed,
    /// Fail with [`ReelError::GeneratorFailed`] before assembly.
    Abort,
}

/// Destination for relayed generator output.
pub trait RelaySink {
    /// Called once per stdout line, in the order the child wrote them.
    fn stdout_line(&mut self, line: &str);

    /// Called at most once with the child's trimmed, non-empty stderr text.
    fn stderr_text(&mut self, text: &str);
}

/// Prints stdout lines to our stdout and stderr text, prefixed with
/// `STDERR:`, to our stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleRelay;

impl RelaySink for ConsoleRelay {
    fn stdout_line(&mut self, line: &str) {
        println!("{line}");
    }

    fn stderr_text(&mut self, text: &str) {
        eprintln!("STDERR: {text}");
    }
}

/// Collects relayed output in memory.
#[derive(Debug, Default, Clone)]
pub struct CapturedRelay {
    /// stdout lines in arrival order.
    pub lines: Vec<String>,
    /// stderr text, if any was written.
    pub stderr: Option<String>,
}

impl RelaySink for CapturedRelay {
    fn stdout_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn stderr_text(&mut self, text: &str) {
        self.stderr = Some(text.to_string());
    }
}

/// Outcome of a completed generator run.
#[derive(Debug, Clone)]
pub struct GeneratorReport {
    /// Exit status of the child.
    pub status: ExitStatus,
    /// Number of stdout lines relayed.
    pub stdout_lines: u64,
    /// Trimmed stderr output, if non-empty.
    pub stderr: Option<String>,
}

impl GeneratorReport {
    /// Whether the generator exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` if the child was terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Run the generator to completion, relaying its output to `sink`.
///
/// The child gets no arguments, a null stdin, and `working_directory` as
/// its current directory.
///
/// # Errors
///
/// - [`ReelError::Launch`] if the executable cannot be started.
/// - [`ReelError::Io`] if reading a pipe or waiting on the child fails.
///
/// The exit status is reported, not judged; see [`check_exit`].
pub fn run_generator<S: RelaySink + ?Sized>(
    executable: &Path,
    working_directory: &Path,
    sink: &mut S,
) -> Result<GeneratorReport, ReelError> {
    log::info!(
        "Launching generator {} in {}",
        executable.display(),
        working_directory.display(),
    );

    let mut child = Command::new(executable)
        .current_dir(working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ReelError::Launch {
            path: executable.to_path_buf(),
            source,
        })?;

    let stderr_pipe = child.stderr.take();
    let stderr_thread = thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    });

    let mut stdout_lines = 0_u64;
    let relay_result = match child.stdout.take() {
        Some(pipe) => relay_lines(pipe, |line| {
            stdout_lines += 1;
            sink.stdout_line(line);
        }),
        None => Ok(()),
    };

    // Reap the child before surfacing a relay error so it never lingers.
    let status = child.wait()?;
    let stderr_bytes = stderr_thread
        .join()
        .map_err(|_| std::io::Error::other("stderr reader thread panicked"))??;
    relay_result?;

    let stderr_text = String::from_utf8_lossy(&stderr_bytes);
    let stderr = match stderr_text.trim() {
        "" => None,
        text => {
            sink.stderr_text(text);
            Some(text.to_string())
        }
    };

    log::debug!(
        "Generator exited with {status} after {stdout_lines} stdout line(s)",
    );

    Ok(GeneratorReport {
        status,
        stdout_lines,
        stderr,
    })
}

/// Apply `policy` to a finished run.
///
/// # Errors
///
/// Returns [`ReelError::GeneratorFailed`] when the run failed and the
/// policy is [`ExitPolicy::Abort`].
pub fn check_exit(report: &GeneratorReport, policy: ExitPolicy) -> Result<(), ReelError> {
    if report.success() {
        return Ok(());
    }
    match policy {
        ExitPolicy::Abort => Err(ReelError::GeneratorFailed {
            code: report.code(),
        }),
        ExitPolicy::Proceed => {
            log::warn!(
                "Generator exited with {}; assembling the frames it produced",
                report.status,
            );
            Ok(())
        }
    }
}

/// Read `reader` to end-of-file, calling `on_line` for every line.
///
/// Lines are decoded lossily and trimmed of surrounding whitespace.
fn relay_lines<R: Read, F: FnMut(&str)>(reader: R, mut on_line: F) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buffer);
        on_line(line.trim());
    }
}
