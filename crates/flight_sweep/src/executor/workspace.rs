use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use flight_sweep_core::ParameterSet;
use tempfile::TempDir;
use tracing::warn;

use super::{FailureKind, SimulatorConfig};
use crate::wind::{wind_profile_for, write_wind_table};

pub const PARAMETERS_FILE: &str = "parameters.json";
pub const WIND_TABLE_FILE: &str = "wind_table.csv";
pub const STDOUT_FILE: &str = "stdout.log";
pub const STDERR_FILE: &str = "stderr.log";

pub(crate) const WORKSPACE_ENV: &str = "FLIGHT_SWEEP_WORKSPACE";
pub(crate) const PARAMS_ENV: &str = "FLIGHT_SWEEP_PARAMS";
pub(crate) const INDEX_ENV: &str = "FLIGHT_SWEEP_INDEX";

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDERR_TAIL_LINES: usize = 20;
const STDERR_TAIL_CHARS: usize = 2000;

#[cfg(unix)]
const EXHAUSTION_CODES: [i32; 3] = [23, 24, 28]; // ENFILE, EMFILE, ENOSPC
#[cfg(windows)]
const EXHAUSTION_CODES: [i32; 3] = [4, 39, 112]; // too many open files, handle disk full, disk full
#[cfg(not(any(unix, windows)))]
const EXHAUSTION_CODES: [i32; 0] = [];

/// Disk-full and out-of-handles errors poison every later run as well.
pub(crate) fn classify_io_error(error: &io::Error) -> FailureKind {
    match error.raw_os_error() {
        Some(code) if EXHAUSTION_CODES.contains(&code) => FailureKind::ResourceExhausted,
        _ => FailureKind::Io,
    }
}

pub(crate) enum ProcessExit {
    Exited(ExitStatus),
    TimedOut,
}

/// SIGKILL the child's whole process group. Falls back to the child alone
/// when the group is already gone.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal; pgid is the group created for this child.
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == 0 {
        return Ok(());
    }
    let error = io::Error::last_os_error();
    match error.raw_os_error() {
        Some(libc::ESRCH) => child.kill(),
        _ => Err(error),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Scratch directory owned by exactly one run.
pub(crate) struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    pub(crate) fn create(root: &Path, sweep_index: usize) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("run-{sweep_index:06}-"))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub(crate) fn write_inputs(&self, parameter_set: &ParameterSet) -> io::Result<()> {
        fs::write(self.file(PARAMETERS_FILE), parameter_set.values_json())?;

        if let Some(profile) = wind_profile_for(parameter_set) {
            let file = File::create(self.file(WIND_TABLE_FILE))?;
            write_wind_table(&profile, file).map_err(io::Error::other)?;
        }
        Ok(())
    }

    /// Spawn the simulator and wait for it, killing it once the timeout
    /// elapses. Output goes to files so a chatty child cannot fill a pipe.
    pub(crate) fn invoke(&self, config: &SimulatorConfig, sweep_index: usize) -> io::Result<ProcessExit> {
        let workspace = self.path().to_string_lossy().into_owned();
        let params = self.file(PARAMETERS_FILE).to_string_lossy().into_owned();
        let index = sweep_index.to_string();

        let args: Vec<String> = config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{workspace}", &workspace)
                    .replace("{params}", &params)
                    .replace("{index}", &index)
            })
            .collect();

        let stdout = File::create(self.file(STDOUT_FILE))?;
        let stderr = File::create(self.file(STDERR_FILE))?;

        let mut command = Command::new(&config.program);
        command
            .args(&args)
            .current_dir(self.path())
            .env(WORKSPACE_ENV, &workspace)
            .env(PARAMS_ENV, &params)
            .env(INDEX_ENV, &index)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        // Own process group, so a timeout also kills the simulator's descendants.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        let deadline = Instant::now() + config.timeout();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(ProcessExit::Exited(status));
            }
            let now = Instant::now();
            if now >= deadline {
                if let Err(error) = kill_process_group(&mut child) {
                    warn!(sweep_index, %error, "failed to kill timed-out simulator");
                }
                let _ = child.wait();
                return Ok(ProcessExit::TimedOut);
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// The configured output file when the simulator produced it, otherwise
    /// captured stdout.
    pub(crate) fn open_output(&self, output_file: Option<&str>) -> io::Result<File> {
        if let Some(name) = output_file {
            let path = self.file(name);
            if path.is_file() {
                return File::open(path);
            }
        }
        File::open(self.file(STDOUT_FILE))
    }

    pub(crate) fn stderr_excerpt(&self) -> String {
        let Ok(text) = fs::read_to_string(self.file(STDERR_FILE)) else {
            return String::new();
        };
        let lines: Vec<&str> = text.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        let skip = tail.chars().count().saturating_sub(STDERR_TAIL_CHARS);
        tail.chars().skip(skip).collect()
    }

    pub(crate) fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}
