//! Lifecycle management for the supervised node process.
//!
//! [`ProcessSupervisor`] owns at most one running node. It captures the
//! node's output into a bounded ring, distinguishes requested stops from
//! unexpected exits, and publishes an exit event carrying the captured output
//! for the latter. Crashed nodes are not restarted automatically; a restart
//! happens only when a caller asks for one.

mod command;
mod errors;
mod exit;
mod log_ring;
mod version;

#[cfg(test)]
mod tests;

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use nodekeeper_events::{DomainEvent, ExitInfo};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use command::DaemonCommand;
pub use errors::SupervisorError;
pub use log_ring::{LOG_RING_CAPACITY, LogRing};
pub use version::DaemonVersion;

use crate::events::{EventHub, Subscription};
use crate::health::HealthReporter;

use self::exit::{describe_exit, exit_message};

pub(crate) const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Tracing target carrying the node's own output lines.
pub const DAEMON_LOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bitcoind");

/// Restart capability consumed by components that must bounce the node.
#[cfg_attr(test, mockall::automock)]
pub trait DaemonControl: Send + Sync {
    /// Stops the node if it is running and starts it again.
    fn restart(&self) -> Result<(), SupervisorError>;
}

/// Point-in-time view of the supervised process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStatus {
    /// Whether a node process is currently running.
    pub running: bool,
    /// Process id of the running node.
    pub pid: Option<u32>,
    /// When the running node was spawned.
    pub started_at: Option<SystemTime>,
    /// Most recent spawn failure, cleared by the next successful start.
    pub last_error: Option<String>,
}

struct RunningProcess {
    pid: u32,
    started_at: SystemTime,
    generation: u64,
}

#[derive(Default)]
struct SupervisorState {
    running: Option<RunningProcess>,
    generation: u64,
    stop_requested: bool,
    last_error: Option<String>,
    last_exit: Option<ExitInfo>,
}

struct Shared {
    state: Mutex<SupervisorState>,
    exited: Condvar,
    logs: Mutex<LogRing>,
    hub: Arc<EventHub>,
    reporter: Arc<dyn HealthReporter>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_logs(&self) -> MutexGuard<'_, LogRing> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Starts, stops, and watches a single node process.
///
/// Lifecycle operations are serialised: a `restart` racing a `stop` never
/// interleaves their steps. Exit events and subscription snapshots are taken
/// under the same lock, so a subscriber never misses or double-counts an
/// exit relative to its snapshot.
pub struct ProcessSupervisor {
    command: DaemonCommand,
    version: DaemonVersion,
    lifecycle: Mutex<()>,
    shared: Arc<Shared>,
}

impl ProcessSupervisor {
    /// Builds a supervisor, identifying the binary with `--version`.
    #[must_use]
    pub fn new(
        command: DaemonCommand,
        hub: Arc<EventHub>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let version = DaemonVersion::probe(command.program());
        Self::with_version(command, version, hub, reporter)
    }

    /// Builds a supervisor with an already known binary version.
    #[must_use]
    pub fn with_version(
        command: DaemonCommand,
        version: DaemonVersion,
        hub: Arc<EventHub>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            command,
            version,
            lifecycle: Mutex::new(()),
            shared: Arc::new(Shared {
                state: Mutex::new(SupervisorState::default()),
                exited: Condvar::new(),
                logs: Mutex::new(LogRing::default()),
                hub,
                reporter,
            }),
        }
    }

    /// Spawns the node unless it is already running.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Spawn`] when the binary cannot be started.
    /// The failure is also kept for [`status`](Self::status).
    pub fn start(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.lock_lifecycle();
        self.start_locked()
    }

    /// Asks the running node to terminate and waits until it has exited.
    ///
    /// A stop requested here never produces an exit event. Stopping a node
    /// that is not running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Signal`] when the termination signal cannot
    /// be delivered.
    pub fn stop(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.lock_lifecycle();
        self.stop_locked()
    }

    /// Stops the node if running, then starts it.
    ///
    /// # Errors
    ///
    /// Propagates failures from the stop and start steps.
    pub fn restart(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.lock_lifecycle();
        self.stop_locked()?;
        self.start_locked()
    }

    /// Reports whether the node is running.
    #[must_use]
    pub fn status(&self) -> DaemonStatus {
        let state = self.shared.lock_state();
        DaemonStatus {
            running: state.running.is_some(),
            pid: state.running.as_ref().map(|process| process.pid),
            started_at: state.running.as_ref().map(|process| process.started_at),
            last_error: state.last_error.clone(),
        }
    }

    /// Version reported by the node binary.
    #[must_use]
    pub const fn version(&self) -> &DaemonVersion {
        &self.version
    }

    /// Command line used to launch the node.
    #[must_use]
    pub const fn command(&self) -> &DaemonCommand {
        &self.command
    }

    /// Registers an event subscriber.
    ///
    /// The first event received is a snapshot of whether the node is running
    /// and of the last unacknowledged unexpected exit.
    pub fn subscribe(&self) -> Subscription {
        let state = self.shared.lock_state();
        self.shared.hub.subscribe_with(DomainEvent::Snapshot {
            running: state.running.is_some(),
            exit: state.last_exit.clone(),
        })
    }

    /// Last unexpected exit that has not been acknowledged.
    #[must_use]
    pub fn last_exit(&self) -> Option<ExitInfo> {
        self.shared.lock_state().last_exit.clone()
    }

    /// Acknowledges the last unexpected exit.
    pub fn clear_last_exit(&self) {
        self.shared.lock_state().last_exit = None;
    }

    /// Output lines captured from the current or most recent node process.
    #[must_use]
    pub fn recent_logs(&self) -> Vec<String> {
        self.shared.lock_logs().snapshot()
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_locked(&self) -> Result<(), SupervisorError> {
        if let Some(process) = self.shared.lock_state().running.as_ref() {
            debug!(target: SUPERVISOR_TARGET, pid = process.pid, "bitcoind already running");
            return Ok(());
        }
        self.shared.lock_logs().clear();

        info!(
            target: SUPERVISOR_TARGET,
            program = %self.command.program().display(),
            "starting bitcoind"
        );
        let spawned = Command::new(self.command.program())
            .args(self.command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                return Err(self.record_start_failure(SupervisorError::Spawn {
                    program: self.command.program().to_path_buf(),
                    source,
                }));
            }
        };
        let pid = child.id();

        let readers = match self.capture_output(&mut child) {
            Ok(readers) => readers,
            Err(error) => {
                abandon(&mut child);
                return Err(self.record_start_failure(error));
            }
        };

        let generation = {
            let mut state = self.shared.lock_state();
            state.generation += 1;
            state.running = Some(RunningProcess {
                pid,
                started_at: SystemTime::now(),
                generation: state.generation,
            });
            state.stop_requested = false;
            state.last_error = None;
            state.generation
        };

        let shared = Arc::clone(&self.shared);
        let watcher = thread::Builder::new()
            .name("bitcoind-exit".to_owned())
            .spawn(move || watch_exit(&shared, child, readers, pid, generation));
        if let Err(source) = watcher {
            // The child handle went with the closure; kill by pid.
            signal_process(pid, Signal::SIGKILL);
            self.shared.lock_state().running = None;
            return Err(self.record_start_failure(SupervisorError::Thread {
                purpose: "exit watcher",
                source,
            }));
        }

        self.shared.reporter.daemon_started(pid);
        Ok(())
    }

    fn stop_locked(&self) -> Result<(), SupervisorError> {
        let mut state = self.shared.lock_state();
        let Some((pid, generation)) = state
            .running
            .as_ref()
            .map(|process| (process.pid, process.generation))
        else {
            debug!(target: SUPERVISOR_TARGET, "stop requested while bitcoind is not running");
            return Ok(());
        };

        state.stop_requested = true;
        info!(target: SUPERVISOR_TARGET, pid, "stopping bitcoind");
        if let Err(source) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            && source != Errno::ESRCH
        {
            state.stop_requested = false;
            return Err(SupervisorError::Signal { pid, source });
        }

        let mut state = self
            .shared
            .exited
            .wait_while(state, |state| {
                state
                    .running
                    .as_ref()
                    .is_some_and(|process| process.generation == generation)
            })
            .unwrap_or_else(PoisonError::into_inner);
        state.stop_requested = false;
        Ok(())
    }

    fn capture_output(&self, child: &mut Child) -> Result<Vec<JoinHandle<()>>, SupervisorError> {
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(Arc::clone(&self.shared), "stdout", stdout)?);
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(Arc::clone(&self.shared), "stderr", stderr)?);
        }
        Ok(readers)
    }

    fn record_start_failure(&self, error: SupervisorError) -> SupervisorError {
        self.shared.lock_state().last_error = Some(error.to_string());
        self.shared.reporter.daemon_start_failed(&error);
        error
    }
}

impl DaemonControl for ProcessSupervisor {
    fn restart(&self) -> Result<(), SupervisorError> {
        Self::restart(self)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: SUPERVISOR_TARGET, %error, "failed to stop bitcoind on drop");
        }
    }
}

fn spawn_reader<R>(
    shared: Arc<Shared>,
    stream: &'static str,
    pipe: R,
) -> Result<JoinHandle<()>, SupervisorError>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("bitcoind-{stream}"))
        .spawn(move || {
            for chunk in BufReader::new(pipe).split(b'\n') {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        warn!(target: SUPERVISOR_TARGET, stream, %error, "output capture failed");
                        break;
                    }
                };
                let text = String::from_utf8_lossy(&bytes);
                let line = text.trim();
                if line.is_empty() {
                    continue;
                }
                info!(target: DAEMON_LOG_TARGET, stream, "{line}");
                shared.lock_logs().push(line);
            }
        })
        .map_err(|source| SupervisorError::Thread {
            purpose: "output capture",
            source,
        })
}

fn watch_exit(
    shared: &Shared,
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    pid: u32,
    generation: u64,
) {
    let status = child.wait();
    // Drain remaining output so the captured lines are complete.
    for reader in readers {
        if reader.join().is_err() {
            warn!(target: SUPERVISOR_TARGET, pid, "output capture thread panicked");
        }
    }
    let (code, signal) = match status {
        Ok(status) => describe_exit(status),
        Err(error) => {
            warn!(target: SUPERVISOR_TARGET, pid, %error, "failed to collect exit status");
            (None, None)
        }
    };

    let mut state = shared.lock_state();
    if state
        .running
        .as_ref()
        .is_some_and(|process| process.generation == generation)
    {
        state.running = None;
    }
    if state.stop_requested {
        shared.reporter.daemon_stopped(pid);
    } else {
        let exit = ExitInfo {
            message: exit_message(code, signal.as_deref()),
            code,
            signal,
            logs: shared.lock_logs().snapshot(),
        };
        shared.reporter.daemon_crashed(pid, &exit);
        state.last_exit = Some(exit.clone());
        shared.hub.publish(DomainEvent::Exit(exit));
    }
    drop(state);
    shared.exited.notify_all();
}

fn abandon(child: &mut Child) {
    if let Err(error) = child.kill() {
        warn!(target: SUPERVISOR_TARGET, pid = child.id(), %error, "failed to kill bitcoind");
    }
    if let Err(error) = child.wait() {
        warn!(target: SUPERVISOR_TARGET, pid = child.id(), %error, "failed to reap bitcoind");
    }
}

fn signal_process(pid: u32, signal: Signal) {
    if let Err(error) = kill(Pid::from_raw(pid as i32), signal)
        && error != Errno::ESRCH
    {
        warn!(target: SUPERVISOR_TARGET, pid, %error, %signal, "failed to signal bitcoind");
    }
}
