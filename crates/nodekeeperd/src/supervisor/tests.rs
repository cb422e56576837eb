//! Lifecycle tests driving real child processes through `/bin/sh`.

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use nodekeeper_events::{DomainEvent, ExitInfo};
use rstest::{fixture, rstest};

use super::*;
use crate::events::EventHub;
use crate::tests::support::{HealthEvent, RecordingHealthReporter};

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);
const QUIET_PERIOD: Duration = Duration::from_millis(300);
const LONG_RUNNING: &str = "exec sleep 30";
const CRASHING: &str = "echo 'Bitcoin Core starting'; echo 'Loading block index...'; \
     echo 'Error: Corrupted block database detected' >&2; exit 3";

struct Harness {
    supervisor: ProcessSupervisor,
    reporter: Arc<RecordingHealthReporter>,
}

impl Harness {
    fn with_command(command: DaemonCommand) -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let supervisor = ProcessSupervisor::with_version(
            command,
            DaemonVersion::unknown(),
            Arc::new(EventHub::new()),
            Arc::clone(&reporter) as Arc<dyn HealthReporter>,
        );
        Self {
            supervisor,
            reporter,
        }
    }

    fn running(script: &str) -> Self {
        Self::with_command(DaemonCommand::new("/bin/sh").arg("-c").arg(script))
    }
}

#[fixture]
fn long_running() -> Harness {
    Harness::running(LONG_RUNNING)
}

#[fixture]
fn crashing() -> Harness {
    Harness::running(CRASHING)
}

fn next_exit(subscription: &Subscription) -> ExitInfo {
    loop {
        match subscription.next_timeout(EVENT_TIMEOUT) {
            Some(DomainEvent::Exit(exit)) => return exit,
            Some(_) => {}
            None => panic!("no exit event within {EVENT_TIMEOUT:?}"),
        }
    }
}

fn exit_events(events: &[DomainEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, DomainEvent::Exit(_)))
        .count()
}

#[rstest]
fn start_is_idempotent_while_running(long_running: Harness) {
    let supervisor = &long_running.supervisor;

    supervisor.start().expect("first start");
    let first = supervisor.status();
    supervisor.start().expect("second start");
    let second = supervisor.status();

    assert!(first.running);
    assert!(first.started_at.is_some());
    assert_eq!(first.pid, second.pid);
    supervisor.stop().expect("stop");
    assert!(!supervisor.status().running);
}

#[rstest]
fn requested_stop_emits_no_exit_event(long_running: Harness) {
    let supervisor = &long_running.supervisor;
    let subscription = supervisor.subscribe();

    supervisor.start().expect("start");
    supervisor.stop().expect("stop");
    std::thread::sleep(QUIET_PERIOD);

    let events = subscription.drain();
    assert_eq!(
        events.first(),
        Some(&DomainEvent::Snapshot {
            running: false,
            exit: None
        })
    );
    assert_eq!(exit_events(&events), 0, "unexpected events: {events:?}");
    assert_eq!(supervisor.last_exit(), None);
    let recorded = long_running.reporter.events();
    assert!(
        recorded
            .iter()
            .any(|event| matches!(event, HealthEvent::DaemonStopped(_))),
        "stop not reported: {recorded:?}"
    );
}

#[rstest]
fn stopping_an_idle_supervisor_is_a_no_op(long_running: Harness) {
    long_running.supervisor.stop().expect("idle stop");
    assert!(long_running.reporter.events().is_empty());
}

#[rstest]
fn unexpected_exit_publishes_captured_output(crashing: Harness) {
    let supervisor = &crashing.supervisor;
    let subscription = supervisor.subscribe();

    supervisor.start().expect("start");
    let exit = next_exit(&subscription);

    assert_eq!(exit.code, Some(3));
    assert_eq!(exit.signal, None);
    assert_eq!(exit.message, "bitcoind exited with code 3");
    for line in [
        "Bitcoin Core starting",
        "Loading block index...",
        "Error: Corrupted block database detected",
    ] {
        assert!(exit.logs.iter().any(|logged| logged == line), "missing {line:?}");
    }
    assert!(!supervisor.status().running);
    assert_eq!(supervisor.last_exit(), Some(exit));
    std::thread::sleep(QUIET_PERIOD);
    assert_eq!(exit_events(&subscription.drain()), 0, "exit reported twice");
}

#[rstest]
fn external_kill_is_reported_with_the_signal(long_running: Harness) {
    let supervisor = &long_running.supervisor;
    let subscription = supervisor.subscribe();
    supervisor.start().expect("start");
    let pid = supervisor.status().pid.expect("pid while running");

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).expect("kill child");
    let exit = next_exit(&subscription);

    assert_eq!(exit.code, None);
    assert_eq!(exit.signal.as_deref(), Some("SIGKILL"));
    assert_eq!(exit.message, "bitcoind was terminated by signal SIGKILL");
}

#[test]
fn spawn_failures_are_recorded_without_panicking() {
    let harness = Harness::with_command(DaemonCommand::new("/nonexistent/nodekeeper/bitcoind"));

    let error = harness.supervisor.start().expect_err("spawn should fail");

    assert!(matches!(error, SupervisorError::Spawn { .. }));
    let status = harness.supervisor.status();
    assert!(!status.running);
    assert!(status.last_error.is_some_and(|message| message.contains("failed to spawn")));
    assert!(
        harness
            .reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::DaemonStartFailed(_)))
    );
}

#[rstest]
fn restart_replaces_the_process_silently(long_running: Harness) {
    let supervisor = &long_running.supervisor;
    let subscription = supervisor.subscribe();
    supervisor.start().expect("start");
    let before = supervisor.status().pid;

    DaemonControl::restart(supervisor).expect("restart");
    let after = supervisor.status();

    assert!(after.running);
    assert_ne!(after.pid, before);
    std::thread::sleep(QUIET_PERIOD);
    assert_eq!(exit_events(&subscription.drain()), 0);
    supervisor.stop().expect("stop");
}

#[rstest]
fn late_subscribers_receive_the_last_exit(crashing: Harness) {
    let supervisor = &crashing.supervisor;
    let early = supervisor.subscribe();
    supervisor.start().expect("start");
    let exit = next_exit(&early);

    let late = supervisor.subscribe();
    assert_eq!(
        late.try_next(),
        Some(DomainEvent::Snapshot {
            running: false,
            exit: Some(exit)
        })
    );

    supervisor.clear_last_exit();
    let acknowledged = supervisor.subscribe();
    assert_eq!(
        acknowledged.try_next(),
        Some(DomainEvent::Snapshot {
            running: false,
            exit: None
        })
    );
}

#[rstest]
fn captured_output_is_reset_for_each_run(crashing: Harness) {
    let supervisor = &crashing.supervisor;
    let subscription = supervisor.subscribe();

    supervisor.start().expect("first start");
    next_exit(&subscription);
    supervisor.start().expect("second start");
    let second = next_exit(&subscription);

    let repeats = second
        .logs
        .iter()
        .filter(|line| line.as_str() == "Loading block index...")
        .count();
    assert_eq!(repeats, 1, "logs leaked across runs: {:?}", second.logs);
}
