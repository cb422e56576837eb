//! Description of how the node process ended.

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::sys::signal::Signal;

/// Exit code and terminating signal name of `status`.
pub(super) fn describe_exit(status: ExitStatus) -> (Option<i32>, Option<String>) {
    (status.code(), status.signal().map(signal_name))
}

/// Human-readable summary of an exit.
pub(super) fn exit_message(code: Option<i32>, signal: Option<&str>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("bitcoind exited with code {code}"),
        (None, Some(signal)) => format!("bitcoind was terminated by signal {signal}"),
        (None, None) => "bitcoind exited".to_owned(),
    }
}

fn signal_name(raw: i32) -> String {
    Signal::try_from(raw).map_or_else(|_| format!("signal {raw}"), |signal| signal.as_str().to_owned())
}
