//! Test suites for the supervisor daemon.

pub(crate) mod support;
