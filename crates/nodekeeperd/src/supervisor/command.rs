//! Command line used to launch the node.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use nodekeeper_config::Config;

/// Program and arguments for the supervised node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl DaemonCommand {
    /// Builds a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Builds the node command line from the supervisor configuration.
    ///
    /// The data directory, chain, control credentials, and notification
    /// endpoints are always passed explicitly so they cannot drift from
    /// what the rest of the supervisor expects.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bitcoind_binary.as_std_path())
            .arg(format!("-datadir={}", config.data_dir))
            .arg(format!("-chain={}", config.chain))
            .arg(format!("-rpcuser={}", config.rpc_user))
            .arg(format!("-rpcpassword={}", config.rpc_password))
            .arg(format!("-rpcport={}", config.rpc_port))
            .arg(format!("-zmqpubhashblock={}", config.zmq_block_endpoint))
            .arg(format!("-zmqpubhashtx={}", config.zmq_tx_endpoint))
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }
}
