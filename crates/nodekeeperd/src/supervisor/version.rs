//! Identification of the node binary.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, warn};

use super::SUPERVISOR_TARGET;

const UNKNOWN: &str = "unknown";

/// Implementation name and semantic version reported by the node binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaemonVersion {
    /// Implementation name, for example `Bitcoin Core`.
    pub implementation: String,
    /// Dotted numeric version, for example `27.1.0`.
    pub version: String,
}

impl Default for DaemonVersion {
    fn default() -> Self {
        Self::unknown()
    }
}

impl DaemonVersion {
    /// Placeholder used when the binary cannot be identified.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            implementation: UNKNOWN.to_owned(),
            version: UNKNOWN.to_owned(),
        }
    }

    /// Returns `true` when this is the [`unknown`](Self::unknown) placeholder.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.version == UNKNOWN
    }

    /// Runs `program --version` and parses its first output line.
    ///
    /// Any failure yields [`DaemonVersion::unknown`].
    #[must_use]
    pub fn probe(program: &Path) -> Self {
        let output = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let output = match output {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    program = %program.display(),
                    %error,
                    "version probe failed"
                );
                return Self::unknown();
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = stdout.lines().next().and_then(Self::parse);
        if let Some(version) = parsed {
            debug!(
                target: SUPERVISOR_TARGET,
                implementation = %version.implementation,
                version = %version.version,
                "identified node binary"
            );
            version
        } else {
            warn!(
                target: SUPERVISOR_TARGET,
                program = %program.display(),
                "unrecognised version banner"
            );
            Self::unknown()
        }
    }

    /// Parses a banner such as `Bitcoin Core version v27.1.0`.
    #[must_use]
    pub fn parse(banner: &str) -> Option<Self> {
        let (implementation, rest) = banner.trim().split_once(" version ")?;
        let token = rest.split_whitespace().next()?;
        let token = token.strip_prefix('v').unwrap_or(token);
        let end = token
            .find(|character: char| !(character.is_ascii_digit() || character == '.'))
            .unwrap_or(token.len());
        let numeric = token.get(..end)?.trim_end_matches('.');
        let implementation = implementation.trim();
        if implementation.is_empty() || !numeric.starts_with(|character: char| character.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            implementation: implementation.to_owned(),
            version: numeric.to_owned(),
        })
    }
}
