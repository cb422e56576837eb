//! Configuration loaders for bootstrap tests.

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;

use nodekeeper_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader pointing the data directory at a private temporary directory.
///
/// The node binary defaults to a path that does not exist; tests that need
/// a live process swap in a shell script with [`TestConfigLoader::with_binary`].
pub struct TestConfigLoader {
    dir: TempDir,
    binary: Utf8PathBuf,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary data directory"),
            binary: Utf8PathBuf::from("/nonexistent/nodekeeper-test/bitcoind"),
        }
    }

    /// Launches `binary` instead of the missing default.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<Utf8PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Directory used as the node data directory.
    pub fn data_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("bitcoin"))
            .expect("temporary directory path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            bitcoind_binary: self.binary.clone(),
            data_dir: self.data_dir(),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unparsable chain on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        use ortho_config::OrthoConfig as _;

        let args = vec![
            OsString::from("nodekeeperd"),
            OsString::from("--chain"),
            OsString::from("moonnet"),
        ];
        Config::load_from_iter(args)
    }
}

/// Writes an executable node stand-in into `dir` that answers `--version`
/// and then runs `body`.
pub fn node_script(dir: &Path, body: &str) -> Utf8PathBuf {
    let path = dir.join("bitcoind");
    let script = format!(
        "#!/bin/sh\n\
         if [ \"$1\" = \"--version\" ]; then echo 'Bitcoin Core version v27.1.0'; exit 0; fi\n\
         {body}\n"
    );
    fs::write(&path, script).expect("failed to write node script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark node script executable");
    Utf8PathBuf::from_path_buf(path).expect("script path was not valid UTF-8")
}
