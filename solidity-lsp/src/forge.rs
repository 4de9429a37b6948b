//! Running Foundry tests
//!
//! Each run is keyed by `Contract::test` (or `Contract` for a whole contract). Starting a
//! run kills any process still running under the same key and waits until it is gone,
//! so at most one run per key is in flight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::{Mutex, oneshot};

/// What to run, as carried in the code lens command arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTarget {
    pub path: PathBuf,
    pub contract: String,
    /// A single test function, or every test of the contract when absent.
    pub test: Option<String>,
}

impl TestTarget {
    #[must_use]
    pub fn key(&self) -> String {
        match &self.test {
            Some(test) => format!("{}::{test}", self.contract),
            None => self.contract.clone(),
        }
    }

    /// Arguments to `forge` for this target, with the path relative to `root` when possible.
    #[must_use]
    pub fn args(&self, root: &Path) -> Vec<String> {
        let path = self.path.strip_prefix(root).unwrap_or(&self.path);
        let mut args = vec![
            "test".to_string(),
            "--match-path".to_string(),
            path.display().to_string(),
            "--match-contract".to_string(),
            format!("^{}$", self.contract),
        ];
        if let Some(test) = &self.test {
            args.push("--match-test".to_string());
            args.push(format!("^{test}$"));
        }
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    /// Killed because another run with the same key started.
    Cancelled,
}

/// Asks a run to stop. The run answers on the carried sender once its process is dead.
type KillRequest = oneshot::Sender<oneshot::Sender<()>>;

#[derive(Debug, Default)]
pub struct ForgeRunner {
    running: Mutex<HashMap<String, KillRequest>>,
}

impl ForgeRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `forge test` for `target` in `root`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] when the forge binary cannot be started.
    pub async fn run(
        &self,
        forge_path: &str,
        root: &Path,
        target: &TestTarget,
    ) -> Result<TestOutcome, crate::Error> {
        let mut command = Command::new(forge_path);
        command.current_dir(root).args(target.args(root));
        tracing::info!(key = %target.key(), "running {forge_path} {:?}", target.args(root));
        self.run_command(target.key(), forge_path, command).await
    }

    pub(crate) async fn run_command(
        &self,
        key: String,
        program: &str,
        mut command: Command,
    ) -> Result<TestOutcome, crate::Error> {
        let (kill, killed) = oneshot::channel();
        let previous = self.running.lock().await.insert(key.clone(), kill);
        if let Some(previous) = previous {
            let (stopped, wait_stopped) = oneshot::channel();
            // The previous run may already be gone.
            if previous.send(stopped).is_ok() {
                let _ = wait_stopped.await;
                tracing::debug!(%key, "previous run stopped");
            }
        }
        let spawned = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let outcome = match spawned {
            Ok(mut child) => {
                tokio::select! {
                    status = child.wait() => status
                        .map(|status| if status.success() { TestOutcome::Passed } else { TestOutcome::Failed })
                        .map_err(|e| crate::Error::io(program, e)),
                    Ok(stopped) = killed => {
                        if let Err(e) = child.kill().await {
                            tracing::warn!(%key, "cannot kill previous run: {e}");
                        }
                        let _ = stopped.send(());
                        Ok(TestOutcome::Cancelled)
                    }
                }
            }
            Err(e) => {
                drop(killed);
                Err(crate::Error::io(program, e))
            }
        };
        let mut running = self.running.lock().await;
        // A newer run under the same key still has its receiver.
        if running.get(&key).is_some_and(oneshot::Sender::is_closed) {
            running.remove(&key);
        }
        outcome
    }

    pub async fn is_running(&self, key: &str) -> bool {
        self.running.lock().await.contains_key(key)
    }
}
