// # cfnat Discovery Source
//
// Spawns the cfnat address-discovery subprocess and exposes its stdout
// as the line stream the engine consumes.
//
// ## Lifecycle
//
// The source owns the child process handle. `shutdown()` forwards
// termination to the child, best effort; in-flight output is dropped.
// The child is additionally killed on drop so an aborted daemon does
// not leak the scanner.
//
// ## Output
//
// Whatever cfnat prints: free-form, locale-specific log lines. No
// parsing happens here; the source is plumbing, not logic. stderr is
// inherited so operator-facing diagnostics stay visible on the
// console.

use std::pin::Pin;
use std::process::Stdio;

use async_trait::async_trait;
use cfsync_core::error::{Error, Result};
use cfsync_core::traits::DiscoverySource;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};

/// Discovery source backed by a spawned cfnat process
pub struct CfnatSource {
    child: Child,
    stdout: Option<ChildStdout>,
}

impl CfnatSource {
    /// Spawn the discovery program with pass-through arguments
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        tracing::info!("spawning discovery process: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::discovery(format!("failed to spawn {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::discovery("child stdout was not captured"))?;

        Ok(Self {
            child,
            stdout: Some(stdout),
        })
    }

    /// Process id of the child, if still running
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[async_trait]
impl DiscoverySource for CfnatSource {
    fn lines(&mut self) -> Pin<Box<dyn Stream<Item = String> + Send + 'static>> {
        let Some(stdout) = self.stdout.take() else {
            tracing::warn!("discovery line stream already taken, yielding empty stream");
            return Box::pin(tokio_stream::empty());
        };

        let lines = BufReader::new(stdout).lines();
        Box::pin(LinesStream::new(lines).filter_map(|line| line.ok()))
    }

    async fn shutdown(&mut self) -> Result<()> {
        match self.child.kill().await {
            Ok(()) => {
                tracing::info!("discovery process terminated");
                Ok(())
            }
            Err(e) => {
                // Already-exited children are not an error worth surfacing.
                tracing::debug!("discovery process kill: {}", e);
                Ok(())
            }
        }
    }
}
