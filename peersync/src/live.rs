//! Live interface synchronization
//!
//! Mirrors peer additions and removals onto the running interface. The
//! gateway configuration file stays the source of truth: nothing here can
//! fail an operation, every problem degrades to [`SyncOutcome::Skipped`] or
//! [`SyncOutcome::Warned`].

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Result of a live-interface call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Running interface updated
    Applied,
    /// Interface not running; the change takes effect when it comes up
    Skipped {
        /// What the operator should know
        reason: String,
    },
    /// Interface running but the update failed
    Warned {
        /// Failure description
        reason: String,
        /// Command that brings the interface in line with the config file
        remediation: String,
    },
}

/// Peer as pushed to the running interface
#[derive(Debug, Clone)]
pub struct LivePeer<'a> {
    /// Client public key
    pub public_key: &'a str,
    /// Preshared key
    pub preshared_key: &'a str,
    /// Client IPv4 address
    pub ipv4: Ipv4Addr,
    /// Client IPv6 address
    pub ipv6: Ipv6Addr,
}

/// Live interface control collaborator
#[async_trait]
pub trait LiveInterface: Send + Sync {
    /// Add or update a peer on the running interface
    async fn apply(&self, peer: &LivePeer<'_>) -> SyncOutcome;

    /// Remove a peer from the running interface
    async fn retract(&self, public_key: &str) -> SyncOutcome;
}

#[derive(Debug, Error)]
enum CommandError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// How `wg show` reports an interface that does not exist
const NO_SUCH_DEVICE: &str = "No such device";

/// `wg(8)` based implementation
#[derive(Debug, Clone)]
pub struct WgCommand {
    interface: String,
    command: Vec<String>,
    timeout: Duration,
}

impl WgCommand {
    /// Control `interface` through `wg`
    pub fn new(interface: &str, timeout: Duration) -> Self {
        Self {
            interface: interface.to_string(),
            command: vec!["wg".to_string()],
            timeout,
        }
    }

    /// Use a different command line for `wg`, e.g. `["sudo", "wg"]`.
    /// An empty command keeps the current one.
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        if !command.is_empty() {
            self.command = command;
        }
        self
    }

    fn remediation(&self) -> String {
        format!(
            "wg syncconf {0} <(wg-quick strip {0})",
            self.interface
        )
    }

    fn warned(&self, reason: impl Into<String>) -> SyncOutcome {
        SyncOutcome::Warned {
            reason: reason.into(),
            remediation: self.remediation(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output, CommandError> {
        let program = self.command[0].clone();
        let mut cmd = Command::new(&program);
        cmd.args(&self.command[1..])
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!("Running {} {}", self.command.join(" "), args.join(" "));

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(CommandError::Spawn { program, source }),
            Err(_) => Err(CommandError::TimedOut {
                program,
                timeout: self.timeout,
            }),
        }
    }

    /// `Err` carries the outcome to report when there is nothing to update
    async fn check_active(&self) -> Result<(), SyncOutcome> {
        match self.run(&["show", &self.interface]).await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if stderr.contains(NO_SUCH_DEVICE) {
                    Err(SyncOutcome::Skipped {
                        reason: format!(
                            "interface {0} is not active, the change takes effect on `wg-quick up {0}`",
                            self.interface
                        ),
                    })
                } else {
                    Err(self.warned(format!(
                        "could not inspect interface {} ({}): {}",
                        self.interface,
                        output.status,
                        stderr.trim()
                    )))
                }
            }
            Err(e @ CommandError::Spawn { .. }) => Err(SyncOutcome::Skipped {
                reason: format!(
                    "{e}, the change takes effect on `wg-quick up {}`",
                    self.interface
                ),
            }),
            Err(e @ CommandError::TimedOut { .. }) => Err(self.warned(e.to_string())),
        }
    }

    fn outcome(&self, result: Result<Output, CommandError>) -> SyncOutcome {
        match result {
            Ok(output) if output.status.success() => SyncOutcome::Applied,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                self.warned(format!(
                    "wg exited with {}: {}",
                    output.status,
                    stderr.trim()
                ))
            }
            Err(e) => self.warned(e.to_string()),
        }
    }
}

#[async_trait]
impl LiveInterface for WgCommand {
    async fn apply(&self, peer: &LivePeer<'_>) -> SyncOutcome {
        if let Err(outcome) = self.check_active().await {
            return outcome;
        }

        // wg only reads preshared keys from files
        let psk_file = match tempfile::NamedTempFile::new().and_then(|mut f| {
            writeln!(f, "{}", peer.preshared_key)?;
            f.flush()?;
            Ok(f)
        }) {
            Ok(f) => f,
            Err(e) => return self.warned(format!("could not stage preshared key: {e}")),
        };
        let psk_path = psk_file.path().to_string_lossy().into_owned();
        let allowed_ips = format!("{}/32,{}/128", peer.ipv4, peer.ipv6);

        let result = self
            .run(&[
                "set",
                &self.interface,
                "peer",
                peer.public_key,
                "preshared-key",
                &psk_path,
                "allowed-ips",
                &allowed_ips,
            ])
            .await;
        self.outcome(result)
    }

    async fn retract(&self, public_key: &str) -> SyncOutcome {
        if let Err(outcome) = self.check_active().await {
            return outcome;
        }
        let result = self
            .run(&["set", &self.interface, "peer", public_key, "remove"])
            .await;
        self.outcome(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn peer() -> LivePeer<'static> {
        LivePeer {
            public_key: "cHVi",
            preshared_key: "cHNr",
            ipv4: Ipv4Addr::new(10, 2, 53, 2),
            ipv6: "fd42:42:42::2".parse().unwrap(),
        }
    }

    /// `wg` stand-in: `sh -c <script> wg <args...>`
    fn fake_wg(script: &str, timeout: Duration) -> WgCommand {
        WgCommand::new("wg0", timeout).with_command(vec![
            "sh".into(),
            "-c".into(),
            script.into(),
            "wg".into(),
        ])
    }

    #[tokio::test]
    async fn test_applied_when_active() {
        let wg = fake_wg("exit 0", Duration::from_secs(5));
        assert_eq!(wg.apply(&peer()).await, SyncOutcome::Applied);
        assert_eq!(wg.retract("cHVi").await, SyncOutcome::Applied);
    }

    const INACTIVE: &str = r#"echo "Unable to access interface: No such device" >&2; exit 1"#;

    #[tokio::test]
    async fn test_skipped_when_inactive() {
        let wg = fake_wg(INACTIVE, Duration::from_secs(5));
        assert!(matches!(wg.apply(&peer()).await, SyncOutcome::Skipped { .. }));
        assert!(matches!(wg.retract("cHVi").await, SyncOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_warned_when_show_is_denied() {
        let wg = fake_wg(
            r#"echo "Unable to access interface: Operation not permitted" >&2; exit 1"#,
            Duration::from_secs(5),
        );
        match wg.apply(&peer()).await {
            SyncOutcome::Warned { reason, remediation } => {
                assert!(reason.contains("Operation not permitted"));
                assert_eq!(remediation, "wg syncconf wg0 <(wg-quick strip wg0)");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(wg.retract("cHVi").await, SyncOutcome::Warned { .. }));
    }

    #[tokio::test]
    async fn test_skipped_when_wg_missing() {
        let wg = WgCommand::new("wg0", Duration::from_secs(5))
            .with_command(vec!["/nonexistent/bin/wg".into()]);
        assert!(matches!(wg.apply(&peer()).await, SyncOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_warned_when_set_fails() {
        let wg = fake_wg(
            r#"if [ "$1" = show ]; then exit 0; fi; echo "Unable to modify interface" >&2; exit 1"#,
            Duration::from_secs(5),
        );
        match wg.apply(&peer()).await {
            SyncOutcome::Warned { reason, remediation } => {
                assert!(reason.contains("Unable to modify interface"));
                assert_eq!(remediation, "wg syncconf wg0 <(wg-quick strip wg0)");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_warned_on_timeout() {
        let wg = fake_wg(
            r#"if [ "$1" = show ]; then exit 0; fi; sleep 5"#,
            Duration::from_millis(300),
        );
        match wg.retract("cHVi").await {
            SyncOutcome::Warned { reason, .. } => assert!(reason.contains("did not finish")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_passes_peer_arguments() {
        let wg = fake_wg(
            r#"if [ "$1" = show ]; then exit 0; fi; [ "$2" = wg0 ] && [ "$4" = cHVi ] && [ "$5" = preshared-key ] && [ "$(cat "$6")" = cHNr ] && [ "$8" = "10.2.53.2/32,fd42:42:42::2/128" ]"#,
            Duration::from_secs(5),
        );
        assert_eq!(wg.apply(&peer()).await, SyncOutcome::Applied);
    }
}
