use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tracing::{debug, trace, warn};

use crate::collector::CollectError;
use crate::config::HostKeyPolicy;
use crate::endpoint::SshTarget;

use super::RemoteShell;

/// Decides whether the server's host key is trusted.
struct HostKeyCheck {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::KnownHosts { path } => {
                match russh_keys::check_known_hosts_path(
                    &self.host,
                    self.port,
                    server_public_key,
                    path,
                ) {
                    Ok(known) => {
                        if !known {
                            warn!(host = %self.host, "host key not found in known hosts");
                        }
                        Ok(known)
                    }
                    Err(e) => {
                        warn!(host = %self.host, "host key rejected: {e}");
                        Ok(false)
                    }
                }
            }
        }
    }
}

/// An authenticated SSH connection. Every command gets its own channel.
pub struct SshSession {
    handle: Handle<HostKeyCheck>,
}

impl SshSession {
    pub async fn connect(target: &SshTarget, policy: &HostKeyPolicy) -> Result<Self, CollectError> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let handler = HostKeyCheck {
            host: target.host.clone(),
            port: target.port,
            policy: policy.clone(),
        };

        let mut handle = client::connect(config, (target.host.as_str(), target.port), handler)
            .await
            .map_err(|e| CollectError::Ssh(e.to_string()))?;

        let authenticated = handle
            .authenticate_password(target.user.clone(), target.password.clone())
            .await
            .map_err(|e| CollectError::Ssh(e.to_string()))?;
        if !authenticated {
            return Err(CollectError::Auth(target.user.clone()));
        }

        debug!(host = %target.host, "ssh session established");
        Ok(Self { handle })
    }

    pub async fn close(self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            trace!("ssh disconnect: {e}");
        }
    }
}

#[async_trait]
impl RemoteShell for SshSession {
    async fn run(&mut self, command: &str) -> Result<String, CollectError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| CollectError::Ssh(e.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| CollectError::Ssh(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, .. } => {
                    trace!("`{command}` stderr: {}", String::from_utf8_lossy(data).trim());
                }
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        match exit_status {
            Some(0) | None => Ok(String::from_utf8_lossy(&stdout).into_owned()),
            Some(code) => Err(CollectError::Command(format!(
                "`{command}` exited with status {code}"
            ))),
        }
    }
}
