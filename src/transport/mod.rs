//! Device communication: the transport seam, and bounded fan-out of one task
//! across many hosts.

#[cfg(test)]
pub mod mock;
pub mod ssh;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::credentials::Credentials;
use crate::error::OpsError;
use crate::models::Host;

pub use ssh::SshTransport;

/// DeviceTransport sends show commands and configuration to a device
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Run each command and return the outputs in command order
    async fn send_commands(
        &self,
        host: &Host,
        creds: &Credentials,
        commands: &[&str],
    ) -> Result<Vec<String>, OpsError>;

    /// Apply configuration lines in configuration mode, returning the session
    /// transcript
    async fn send_config(
        &self,
        host: &Host,
        creds: &Credentials,
        lines: &[String],
    ) -> Result<String, OpsError>;
}

/// Per-host result of a fan-out, in host order
pub type HostResults<T> = Vec<(String, Result<T, OpsError>)>;

/// Run `task` for every host, at most `workers` at a time. One host failing
/// (or panicking) never affects the others.
pub async fn run_on_hosts<T, F, Fut>(hosts: &[Host], workers: usize, task: F) -> HostResults<T>
where
    T: Send + 'static,
    F: Fn(Host) -> Fut,
    Fut: Future<Output = Result<T, OpsError>> + Send + 'static,
{
    let limit = Arc::new(Semaphore::new(workers.max(1)));

    let handles: Vec<_> = hosts
        .iter()
        .map(|host| {
            let limit = limit.clone();
            let name = host.name.clone();
            let fut = task(host.clone());
            tokio::spawn(async move {
                let _permit = limit
                    .acquire_owned()
                    .await
                    .map_err(|e| OpsError::connection(&name, format!("worker pool closed: {}", e)))?;
                fut.await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(hosts.len());
    for (host, handle) in hosts.iter().zip(handles) {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(OpsError::connection(&host.name, format!("task error: {}", e))),
        };
        if let Err(e) = &result {
            tracing::warn!("{}: {}", host.name, e);
        }
        results.push((host.name.clone(), result));
    }
    results
}
