//! In-memory transport for tests: canned command outputs per host, hosts
//! that always fail, and a record of everything sent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::DeviceTransport;
use crate::credentials::Credentials;
use crate::error::OpsError;
use crate::models::Host;

#[derive(Default)]
struct Inner {
    outputs: HashMap<(String, String), String>,
    failing: HashSet<String>,
    commands: Vec<(String, String)>,
    configs: Vec<(String, Vec<String>)>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output returned when `host` runs `command`. Unknown commands return "".
    pub fn with_output(self, host: &str, command: &str, output: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .outputs
            .insert((host.to_string(), command.to_string()), output.to_string());
        self
    }

    /// Every request to `host` fails with a connection error
    pub fn with_failure(self, host: &str) -> Self {
        self.inner.lock().unwrap().failing.insert(host.to_string());
        self
    }

    /// (host, command) pairs in the order they were run
    pub fn commands(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().commands.clone()
    }

    /// (host, lines) for every configuration push
    pub fn configs(&self) -> Vec<(String, Vec<String>)> {
        self.inner.lock().unwrap().configs.clone()
    }
}

#[async_trait]
impl DeviceTransport for MockTransport {
    async fn send_commands(
        &self,
        host: &Host,
        _creds: &Credentials,
        commands: &[&str],
    ) -> Result<Vec<String>, OpsError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(&host.name) {
            return Err(OpsError::connection(&host.name, "connection refused"));
        }
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            inner.commands.push((host.name.clone(), command.to_string()));
            outputs.push(
                inner
                    .outputs
                    .get(&(host.name.clone(), command.to_string()))
                    .cloned()
                    .unwrap_or_default(),
            );
        }
        Ok(outputs)
    }

    async fn send_config(
        &self,
        host: &Host,
        _creds: &Credentials,
        lines: &[String],
    ) -> Result<String, OpsError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(&host.name) {
            return Err(OpsError::connection(&host.name, "connection refused"));
        }
        inner.configs.push((host.name.clone(), lines.to_vec()));
        Ok(format!("{}(config)#end\n", host.name))
    }
}
