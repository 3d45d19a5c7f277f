use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;

use super::DeviceTransport;
use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::OpsError;
use crate::models::Host;

/// Device responses that mean a configuration line was not accepted
const REJECTION_MARKERS: [&str; 3] = ["% Invalid", "% Incomplete", "% Ambiguous"];

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// SshTransport talks to IOS devices over SSH (libssh2). All session work is
/// blocking and runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct SshTransport {
    port: u16,
    timeout_secs: u64,
}

impl SshTransport {
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self { port, timeout_secs }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.ssh_port, cfg.ssh_timeout_secs)
    }
}

/// Open an authenticated session, trying password then keyboard-interactive
fn connect(address: &str, port: u16, creds: &Credentials, timeout_secs: u64) -> Result<ssh2::Session, String> {
    let timeout = Duration::from_secs(timeout_secs);
    let addr = (address, port)
        .to_socket_addrs()
        .map_err(|e| format!("cannot resolve {}: {}", address, e))?
        .next()
        .ok_or_else(|| format!("no address for {}", address))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| format!("TCP connection failed: {}", e))?;
    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new().map_err(|e| format!("failed to create SSH session: {}", e))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session
        .handshake()
        .map_err(|e| format!("SSH handshake failed: {}", e))?;

    if session.userauth_password(&creds.username, &creds.password).is_ok() && session.authenticated() {
        return Ok(session);
    }

    let mut prompter = PasswordPrompt {
        password: creds.password.clone(),
    };
    let _ = session.userauth_keyboard_interactive(&creds.username, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err("SSH authentication failed: all methods exhausted".to_string())
    }
}

/// Run each command on a fresh session. IOS closes the session after the
/// first exec channel, so channels are never reused.
fn exec_each<S, O, E>(commands: &[String], mut open: O, mut exec: E) -> Result<Vec<String>, String>
where
    O: FnMut() -> Result<S, String>,
    E: FnMut(&S, &str) -> Result<String, String>,
{
    commands
        .iter()
        .map(|command| {
            let session = open()?;
            exec(&session, command)
        })
        .collect()
}

/// Run one command on its own exec channel
fn exec_on_session(session: &ssh2::Session, command: &str) -> Result<String, String> {
    let mut channel = session
        .channel_session()
        .map_err(|e| format!("failed to open channel: {}", e))?;
    channel
        .exec(command)
        .map_err(|e| format!("failed to execute '{}': {}", command, e))?;

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(|e| format!("failed to read output of '{}': {}", command, e))?;
    let _ = channel.wait_close();

    Ok(output)
}

/// Lines written to an interactive shell to apply `lines`
fn config_script(lines: &[String]) -> String {
    let mut script = String::from("terminal length 0\nconfigure terminal\n");
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str("end\nexit\n");
    script
}

fn rejected_line(transcript: &str) -> Option<&str> {
    transcript
        .lines()
        .find(|line| REJECTION_MARKERS.iter().any(|m| line.trim_start().starts_with(m)))
}

/// IOS rejects config over exec channels, so push through a PTY shell
fn push_config(session: &ssh2::Session, lines: &[String]) -> Result<String, String> {
    let mut channel = session
        .channel_session()
        .map_err(|e| format!("failed to open channel: {}", e))?;
    channel
        .request_pty("vt100", None, None)
        .map_err(|e| format!("failed to request PTY: {}", e))?;
    channel.shell().map_err(|e| format!("failed to start shell: {}", e))?;

    channel
        .write_all(config_script(lines).as_bytes())
        .and_then(|_| channel.flush())
        .map_err(|e| format!("failed to send configuration: {}", e))?;
    let _ = channel.send_eof();

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match channel.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
            // Some devices keep the shell open after `exit`
            Err(e) if e.kind() == ErrorKind::TimedOut && !raw.is_empty() => break,
            Err(e) => return Err(format!("failed to read session output: {}", e)),
        }
    }
    let _ = channel.wait_close();

    let transcript = String::from_utf8_lossy(&raw).into_owned();
    if let Some(line) = rejected_line(&transcript) {
        return Err(format!("device rejected configuration: {}", line.trim()));
    }
    Ok(transcript)
}

#[async_trait]
impl DeviceTransport for SshTransport {
    async fn send_commands(
        &self,
        host: &Host,
        creds: &Credentials,
        commands: &[&str],
    ) -> Result<Vec<String>, OpsError> {
        let address = host.address.clone();
        let port = self.port;
        let timeout_secs = self.timeout_secs;
        let creds = creds.clone();
        let commands: Vec<String> = commands.iter().map(|c| c.to_string()).collect();

        tracing::debug!("{}: running {} commands on {}", host.name, commands.len(), address);

        tokio::task::spawn_blocking(move || {
            exec_each(
                &commands,
                || connect(&address, port, &creds, timeout_secs),
                exec_on_session,
            )
        })
        .await
        .map_err(|e| OpsError::connection(&host.name, format!("task join error: {}", e)))?
        .map_err(|reason| OpsError::connection(&host.name, reason))
    }

    async fn send_config(
        &self,
        host: &Host,
        creds: &Credentials,
        lines: &[String],
    ) -> Result<String, OpsError> {
        let address = host.address.clone();
        let port = self.port;
        let timeout_secs = self.timeout_secs;
        let creds = creds.clone();
        let lines = lines.to_vec();

        tracing::debug!("{}: pushing {} config lines to {}", host.name, lines.len(), address);

        tokio::task::spawn_blocking(move || {
            let session = connect(&address, port, &creds, timeout_secs)?;
            push_config(&session, &lines)
        })
        .await
        .map_err(|e| OpsError::connection(&host.name, format!("task join error: {}", e)))?
        .map_err(|reason| OpsError::connection(&host.name, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_script_wraps_lines() {
        let lines = vec![
            "ip dhcp snooping".to_string(),
            String::new(),
            "interface Gi1/0/1".to_string(),
            " ip dhcp snooping trust".to_string(),
        ];
        assert_eq!(
            config_script(&lines),
            "terminal length 0\nconfigure terminal\nip dhcp snooping\ninterface Gi1/0/1\n ip dhcp snooping trust\nend\nexit\n"
        );
    }

    #[test]
    fn test_rejected_line_detection() {
        let ok = "sw1(config)#ip dhcp snooping\nsw1(config)#end\n";
        assert_eq!(rejected_line(ok), None);

        let bad = "sw1(config)#ip dhcp snoping\n                ^\n% Invalid input detected at '^' marker.\n";
        assert_eq!(
            rejected_line(bad),
            Some("% Invalid input detected at '^' marker.")
        );
    }

    #[test]
    fn test_exec_each_opens_a_session_per_command() {
        let commands: Vec<String> = ["show cdp neighbors detail", "show vlan", "show etherchannel summary"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mut opened = 0;

        let outputs = exec_each(
            &commands,
            || {
                opened += 1;
                Ok(opened)
            },
            |session: &i32, command: &str| Ok(format!("{}:{}", session, command)),
        )
        .unwrap();

        assert_eq!(opened, 3);
        assert_eq!(
            outputs,
            vec![
                "1:show cdp neighbors detail".to_string(),
                "2:show vlan".to_string(),
                "3:show etherchannel summary".to_string(),
            ]
        );
    }

    #[test]
    fn test_exec_each_stops_at_first_failure() {
        let commands = vec!["show vlan".to_string(), "show version".to_string()];
        let mut opened = 0;

        let err = exec_each(
            &commands,
            || {
                opened += 1;
                Ok(())
            },
            |_: &(), _: &str| Err("channel closed".to_string()),
        )
        .unwrap_err();

        assert_eq!(err, "channel closed");
        assert_eq!(opened, 1);
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_connection_error() {
        let transport = SshTransport::new(22, 1);
        let host = Host {
            name: "ghost".into(),
            address: "host.invalid".into(),
            groups: vec![],
        };
        let err = transport
            .send_commands(&host, &Credentials::new("u", "p"), &["show version"])
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Connection { ref host, .. } if host == "ghost"));
    }
}
