use std::io::{BufRead, IsTerminal, Write};

use crate::config::Config;
use crate::error::OpsError;

/// Device login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of the credentials used for every device in a run
pub trait CredentialsProvider {
    fn credentials(&self) -> Result<Credentials, OpsError>;
}

/// Fixed credentials, already known
impl CredentialsProvider for Credentials {
    fn credentials(&self) -> Result<Credentials, OpsError> {
        Ok(self.clone())
    }
}

/// Credentials from `NET_USERNAME` / `NET_PASSWORD` (or `.env`)
pub struct EnvCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl EnvCredentials {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl CredentialsProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials, OpsError> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Ok(Credentials::new(user, pass)),
            _ => Err(OpsError::Credentials(
                "NET_USERNAME and NET_PASSWORD must both be set".to_string(),
            )),
        }
    }
}

fn prompt_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String, OpsError> {
    let io_err = |e: std::io::Error| OpsError::Credentials(format!("reading {}: {}", label, e));

    write!(output, "{}: ", label).map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut line = String::new();
    if input.read_line(&mut line).map_err(io_err)? == 0 {
        return Err(OpsError::Credentials(format!("no {} entered", label.to_lowercase())));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_username<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String, OpsError> {
    let username = prompt_line(input, output, "Username")?;
    if username.trim().is_empty() {
        return Err(OpsError::Credentials("username is empty".to_string()));
    }
    Ok(username.trim().to_string())
}

fn password_err(e: std::io::Error) -> OpsError {
    OpsError::Credentials(format!("reading Password: {}", e))
}

/// Ask for a username and password on `input`, writing prompts to `output`.
/// The password line is read without being echoed back to `output`.
pub fn prompt_credentials<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Credentials, OpsError> {
    let username = read_username(input, output)?;
    write!(output, "Password: ")
        .and_then(|_| output.flush())
        .map_err(password_err)?;
    let password = rpassword::read_password_from_bufread(input).map_err(password_err)?;
    Ok(Credentials::new(username, password))
}

/// Prompts on the process terminal. Stdin is locked only while prompting so
/// later confirmations can read it. On a tty the password is read with echo
/// off; piped stdin is read line by line.
pub struct TerminalCredentials;

impl CredentialsProvider for TerminalCredentials {
    fn credentials(&self) -> Result<Credentials, OpsError> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return prompt_credentials(&mut stdin.lock(), &mut std::io::stdout().lock());
        }
        let username = read_username(&mut stdin.lock(), &mut std::io::stdout().lock())?;
        let password = rpassword::prompt_password("Password: ").map_err(password_err)?;
        Ok(Credentials::new(username, password))
    }
}

/// Environment credentials when both are set, otherwise an interactive prompt
pub fn default_provider(cfg: &Config) -> Box<dyn CredentialsProvider> {
    let env = EnvCredentials::from_config(cfg);
    if env.is_complete() {
        tracing::debug!("Using credentials from environment");
        Box::new(env)
    } else {
        Box::new(TerminalCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_reads_username_and_password() {
        let mut out = Vec::new();
        let creds = prompt_credentials(&mut Cursor::new("admin\nS3cret pass\n"), &mut out).unwrap();
        assert_eq!(creds, Credentials::new("admin", "S3cret pass"));
    }

    #[test]
    fn test_prompt_writes_labels() {
        let mut out = Vec::new();
        prompt_credentials(&mut Cursor::new("admin\npw\n"), &mut out).unwrap();
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Username: "));
        assert!(shown.contains("Password: "));
    }

    #[test]
    fn test_prompt_does_not_echo_password() {
        let mut out = Vec::new();
        prompt_credentials(&mut Cursor::new("admin\nhunter2\n"), &mut out).unwrap();
        let shown = String::from_utf8(out).unwrap();
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_prompt_eof_is_an_error() {
        let err = prompt_credentials(&mut Cursor::new("admin\n"), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, OpsError::Credentials(_)));
    }

    #[test]
    fn test_prompt_rejects_blank_username() {
        let err = prompt_credentials(&mut Cursor::new("  \npw\n"), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("username is empty"));
    }

    #[test]
    fn test_env_credentials_need_both_values() {
        let mut cfg = Config::default();
        cfg.username = Some("admin".into());
        assert!(!EnvCredentials::from_config(&cfg).is_complete());
        assert!(EnvCredentials::from_config(&cfg).credentials().is_err());

        cfg.password = Some("pw".into());
        let creds = EnvCredentials::from_config(&cfg).credentials().unwrap();
        assert_eq!(creds.username, "admin");
    }

    #[test]
    fn test_debug_redacts_password() {
        let shown = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_default_provider_prefers_environment() {
        let mut cfg = Config::default();
        cfg.username = Some("svc".into());
        cfg.password = Some("pw".into());
        let creds = default_provider(&cfg).credentials().unwrap();
        assert_eq!(creds, Credentials::new("svc", "pw"));
    }
}
