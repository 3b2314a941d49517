use anyhow::{bail, Context, Result};
use std::process::Command;

/// Source of bearer tokens for the edit service
pub trait CredentialSource {
    /// Fetch a currently valid access token. May perform I/O.
    fn access_token(&self) -> Result<String>;
}

/// A fixed token, e.g. passed on the command line
pub struct StaticToken(pub String);

impl CredentialSource for StaticToken {
    fn access_token(&self) -> Result<String> {
        non_empty(self.0.clone(), "static token")
    }
}

/// Reads the token from an environment variable on every request
pub struct EnvToken {
    pub var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvToken {
    fn access_token(&self) -> Result<String> {
        let token = std::env::var(&self.var)
            .with_context(|| format!("Environment variable {} is not set", self.var))?;
        non_empty(token, &self.var)
    }
}

/// Runs a command and uses its trimmed stdout as the token,
/// e.g. `gcloud auth print-access-token`
pub struct CommandToken {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandToken {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Application-default credentials via the gcloud CLI
    pub fn gcloud() -> Self {
        Self::new("gcloud", &["auth", "print-access-token"])
    }
}

impl CredentialSource for CommandToken {
    fn access_token(&self) -> Result<String> {
        tracing::debug!("Requesting access token from {}", self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let token = String::from_utf8(output.stdout)
            .with_context(|| format!("{} printed a non-UTF-8 token", self.program))?;
        non_empty(token, &self.program)
    }
}

fn non_empty(token: String, source: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        bail!("{} produced an empty access token", source);
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_is_trimmed() {
        assert_eq!(StaticToken(" abc \n".into()).access_token().unwrap(), "abc");
        assert!(StaticToken("   ".into()).access_token().is_err());
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let source = EnvToken::new("MASKEDIT_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(source.access_token().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn command_token_uses_stdout() {
        let source = CommandToken::new("echo", &["token-123"]);
        assert_eq!(source.access_token().unwrap(), "token-123");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_an_error() {
        let source = CommandToken::new("false", &[]);
        assert!(source.access_token().is_err());
    }
}
