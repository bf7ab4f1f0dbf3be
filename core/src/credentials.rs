use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::errors::CredentialError;

/// Supplies the bearer token and API host for Cortex Analyst calls.
///
/// How the token was obtained (password login, key pair, OAuth, a
/// container's session file) is outside this crate.
///
/// Called inline on the async request path before every call, so
/// implementations must return quickly and must not wait on the network.
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Token to present on the next request
    fn current_token(&self) -> Result<String, CredentialError>;

    /// Base URL including scheme, e.g. `https://myacct.snowflakecomputing.com`
    fn host(&self) -> String;
}

/// Derives the API host from a Snowflake account locator (`xy12345.eu-west-1`)
pub fn account_host(account: &str) -> String {
    format!("https://{}.snowflakecomputing.com", account.trim())
}

/// A token fixed for the life of the process
#[derive(Clone)]
pub struct StaticCredentials {
    host: String,
    token: String,
}

impl StaticCredentials {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn current_token(&self) -> Result<String, CredentialError> {
        if self.token.is_empty() {
            return Err(CredentialError::MissingToken);
        }
        Ok(self.token.clone())
    }

    fn host(&self) -> String {
        self.host.clone()
    }
}

/// Reads the token from a file on every call, so rotated tokens are picked up.
///
/// The read is a blocking `std::fs` call made from the async request path.
/// Token files are a few hundred bytes on local disk, and the client makes one
/// call at a time, so this does not stall the runtime noticeably.
#[derive(Debug, Clone)]
pub struct TokenFileCredentials {
    host: String,
    path: PathBuf,
}

impl TokenFileCredentials {
    pub fn new(host: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            path: path.into(),
        }
    }
}

impl CredentialProvider for TokenFileCredentials {
    fn current_token(&self) -> Result<String, CredentialError> {
        let display = self.path.display().to_string();
        let token = fs::read_to_string(&self.path).map_err(|source| CredentialError::TokenFile {
            path: display.clone(),
            source,
        })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyTokenFile(display));
        }
        Ok(token.to_string())
    }

    fn host(&self) -> String {
        self.host.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn account_host_uses_snowflake_domain() {
        assert_eq!(
            account_host("rnb41345.eu-west-1"),
            "https://rnb41345.eu-west-1.snowflakecomputing.com"
        );
    }

    #[test]
    fn static_credentials_hide_token_in_debug() {
        let creds = StaticCredentials::new("https://example.com/", "secret-token");
        assert_eq!(creds.host(), "https://example.com");
        assert_eq!(creds.current_token().unwrap(), "secret-token");
        assert!(!format!("{:?}", creds).contains("secret-token"));
    }

    #[test]
    fn empty_static_token_is_missing() {
        let creds = StaticCredentials::new("https://example.com", "");
        assert!(matches!(
            creds.current_token(),
            Err(CredentialError::MissingToken)
        ));
    }

    #[test]
    fn token_file_is_reread_each_call() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first-token").unwrap();
        let creds = TokenFileCredentials::new("https://example.com", file.path());
        assert_eq!(creds.current_token().unwrap(), "first-token");

        std::fs::write(file.path(), "second-token\n").unwrap();
        assert_eq!(creds.current_token().unwrap(), "second-token");

        std::fs::write(file.path(), "  \n").unwrap();
        assert!(matches!(
            creds.current_token(),
            Err(CredentialError::EmptyTokenFile(_))
        ));
    }

    #[test]
    fn missing_token_file_is_an_error() {
        let creds = TokenFileCredentials::new("https://example.com", "/nonexistent/token");
        assert!(matches!(
            creds.current_token(),
            Err(CredentialError::TokenFile { .. })
        ));
    }
}
