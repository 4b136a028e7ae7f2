//! Credential values that must never reach the logs.

use secrecy::{ExposeSecret, SecretString};

/// An API token with automatic memory zeroing on drop.
///
/// Debug and Display output show `[REDACTED]`; the value is only reachable
/// through [`Token::expose`].
#[derive(Clone)]
pub struct Token {
    inner: SecretString,
}

impl Token {
    /// Wrap a token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Wrap an input value, treating blank input as absent.
    #[must_use]
    pub fn from_input(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self::new(value))
        }
    }

    /// Expose the token for use.
    ///
    /// The caller must not log or persist the returned value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let token = Token::new("ghp_secret");
        assert_eq!(format!("{token:?}"), "[REDACTED]");
        assert_eq!(token.to_string(), "[REDACTED]");
        assert_eq!(token.expose(), "ghp_secret");
    }

    #[test]
    fn test_from_input_blank_is_none() {
        assert!(Token::from_input("").is_none());
        assert!(Token::from_input("   ").is_none());
        assert_eq!(Token::from_input(" abc \n").unwrap().expose(), "abc");
    }
}
