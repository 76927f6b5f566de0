//! CSRF token issuance and holding.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use crate::platform::RandomSource;
use crate::security::types::SecurityError;

/// Random bytes behind a generated token.
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Generate a hex-encoded token from [`CSRF_TOKEN_BYTES`] random bytes.
pub fn generate_token(random: &dyn RandomSource) -> Result<String, SecurityError> {
    let mut buf = [0u8; CSRF_TOKEN_BYTES];
    random
        .fill(&mut buf)
        .map_err(|e| SecurityError::Randomness(e.to_string()))?;
    Ok(hex::encode(buf))
}

/// Holds the token for the lifetime of the gate. Reads are lock-free.
#[derive(Debug, Default)]
pub struct CsrfState {
    current: ArcSwapOption<String>,
}

impl CsrfState {
    /// Prefer the embedded token; otherwise generate one.
    pub fn initialize(embedded: Option<&str>, random: &dyn RandomSource) -> Self {
        let state = Self::default();
        match embedded.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::debug!("Using embedded CSRF token");
                state.set(token.to_string());
            }
            None => match generate_token(random) {
                Ok(token) => state.set(token),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Could not generate CSRF token, requests will omit it"
                    );
                }
            },
        }
        state
    }

    pub fn get(&self) -> Option<String> {
        self.current.load_full().map(|t| t.as_ref().clone())
    }

    pub fn set(&self, token: String) {
        self.current.store(Some(Arc::new(token)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsRandom;

    struct FixedRandom(u8);

    impl RandomSource for FixedRandom {
        fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
            buf.fill(self.0);
            Ok(())
        }
    }

    struct BrokenRandom;

    impl RandomSource for BrokenRandom {
        fn fill(&self, _buf: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy source offline")))
        }
    }

    #[test]
    fn test_generated_token_is_hex() {
        let token = generate_token(&OsRandom).unwrap();
        assert_eq!(token.len(), CSRF_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(generate_token(&FixedRandom(0xab)).unwrap(), "ab".repeat(32));
    }

    #[test]
    fn test_embedded_token_wins() {
        let state = CsrfState::initialize(Some(" page-token "), &FixedRandom(1));
        assert_eq!(state.get().as_deref(), Some("page-token"));

        let state = CsrfState::initialize(Some(""), &FixedRandom(1));
        assert_eq!(state.get().unwrap(), "01".repeat(32));
    }

    #[test]
    fn test_missing_randomness_leaves_no_token() {
        let state = CsrfState::initialize(None, &BrokenRandom);
        assert!(state.get().is_none());

        state.set("manual".into());
        assert_eq!(state.get().as_deref(), Some("manual"));
    }
}
