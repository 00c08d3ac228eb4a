//! Token minting.

use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Builder;

use crate::CsrfError;

/// A source of fresh, unpredictable CSRF tokens.
///
/// Whatever a generator returns is stored in the cookie and compared
/// verbatim, so it must be at least as long as
/// [`CsrfConfig::min_token_len`](crate::CsrfConfig::min_token_len) or
/// unsafe requests carrying it will be rejected.
pub trait TokenGenerator: Send + Sync + 'static {
    /// Produce a new token.
    fn generate(&self) -> Result<String, CsrfError>;
}

impl<F> TokenGenerator for F
where
    F: Fn() -> Result<String, CsrfError> + Send + Sync + 'static,
{
    fn generate(&self) -> Result<String, CsrfError> {
        self()
    }
}

/// The default generator: 128 bits from the operating system RNG, rendered
/// as a hyphenated version 4 UUID (36 characters).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl TokenGenerator for UuidGenerator {
    fn generate(&self) -> Result<String, CsrfError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(CsrfError::NoRandom)?;

        Ok(Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string())
    }
}
