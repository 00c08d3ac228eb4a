//! The per-request decision procedure, independent of any web framework.
//!
//! A host extracts the method name and the three token locations from its own
//! request type, calls [`check`], and acts on the returned [`Verdict`].

use subtle::ConstantTimeEq;

use crate::CsrfError;

/// Methods exempt from verification. They are never expected to change
/// server state, so they are also the only ones allowed to mint a token.
pub const SAFE_METHODS: [&str; 4] = ["GET", "HEAD", "OPTIONS", "TRACE"];

/// Whether `method` is exempt from verification.
pub fn is_safe(method: &str) -> bool {
    SAFE_METHODS.iter().any(|safe| *safe == method)
}

/// The token values a request carried, by transport location.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Submitted<'a> {
    /// Value of the token cookie
    pub cookie: Option<&'a str>,

    /// Value of the token request header
    pub header: Option<&'a str>,

    /// Value of the token form field, if the body was parsed upstream
    pub body: Option<&'a str>,
}

/// Outcome of a successful [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    /// Keep using the token already held in the cookie
    Existing(&'a str),

    /// No cookie exists yet; a fresh token must be minted and set
    Mint,
}

/// Decide what to do with a request.
///
/// Unsafe methods need a cookie of at least `min_token_len` characters that
/// equals either the header token or the body token. Safe methods always pass
/// and only ask for a new token when no cookie was sent.
pub fn check<'a>(
    method: &str,
    submitted: &Submitted<'a>,
    min_token_len: usize,
) -> Result<Verdict<'a>, CsrfError> {
    let cookie = submitted.cookie.filter(|c| !c.is_empty());

    if is_safe(method) {
        return Ok(match cookie {
            Some(c) => Verdict::Existing(c),
            None => Verdict::Mint,
        });
    }

    let cookie = match cookie {
        Some(c) if c.chars().count() >= min_token_len => c,
        _ => return Err(CsrfError::CookieMissing),
    };

    if tokens_equal(cookie, submitted.body) || tokens_equal(cookie, submitted.header) {
        Ok(Verdict::Existing(cookie))
    } else {
        Err(CsrfError::TokenMismatch)
    }
}

fn tokens_equal(cookie: &str, candidate: Option<&str>) -> bool {
    match candidate {
        // Slices of unequal length compare unequal without leaking content.
        Some(candidate) => bool::from(cookie.as_bytes().ct_eq(candidate.as_bytes())),
        None => false,
    }
}
