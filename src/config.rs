use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};

use std::convert::TryFrom;
use std::time::Duration;

/// Name used for the cookie, the request header, and the form field.
pub const DEFAULT_TOKEN_NAME: &str = "csrftoken";

/// Shortest cookie value accepted on unsafe requests. Tokens from
/// [`UuidGenerator`](crate::UuidGenerator) are 36 characters long.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 30;

/// Lifetime of a freshly set cookie: ten days.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 24 * 60 * 60);

/// Configuration for the CSRF middleware.
#[derive(Clone, Debug)]
pub struct CsrfConfig {
    /// The name of the cookie holding the token.
    /// Default: "csrftoken"
    pub cookie_name: String,

    /// The name of the request header that may echo the token.
    /// Default: "csrftoken"
    pub header_name: String,

    /// The name of the form field that may echo the token.
    /// Default: "csrftoken"
    pub field_name: String,

    /// Default: "/"
    pub cookie_path: String,

    /// Default: None
    pub cookie_domain: Option<String>,

    /// Default: false
    pub cookie_secure: bool,

    /// Client-side script has to read the cookie to send it back as a
    /// header, so this stays false unless only form submission is used.
    /// Default: false
    pub cookie_http_only: bool,

    /// Default: Strict
    pub cookie_same_site: SameSite,

    /// Default: 10 days
    pub cookie_max_age: Duration,

    /// Cookies shorter than this are treated as missing on unsafe requests.
    /// Default: 30
    pub min_token_len: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        CsrfConfig {
            cookie_name: DEFAULT_TOKEN_NAME.to_owned(),
            header_name: DEFAULT_TOKEN_NAME.to_owned(),
            field_name: DEFAULT_TOKEN_NAME.to_owned(),
            cookie_path: "/".to_owned(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: false,
            cookie_same_site: SameSite::Strict,
            cookie_max_age: DEFAULT_MAX_AGE,
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
        }
    }
}

impl CsrfConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie name.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the header name.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set the form field name.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Set the cookie path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Restrict the cookie to a domain.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the secure flag.
    pub fn secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set the HttpOnly flag.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    /// Set the SameSite attribute.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    /// Set how long a freshly set cookie lives.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.cookie_max_age = max_age;
        self
    }

    /// Set the shortest cookie accepted on unsafe requests.
    pub fn min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len;
        self
    }

    /// Build the cookie carrying a freshly minted `token`.
    pub fn build_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = CookieDuration::try_from(self.cookie_max_age).unwrap_or(CookieDuration::MAX);

        let mut builder = Cookie::build((self.cookie_name.clone(), token))
            .path(self.cookie_path.clone())
            .max_age(max_age)
            .same_site(self.cookie_same_site)
            .secure(self.cookie_secure)
            .http_only(self.cookie_http_only);

        if let Some(ref domain) = self.cookie_domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}
