#![deny(missing_docs)]

//! Iron middleware providing cross-site request forgery (CSRF) protection.
//!
//! ## Overview
//!
//! `iron-csrf-guard` is used as an `Iron::AroundMiddleware` that checks unsafe
//! HTTP methods (anything other than GET, HEAD, OPTIONS, and TRACE) for a
//! valid CSRF token.
//!
//! ## Implementation
//!
//! `iron-csrf-guard` uses a method called Double Submit Cookie. The first safe
//! request without a token cookie gets a fresh random token, and the response
//! sets it as the `csrftoken` cookie for ten days. The token belongs to the
//! browser session rather than to a single form, so several tabs can keep
//! submitting without invalidating each other.
//!
//! When a client makes an unsafe request, it must echo the cookie value
//! either in a `csrftoken` request header (for script) or in a `csrftoken`
//! form field (for plain HTML forms). Matching either one is enough. Requests
//! without a cookie, or whose cookie matches neither, are answered with
//! `403 Forbidden` and never reach the wrapped handler.
//!
//! Form fields are read from the [`FormFields`] request extension, which an
//! earlier middleware is expected to fill in after parsing the body.
//!
//! ## Usage
//!
//! ```
//! use iron::prelude::*;
//! use iron::{status, AroundMiddleware};
//! use iron_csrf_guard::{Csrf, CsrfToken};
//!
//! fn main() {
//!     let handler = Csrf::new().around(Box::new(index));
//!
//!     // Make and start the server
//!     //Iron::new(handler).http("localhost:8080").unwrap();
//! }
//!
//! fn index(request: &mut Request) -> IronResult<Response> {
//!     let token = request.extensions.get::<CsrfToken>().unwrap();
//!     let msg = format!(
//!         r#"<form method="post"><input type="hidden" name="csrftoken" value="{}"></form>"#,
//!         token.token()
//!     );
//!     Ok(Response::with((status::Ok, msg)))
//! }
//! ```

use cookie::Cookie;

use iron::prelude::*;
use iron::{headers, typemap, AroundMiddleware, Handler, Headers};

use log::{debug, warn};

use std::collections::HashMap;
use std::fmt;

mod config;
mod errors;
pub mod policy;
mod token;

pub use crate::config::{CsrfConfig, DEFAULT_MAX_AGE, DEFAULT_MIN_TOKEN_LEN, DEFAULT_TOKEN_NAME};
pub use crate::errors::CsrfError;
pub use crate::token::{TokenGenerator, UuidGenerator};

use crate::policy::{Submitted, Verdict};

type BodyExtractor = dyn Fn(&Request) -> Option<String> + Send + Sync;

/// An `iron::AroundMiddleware` that provides CSRF protection.
pub struct Csrf {
    config: CsrfConfig,
    generator: Box<dyn TokenGenerator>,
    extract_body: Option<Box<BodyExtractor>>,
}

impl Default for Csrf {
    fn default() -> Self {
        Csrf::with_config(CsrfConfig::default())
    }
}

impl fmt::Debug for Csrf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Csrf")
            .field("config", &self.config)
            .field("custom_body_extractor", &self.extract_body.is_some())
            .finish()
    }
}

impl Csrf {
    /// Create a new instance of `Csrf` with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new instance of `Csrf` with the given configuration
    pub fn with_config(config: CsrfConfig) -> Self {
        Csrf {
            config,
            generator: Box::new(UuidGenerator),
            extract_body: None,
        }
    }

    /// Replace the source of freshly minted tokens
    pub fn with_generator<G>(mut self, generator: G) -> Self
    where
        G: TokenGenerator,
    {
        self.generator = Box::new(generator);
        self
    }

    /// Replace the lookup of the token submitted in the request body.
    ///
    /// By default the token is read from the [`FormFields`] extension.
    pub fn with_body_extractor<F>(mut self, extract: F) -> Self
    where
        F: Fn(&Request) -> Option<String> + Send + Sync + 'static,
    {
        self.extract_body = Some(Box::new(extract));
        self
    }

    /// The active configuration
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }
}

/// The key for the CSRF context in an `iron::typemap::TypeMap`.
///
/// Present on every request that reaches the wrapped handler.
pub struct CsrfToken;

impl typemap::Key for CsrfToken {
    type Value = CsrfContext;
}

/// The key for a parsed form body in an `iron::typemap::TypeMap`.
///
/// Body parsing is left to an earlier middleware; the CSRF middleware only
/// looks up the token field in this map.
pub struct FormFields;

impl typemap::Key for FormFields {
    type Value = HashMap<String, String>;
}

/// Token state for a single request, as seen by the wrapped handler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CsrfContext {
    token: String,
    minted: bool,
    cookie_token: Option<String>,
}

impl CsrfContext {
    fn existing(token: &str) -> Self {
        CsrfContext {
            token: token.to_owned(),
            minted: false,
            cookie_token: Some(token.to_owned()),
        }
    }

    fn minted(token: String, cookie_token: Option<String>) -> Self {
        CsrfContext {
            token,
            minted: true,
            cookie_token,
        }
    }

    /// The token to embed in forms or send back in the `csrftoken` header
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the token was generated during this request, in which case the
    /// response will carry a new cookie
    pub fn is_new(&self) -> bool {
        self.minted
    }

    /// The raw value of the token cookie sent with the request, if any
    pub fn cookie_token(&self) -> Option<&str> {
        self.cookie_token.as_deref()
    }
}

impl fmt::Display for CsrfContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl AroundMiddleware for Csrf {
    fn around(self, handler: Box<dyn Handler>) -> Box<dyn Handler> {
        Box::new(CsrfHandler { handler, csrf: self })
    }
}

struct CsrfHandler {
    handler: Box<dyn Handler>,
    csrf: Csrf,
}

impl Handler for CsrfHandler {
    fn handle(&self, req: &mut Request<'_, '_>) -> IronResult<Response> {
        let state = self.before(req)?;

        // Error responses still reach the client, so they carry the cookie too.
        match self.handler.handle(req) {
            Ok(res) => self.after(state, res),
            Err(mut err) => {
                err.response = self.after(state, err.response)?;
                Err(err)
            }
        }
    }
}

impl CsrfHandler {
    fn before(&self, req: &mut Request<'_, '_>) -> IronResult<Option<Cookie<'static>>> {
        let config = &self.csrf.config;

        let cookie = self.find_csrf_cookie(&req.headers);
        let header = self.find_csrf_header(&req.headers);
        let body = self.find_body_token(req);

        let submitted = Submitted {
            cookie: cookie.as_deref(),
            header: header.as_deref(),
            body: body.as_deref(),
        };

        let method = req.method.to_string();
        let verdict = match policy::check(&method, &submitted, config.min_token_len) {
            Ok(v) => v,
            Err(e) => {
                warn!("rejecting {} {}: {}", method, req.url, e);
                return Err(e.into());
            }
        };

        let (context, set_cookie) = match verdict {
            Verdict::Existing(token) => (CsrfContext::existing(token), None),
            Verdict::Mint => {
                let token = self.csrf.generator.generate()?;
                debug!("issuing new csrf cookie for {} {}", method, req.url);

                let set_cookie = config.build_cookie(token.clone());
                (CsrfContext::minted(token, cookie.clone()), Some(set_cookie))
            }
        };

        req.extensions.insert::<CsrfToken>(context);

        Ok(set_cookie)
    }

    fn find_csrf_cookie(&self, hdrs: &Headers) -> Option<String> {
        let cookies = hdrs.get::<headers::Cookie>()?;

        cookies
            .iter()
            .filter_map(|raw_cookie| Cookie::parse(raw_cookie.as_str()).ok())
            .filter(|c| c.name() == self.csrf.config.cookie_name)
            .last()
            .map(|c| c.value().to_owned())
    }

    fn find_csrf_header(&self, hdrs: &Headers) -> Option<String> {
        let raw = hdrs.get_raw(&self.csrf.config.header_name)?;
        let first = raw.first()?;

        String::from_utf8(first.clone()).ok()
    }

    fn find_body_token(&self, req: &Request<'_, '_>) -> Option<String> {
        if let Some(ref extract) = self.csrf.extract_body {
            return extract(req);
        }

        req.extensions
            .get::<FormFields>()
            .and_then(|fields| fields.get(&self.csrf.config.field_name))
            .cloned()
    }

    fn after(&self, set_cookie: Option<Cookie<'static>>, mut res: Response) -> IronResult<Response> {
        if let Some(set_cookie) = set_cookie {
            let rendered = set_cookie.to_string();

            match res.headers.get_mut::<headers::SetCookie>() {
                Some(header) => header.push(rendered),
                None => res.headers.set(headers::SetCookie(vec![rendered])),
            }
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iron::status;

    fn new_handler() -> CsrfHandler {
        CsrfHandler {
            handler: Box::new(|_: &mut Request<'_, '_>| Ok(Response::with(status::NoContent))),
            csrf: Csrf::new(),
        }
    }

    #[test]
    fn after_no_cookie() {
        let csrf = new_handler();
        let expected = Response::with(status::NoContent);
        let input = Response::with(status::NoContent);

        let actual = csrf.after(None, input).unwrap();

        assert_eq!(expected.status, actual.status);
        assert_eq!(expected.headers, actual.headers);
        assert!(actual.extensions.is_empty());
    }

    #[test]
    fn after_set_cookie() {
        let csrf = new_handler();
        let mut expected = Response::with(status::NoContent);
        expected
            .headers
            .set(headers::SetCookie(vec!["hello=world".to_owned()]));

        let cookie = Cookie::new("hello", "world");

        let input = Response::with(status::NoContent);
        let actual = csrf.after(Some(cookie), input).unwrap();

        assert_eq!(expected.status, actual.status);
        assert_eq!(expected.headers, actual.headers);
    }

    #[test]
    fn after_sets_minted_cookie() {
        let csrf = new_handler();
        let token = "0b9e8c54-1f0d-4c25-a4b9-8a34d1e2c7f1";
        let cookie = csrf.csrf.config().build_cookie(token.to_owned());
        let rendered = cookie.to_string();

        let input = Response::with(status::NoContent);
        let actual = csrf.after(Some(cookie), input).unwrap();

        let set_cookie = actual.headers.get::<headers::SetCookie>().unwrap();
        assert_eq!(set_cookie.0, vec![rendered.clone()]);

        let parsed = Cookie::parse(rendered).unwrap();
        assert_eq!(parsed.name(), "csrftoken");
        assert_eq!(parsed.value(), token);
        assert_eq!(parsed.path(), Some("/"));
        assert_eq!(parsed.same_site(), Some(cookie::SameSite::Strict));
    }

    #[test]
    fn after_append_cookie() {
        let csrf = new_handler();
        let mut expected = Response::with(status::NoContent);
        expected.headers.set(headers::SetCookie(vec![
            "orange=banana".to_owned(),
            "hello=world".to_owned(),
        ]));

        let cookie = Cookie::new("hello", "world");

        let mut input = Response::with(status::NoContent);
        input
            .headers
            .set(headers::SetCookie(vec!["orange=banana".to_owned()]));
        let actual = csrf.after(Some(cookie), input).unwrap();

        assert_eq!(expected.status, actual.status);
        assert_eq!(expected.headers, actual.headers);
    }

    #[test]
    fn find_cookie_among_others() {
        let csrf = new_handler();
        let mut hdrs = Headers::new();
        hdrs.set(headers::Cookie(vec![
            "session=abc".to_owned(),
            "csrftoken=0b9e8c54-1f0d-4c25-a4b9-8a34d1e2c7f1".to_owned(),
        ]));

        assert_eq!(
            csrf.find_csrf_cookie(&hdrs).as_deref(),
            Some("0b9e8c54-1f0d-4c25-a4b9-8a34d1e2c7f1")
        );
    }

    #[test]
    fn find_cookie_last_duplicate_wins() {
        let csrf = new_handler();
        let mut hdrs = Headers::new();
        hdrs.set(headers::Cookie(vec![
            "csrftoken=".to_owned(),
            "csrftoken=0b9e8c54-1f0d-4c25-a4b9-8a34d1e2c7f1".to_owned(),
        ]));

        assert_eq!(
            csrf.find_csrf_cookie(&hdrs).as_deref(),
            Some("0b9e8c54-1f0d-4c25-a4b9-8a34d1e2c7f1")
        );
    }

    #[test]
    fn find_cookie_missing() {
        let csrf = new_handler();
        let mut hdrs = Headers::new();
        assert_eq!(csrf.find_csrf_cookie(&hdrs), None);

        hdrs.set(headers::Cookie(vec!["csrf=banana".to_owned()]));
        assert_eq!(csrf.find_csrf_cookie(&hdrs), None);
    }

    #[test]
    fn find_header_case_insensitive() {
        let csrf = new_handler();
        let mut hdrs = Headers::new();
        hdrs.set_raw("CsrfToken", vec![b"banana".to_vec()]);

        assert_eq!(csrf.find_csrf_header(&hdrs).as_deref(), Some("banana"));
    }

    #[test]
    fn context_accessors() {
        let ctx = CsrfContext::existing("banana");
        assert_eq!(ctx.token(), "banana");
        assert_eq!(ctx.cookie_token(), Some("banana"));
        assert!(!ctx.is_new());
        assert_eq!(ctx.to_string(), "banana");

        let ctx = CsrfContext::minted("orange".to_owned(), None);
        assert_eq!(ctx.token(), "orange");
        assert_eq!(ctx.cookie_token(), None);
        assert!(ctx.is_new());

        assert_eq!(CsrfContext::default().token(), "");
    }
}
