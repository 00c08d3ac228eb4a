use iron::{headers, status, IronError, Response};

use thiserror::Error;

/// The type of Errors used in this middleware.
///
/// Used to convey extra information inside an `iron::IronError`. The
/// `Display` text doubles as the body of the rejection response.
#[derive(Debug, Error)]
pub enum CsrfError {
    /// An unsafe request arrived without a plausible token cookie
    #[error("No CSRF cookie set!")]
    CookieMissing,

    /// The cookie matched neither the header nor the form field
    #[error("CSRF cookie does not match!")]
    TokenMismatch,

    /// An error was encountered while generating a random token
    #[error("failed to generate random bytes")]
    NoRandom(#[source] rand::Error),
}

impl CsrfError {
    fn http_status(&self) -> status::Status {
        match *self {
            CsrfError::NoRandom(_) => status::InternalServerError,
            _ => status::Forbidden,
        }
    }
}

impl From<CsrfError> for IronError {
    fn from(f: CsrfError) -> Self {
        let mut response = Response::with((f.http_status(), f.to_string()));
        response.headers.set(headers::ContentType::plaintext());

        IronError {
            response,
            error: Box::new(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn rejections_are_forbidden() {
        let err: IronError = CsrfError::CookieMissing.into();
        assert_eq!(err.response.status, Some(status::Forbidden));
        assert_eq!(
            err.response.headers.get::<headers::ContentType>(),
            Some(&headers::ContentType::plaintext())
        );

        let err: IronError = CsrfError::TokenMismatch.into();
        assert_eq!(err.response.status, Some(status::Forbidden));
    }

    #[test]
    fn no_random_is_server_error() {
        let inner = rand::Error::new(std::io::Error::new(std::io::ErrorKind::Other, "empty"));
        let err = CsrfError::NoRandom(inner);
        assert!(err.source().is_some());

        let err: IronError = err.into();
        assert_eq!(err.response.status, Some(status::InternalServerError));
    }
}
