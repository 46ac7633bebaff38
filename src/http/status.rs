use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};

use num_enum::TryFromPrimitive;

// The codes with registered semantics this library knows default reason phrases for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusCode {
    Continue = 100,
    SwitchingProtocols = 101,
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NonAuthoritativeInformation = 203,
    NoContent = 204,
    ResetContent = 205,
    PartialContent = 206,
    MultipleChoices = 300,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthenticationRequired = 407,
    RequestTimeout = 408,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFailed = 412,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    RangeNotSatisfiable = 416,
    ExpectationFailed = 417,
    UpgradeRequired = 426,
    PreconditionRequired = 428,
    TooManyRequests = 429,
    RequestHeaderFieldsTooLarge = 431,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,
}

// Default reason phrases for the known codes.
fn reason_phrase(code: u16) -> Option<&'static str> {
    Some(match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    })
}

// The five RFC 7231 status classes, plus a bucket for out-of-range codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Success,
    Redirect,
    ClientError,
    ServerError,
    Invalid,
}

// A numeric status with its reason phrase. Unknown codes are representable; known codes pick up
// their default phrase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub reason: String,
}

impl Status {
    pub fn new(code: u16) -> Self {
        Status {
            code,
            reason: reason_phrase(code).unwrap_or("Unknown").to_string(),
        }
    }

    pub fn with_reason(code: u16, reason: &str) -> Self {
        Status { code, reason: reason.to_string() }
    }

    pub fn class(&self) -> StatusClass {
        match self.code / 100 {
            1 => StatusClass::Informational,
            2 => StatusClass::Success,
            3 => StatusClass::Redirect,
            4 => StatusClass::ClientError,
            5 => StatusClass::ServerError,
            _ => StatusClass::Invalid,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.class(), StatusClass::ClientError | StatusClass::ServerError | StatusClass::Invalid)
    }

    pub fn known_code(&self) -> Option<StatusCode> {
        StatusCode::try_from(self.code).ok()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::new(StatusCode::Ok as u16)
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Status::new(code as u16)
    }
}

impl PartialEq<StatusCode> for Status {
    fn eq(&self, other: &StatusCode) -> bool {
        self.code == *other as u16
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_pick_up_reasons() {
        assert_eq!(Status::new(200).reason, "OK");
        assert_eq!(Status::new(404).reason, "Not Found");
        assert_eq!(Status::from(StatusCode::PayloadTooLarge).to_string(), "413 Payload Too Large");
    }

    #[test]
    fn unknown_codes_are_representable() {
        let status = Status::new(299);
        assert_eq!(status.reason, "Unknown");
        assert_eq!(status.class(), StatusClass::Success);
        assert!(status.known_code().is_none());
    }

    #[test]
    fn classes() {
        assert_eq!(Status::new(100).class(), StatusClass::Informational);
        assert_eq!(Status::new(204).class(), StatusClass::Success);
        assert_eq!(Status::new(302).class(), StatusClass::Redirect);
        assert_eq!(Status::new(404).class(), StatusClass::ClientError);
        assert_eq!(Status::new(503).class(), StatusClass::ServerError);
        assert_eq!(Status::new(99).class(), StatusClass::Invalid);
        assert!(Status::new(500).is_error());
        assert!(!Status::new(301).is_error());
    }

    #[test]
    fn status_compares_to_known_code() {
        assert_eq!(Status::new(204), StatusCode::NoContent);
        assert_eq!(StatusCode::try_from(408u16), Ok(StatusCode::RequestTimeout));
    }
}
