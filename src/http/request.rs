use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::consts;
use crate::http::auth::Auth;
use crate::http::body::Body;
use crate::http::cookie::CookieJar;
use crate::http::headers::{self, Headers};
use crate::http::mime::MimeType;
use crate::http::multipart;
use crate::http::protocol::Protocol;
use crate::http::uri::{self, DataMap, Uri};
use crate::io::connection::Connection;
use crate::util;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    // Any other token is carried verbatim.
    Other(String),
}

impl FromStr for Method {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "CONNECT" => Method::Connect,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            "PATCH" => Method::Patch,
            token if !token.is_empty() && headers::is_token_string(token) => Method::Other(token.to_string()),
            _ => return Err(()),
        })
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Other(token) => token,
        })
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::Get
    }
}

// One uploaded file from a multipart/form-data body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestFile {
    pub filename: String,
    pub content_type: MimeType,
    pub headers: Headers,
    pub contents: Vec<u8>,
}

// An HTTP request. Incoming requests are populated by the parser with the body left unread;
// outgoing requests are built up and handed to the formatter.
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub protocol: Protocol,
    pub headers: Headers,
    pub user_agent: String,
    pub cookies: CookieJar,
    pub get: DataMap,
    pub post: DataMap,
    pub files: Vec<(String, RequestFile)>,
    pub auth: Auth,
    pub proxy_auth: Auth,
    pub body: Body,
    pub received_date: DateTime<Utc>,
    pub connection: Option<Connection>,
}

impl Default for Request {
    fn default() -> Self {
        Request {
            method: Method::default(),
            uri: Uri::default(),
            protocol: Protocol::default(),
            headers: Headers::new(),
            user_agent: String::new(),
            cookies: CookieJar::new(),
            get: DataMap::new(),
            post: DataMap::new(),
            files: Vec::new(),
            auth: Auth::default(),
            proxy_auth: Auth::default(),
            body: Body::Empty,
            received_date: util::get_time_utc(),
            connection: None,
        }
    }
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            get: uri.query.clone(),
            uri,
            ..Request::default()
        }
    }

    // POST data can only be decoded for the two form media types.
    pub fn can_parse_post(&self) -> bool {
        let content_type = self.body.content_type();
        self.method == Method::Post
            && (content_type.matches(consts::H_MEDIA_URLENCODED) || content_type.matches(consts::H_MEDIA_FORM_DATA))
    }

    // Drains the body and decodes it into `post` (and `files` for multipart uploads). Returns
    // false when the body cannot be interpreted.
    pub async fn parse_post(&mut self) -> bool {
        if !self.can_parse_post() {
            return false;
        }

        let content_type = self.body.content_type();
        let data = self.body.read_all().await;
        if self.body.error() {
            return false;
        }

        if content_type.matches(consts::H_MEDIA_URLENCODED) {
            let data = match String::from_utf8(data) {
                Ok(data) => data,
                Err(_) => return false,
            };
            self.post = uri::parse_query_string(&data);
            true
        } else {
            let boundary = match content_type.parameter("boundary") {
                Some(boundary) => boundary.to_string(),
                None => return false,
            };
            multipart::parse_form_data(&data, &boundary, &mut self.post, &mut self.files)
        }
    }

    // Builds an application/x-www-form-urlencoded body from `post`, for sending.
    pub fn format_post(&mut self) -> bool {
        if self.post.is_empty() {
            return false;
        }
        let encoded = uri::build_query_string(&self.post, false);
        self.body.start_output(consts::H_MEDIA_URLENCODED).write(encoded.as_bytes());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_tokens() {
        assert_eq!("GET".parse(), Ok(Method::Get));
        assert_eq!("BREW".parse(), Ok(Method::Other("BREW".to_string())));
        assert_eq!("not a token".parse::<Method>(), Err(()));
        assert_eq!("".parse::<Method>(), Err(()));
    }

    #[test]
    fn new_request_copies_query_into_get() {
        let request = Request::new(Method::Get, Uri::parse("/search?q=rust&page=2").unwrap());
        assert_eq!(request.get.get("q"), Some("rust"));
        assert_eq!(request.get.get("page"), Some("2"));
    }

    #[test]
    fn can_parse_post_requires_form_media_type() {
        let mut request = Request::new(Method::Post, Uri::parse("/f").unwrap());
        request.body.start_output(consts::H_MEDIA_URLENCODED);
        assert!(request.can_parse_post());

        request.body.start_output("application/json");
        assert!(!request.can_parse_post());

        request.method = Method::Get;
        request.body.start_output(consts::H_MEDIA_URLENCODED);
        assert!(!request.can_parse_post());
    }

    #[test]
    fn format_post_builds_urlencoded_body() {
        let mut request = Request::new(Method::Post, Uri::parse("/f").unwrap());
        request.post.append("a", "1");
        request.post.append("q", "hello world");
        assert!(request.format_post());
        assert!(request.body.content_type().matches(consts::H_MEDIA_URLENCODED));
        assert_eq!(request.body.as_output().unwrap().data(), b"a=1&q=hello+world");
    }
}
