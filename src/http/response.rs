use chrono::{DateTime, Utc};

use crate::consts;
use crate::http::auth::AuthChallenge;
use crate::http::body::Body;
use crate::http::cookie::CookieJar;
use crate::http::headers::Headers;
use crate::http::protocol::Protocol;
use crate::http::request::{Method, Request};
use crate::http::status::{Status, StatusClass, StatusCode};
use crate::http::uri::Uri;
use crate::io::connection::Connection;
use crate::util;

// An HTTP response, either built by a handler for sending or populated by the parser from the
// wire.
pub struct Response {
    pub body: Body,
    pub status: Status,
    pub headers: Headers,
    pub protocol: Protocol,
    pub cookies: CookieJar,
    pub date: DateTime<Utc>,
    pub www_authenticate: Vec<AuthChallenge>,
    pub proxy_authenticate: Vec<AuthChallenge>,
    pub connection: Option<Connection>,
}

impl Default for Response {
    fn default() -> Self {
        Response {
            body: Body::Empty,
            status: Status::default(),
            headers: Headers::new(),
            protocol: Protocol::default(),
            cookies: CookieJar::new(),
            date: util::get_time_utc(),
            www_authenticate: Vec::new(),
            proxy_authenticate: Vec::new(),
            connection: None,
        }
    }
}

impl Response {
    pub fn new(status: Status) -> Self {
        Response { status, ..Response::default() }
    }

    // A response with a started body of the given content type.
    pub fn content(content_type: &str, status: Status) -> Self {
        let mut response = Response::new(status);
        response.body.start_output(content_type);
        response
    }

    pub fn redirect(location: &Uri, status: Status) -> Self {
        let mut response = Response::new(status);
        response.headers.set(consts::H_LOCATION, &location.full());
        response
    }

    pub fn authorization_required(challenges: Vec<AuthChallenge>) -> Self {
        let mut response = Response::new(StatusCode::Unauthorized.into());
        response.www_authenticate = challenges;
        response
    }

    // Removes the body where the status forbids one (1xx, 204, 304).
    pub fn clean_body_for_status(&mut self) {
        if self.body.has_data()
            && (self.status.class() == StatusClass::Informational
                || self.status == StatusCode::NoContent
                || self.status == StatusCode::NotModified)
        {
            self.headers.erase(consts::H_CONTENT_LENGTH);
            self.headers.erase(consts::H_CONTENT_TYPE);
            self.headers.erase(consts::H_TRANSFER_ENCODING);
            self.body.stop_output();
        }
    }

    // Removes the body where HTTP requires it for the request that produced this response: a
    // successful CONNECT carries no payload, and HEAD keeps the entity headers but drops the
    // bytes.
    pub fn clean_body(&mut self, request: &Request) {
        self.clean_body_for_status();
        if !self.body.has_data() {
            return;
        }

        if self.status == StatusCode::Ok && request.method == Method::Connect {
            self.body.stop_output();
        } else if request.method == Method::Head {
            self.headers.set(consts::H_CONTENT_TYPE, &self.body.content_type().to_string());
            if !self.headers.contains(consts::H_TRANSFER_ENCODING) {
                self.headers.set(consts::H_CONTENT_LENGTH, &self.body.content_length().to_string());
            }
            self.body.stop_output();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location() {
        let response = Response::redirect(&Uri::parse("/new/place").unwrap(), StatusCode::Found.into());
        assert_eq!(response.status, StatusCode::Found);
        assert_eq!(response.headers.get(consts::H_LOCATION), Some("/new/place"));
    }

    #[test]
    fn authorization_required_carries_challenges() {
        let response = Response::authorization_required(vec![AuthChallenge::new("Basic", "files")]);
        assert_eq!(response.status, StatusCode::Unauthorized);
        assert_eq!(response.www_authenticate.len(), 1);
    }

    #[test]
    fn status_forbidding_body_strips_it() {
        let mut response = Response::content(consts::H_MEDIA_TEXT, StatusCode::NoContent.into());
        response.body.start_output(consts::H_MEDIA_TEXT).write(b"late");
        response.headers.set(consts::H_CONTENT_LENGTH, "4");
        response.clean_body_for_status();

        assert!(!response.body.has_data());
        assert!(!response.headers.contains(consts::H_CONTENT_LENGTH));
        assert!(!response.headers.contains(consts::H_CONTENT_TYPE));
    }

    #[test]
    fn head_keeps_entity_headers_without_payload() {
        let mut request = Request::default();
        request.method = Method::Head;

        let mut response = Response::default();
        response.body.start_output(consts::H_MEDIA_TEXT).write(b"abc");
        response.clean_body(&request);

        assert_eq!(response.headers.get(consts::H_CONTENT_TYPE), Some("text/plain"));
        assert_eq!(response.headers.get(consts::H_CONTENT_LENGTH), Some("3"));
        assert!(!response.body.has_data());
    }

    #[test]
    fn successful_connect_drops_payload() {
        let mut request = Request::default();
        request.method = Method::Connect;

        let mut response = Response::default();
        response.body.start_output(consts::H_MEDIA_TEXT).write(b"tunnel");
        response.clean_body(&request);
        assert!(!response.body.has_data());
        assert!(!response.headers.contains(consts::H_CONTENT_LENGTH));
    }
}
