use crate::consts;
use crate::http::body::Body;
use crate::http::headers::Headers;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::status::Status;
use crate::http::uri::Uri;
use crate::util;

// The parts of a request/response a builder needs to reach generically.
pub trait Message {
    fn headers_mut(&mut self) -> &mut Headers;
    fn body_mut(&mut self) -> &mut Body;
}

impl Message for Request {
    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

impl Message for Response {
    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

pub struct MessageBuilder<M: Message> {
    message: M,
}

impl MessageBuilder<Request> {
    pub fn new(method: Method, uri: Uri) -> Self {
        MessageBuilder { message: Request::new(method, uri) }
    }
}

impl MessageBuilder<Response> {
    pub fn new() -> Self {
        let mut response = Response::default();
        response.headers.set(consts::H_SERVER, consts::SERVER_NAME_VERSION);
        response.headers.set(consts::H_DATE, &util::format_time_imf(&response.date));
        MessageBuilder { message: response }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.message.status = status;
        self
    }
}

impl Default for MessageBuilder<Response> {
    fn default() -> Self {
        MessageBuilder::<Response>::new()
    }
}

impl<M: Message> MessageBuilder<M> {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.message.headers_mut().set(name, value);
        self
    }

    pub fn with_body(mut self, body: &[u8], media_type: &str) -> Self {
        self.message.body_mut().start_output(media_type).write(body);
        self
    }

    pub fn build(self) -> M {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::status::StatusCode;

    #[test]
    fn response_builder_sets_ambient_headers() {
        let response = MessageBuilder::<Response>::new()
            .with_status(StatusCode::NotFound.into())
            .with_body(b"gone", consts::H_MEDIA_TEXT)
            .build();

        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.headers.get(consts::H_SERVER), Some(consts::SERVER_NAME_VERSION));
        assert!(response.headers.contains(consts::H_DATE));
        assert_eq!(response.body.as_output().unwrap().data(), b"gone");
    }

    #[test]
    fn request_builder_carries_method_and_uri() {
        let request = MessageBuilder::<Request>::new(Method::Put, Uri::parse("/x").unwrap())
            .with_header("X-Extra", "1")
            .build();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.uri.full(), "/x");
        assert_eq!(request.headers.get("x-extra"), Some("1"));
    }
}
