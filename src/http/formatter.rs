use crate::consts;
use crate::http::body::Body;
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::util;

// Serializes HTTP/1.x messages. Lines always end with CRLF. Body framing on write follows the
// header state: an explicit `Transfer-Encoding: chunked` wins, then an explicit
// `Content-Length` is trusted, otherwise Content-Length and Content-Type are derived from the
// buffered body.
pub struct Http1Formatter;

impl Http1Formatter {
    pub fn request(&self, out: &mut Vec<u8>, request: &Request) {
        let target = if request.method == crate::http::request::Method::Connect {
            request.uri.authority.full()
        } else {
            request.uri.request_target()
        };
        out.extend_from_slice(format!("{} {} {}{}", request.method, target, request.protocol, consts::CRLF).as_bytes());

        let mut headers = request.headers.clone();
        if !headers.contains(consts::H_HOST) && !request.uri.authority.empty() {
            let mut host = request.uri.authority.host.clone();
            if let Some(port) = request.uri.authority.port {
                host.push_str(&format!(":{}", port));
            }
            headers.set(consts::H_HOST, &host);
        }
        if !request.cookies.is_empty() && !headers.contains(consts::H_COOKIE) {
            headers.set(consts::H_COOKIE, &request.cookies.header_value());
        }
        if !request.auth.empty() && !headers.contains(consts::H_AUTHORIZATION) {
            headers.set(consts::H_AUTHORIZATION, &request.auth.header_value());
        }
        if !request.proxy_auth.empty() && !headers.contains(consts::H_PROXY_AUTHORIZATION) {
            headers.set(consts::H_PROXY_AUTHORIZATION, &request.proxy_auth.header_value());
        }
        self.frame_body(&mut headers, &request.body, false);

        self.write_headers(out, &headers);
        self.write_body(out, &headers, &request.body);
    }

    // Writes a response. `clean_body` is expected to have run already where a request context
    // exists.
    pub fn response(&self, out: &mut Vec<u8>, response: &Response) {
        out.extend_from_slice(
            format!("{} {} {}{}", response.protocol, response.status.code, response.status.reason, consts::CRLF)
                .as_bytes(),
        );

        let mut headers = response.headers.clone();
        if !headers.contains(consts::H_DATE) {
            headers.set(consts::H_DATE, &util::format_time_imf(&response.date));
        }
        for cookie in response.cookies.iter() {
            headers.append(consts::H_SET_COOKIE, &cookie.header_value());
        }
        for challenge in &response.www_authenticate {
            headers.append(consts::H_WWW_AUTHENTICATE, &challenge.header_value());
        }
        for challenge in &response.proxy_authenticate {
            headers.append(consts::H_PROXY_AUTHENTICATE, &challenge.header_value());
        }

        let status_allows_body = !matches!(response.status.code, 100..=199 | 204 | 304);
        self.frame_body(&mut headers, &response.body, status_allows_body);

        self.write_headers(out, &headers);
        self.write_body(out, &headers, &response.body);
    }

    fn frame_body(&self, headers: &mut Headers, body: &Body, zero_length_when_absent: bool) {
        if headers.contains(consts::H_TRANSFER_ENCODING) || headers.contains(consts::H_CONTENT_LENGTH) {
            return;
        }
        if body.has_data() {
            let content_type = body.content_type();
            if !content_type.empty() && !headers.contains(consts::H_CONTENT_TYPE) {
                headers.set(consts::H_CONTENT_TYPE, &content_type.to_string());
            }
            headers.set(consts::H_CONTENT_LENGTH, &body.content_length().to_string());
        } else if zero_length_when_absent {
            headers.set(consts::H_CONTENT_LENGTH, "0");
        }
    }

    fn write_headers(&self, out: &mut Vec<u8>, headers: &Headers) {
        for (name, value) in headers.iter() {
            out.extend_from_slice(format!("{}: {}{}", name, value, consts::CRLF).as_bytes());
        }
        out.extend_from_slice(consts::CRLF.as_bytes());
    }

    fn write_body(&self, out: &mut Vec<u8>, headers: &Headers, body: &Body) {
        let data = match body.as_output() {
            Some(output) if output.has_data() => output.data(),
            _ => return,
        };

        let chunked = headers
            .get(consts::H_TRANSFER_ENCODING)
            .map(|encoding| encoding.eq_ignore_ascii_case(consts::H_T_ENC_CHUNKED))
            .unwrap_or(false);
        if chunked {
            // One data chunk plus the zero-size terminator.
            if !data.is_empty() {
                out.extend_from_slice(format!("{:X}{}", data.len(), consts::CRLF).as_bytes());
                out.extend_from_slice(data);
                out.extend_from_slice(consts::CRLF.as_bytes());
            }
            out.extend_from_slice(format!("0{}{}", consts::CRLF, consts::CRLF).as_bytes());
        } else {
            out.extend_from_slice(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::message::MessageBuilder;
    use crate::http::parser::Http1Parser;
    use crate::http::request::Method;
    use crate::http::status::StatusCode;
    use crate::http::uri::Uri;
    use crate::io::connection::Connection;

    fn format_response(response: &Response) -> Vec<u8> {
        let mut out = Vec::new();
        Http1Formatter.response(&mut out, response);
        out
    }

    fn format_request(request: &Request) -> Vec<u8> {
        let mut out = Vec::new();
        Http1Formatter.request(&mut out, request);
        out
    }

    #[test]
    fn writes_response_with_derived_length() {
        let mut response = Response::new(StatusCode::Ok.into());
        response.body.start_output(consts::H_MEDIA_TEXT).write(b"hi");
        let wire = String::from_utf8(format_response(&response)).unwrap();

        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("Content-Length: 2\r\n"));
        assert!(wire.contains("Content-Type: text/plain\r\n"));
        assert!(wire.contains("Date: "));
        assert!(wire.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn trusts_explicit_content_length() {
        let mut response = Response::new(StatusCode::Ok.into());
        response.headers.set(consts::H_CONTENT_LENGTH, "10");
        response.body.start_output(consts::H_MEDIA_TEXT).write(b"hi");
        let wire = String::from_utf8(format_response(&response)).unwrap();
        assert!(wire.contains("Content-Length: 10\r\n"));
        assert!(!wire.contains("Content-Length: 2\r\n"));
    }

    #[test]
    fn bodyless_ok_gets_zero_length() {
        let wire = String::from_utf8(format_response(&Response::new(StatusCode::Ok.into()))).unwrap();
        assert!(wire.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn no_content_gets_no_length_and_no_body() {
        let mut response = Response::new(StatusCode::NoContent.into());
        response.body.start_output(consts::H_MEDIA_TEXT).write(b"data");
        response.clean_body_for_status();
        let wire = String::from_utf8(format_response(&response)).unwrap();
        assert!(!wire.contains("Content-Length"));
        assert!(wire.ends_with("\r\n\r\n"));
    }

    #[test]
    fn writes_cookies_and_challenges() {
        let mut response = Response::authorization_required(vec![crate::http::auth::AuthChallenge::new("Basic", "files")]);
        response.cookies.append(crate::http::cookie::Cookie::new("a", "1").with_attribute("HttpOnly", ""));
        response.cookies.append(crate::http::cookie::Cookie::new("b", "2"));
        let wire = String::from_utf8(format_response(&response)).unwrap();

        assert!(wire.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
        assert!(wire.contains("Set-Cookie: a=1; HttpOnly\r\n"));
        assert!(wire.contains("Set-Cookie: b=2\r\n"));
        assert!(wire.contains("WWW-Authenticate: Basic realm=\"files\"\r\n"));
    }

    #[test]
    fn writes_request_with_host_and_cookies() {
        let mut request = MessageBuilder::<Request>::new(Method::Get, Uri::parse("http://example.com:8080/a?b=c").unwrap()).build();
        request.cookies.append(crate::http::cookie::Cookie::new("id", "7"));
        let wire = String::from_utf8(format_request(&request)).unwrap();

        assert!(wire.starts_with("GET /a?b=c HTTP/1.1\r\n"));
        assert!(wire.contains("Host: example.com:8080\r\n"));
        assert!(wire.contains("Cookie: id=7\r\n"));
        assert!(wire.ends_with("\r\n\r\n"));
    }

    #[test]
    fn connect_uses_authority_target() {
        let request = MessageBuilder::<Request>::new(Method::Connect, Uri::parse("//proxy.example:443").unwrap()).build();
        let wire = String::from_utf8(format_request(&request)).unwrap();
        assert!(wire.starts_with("CONNECT proxy.example:443 HTTP/1.1\r\n"));
    }

    #[async_std::test]
    async fn request_round_trips_through_parser() {
        let mut original = MessageBuilder::<Request>::new(Method::Post, Uri::parse("/submit?k=v").unwrap())
            .with_header(consts::H_HOST, "h")
            .with_body(b"payload", consts::H_MEDIA_TEXT)
            .build();
        original.auth = crate::http::auth::Auth::basic("user", "pass");

        let wire = format_request(&original);
        let connection = Connection::from_bytes(&wire);
        let mut parsed = Request::default();
        Http1Parser::default().request(&connection, &mut parsed).await.unwrap();

        assert_eq!(parsed.method, Method::Post);
        assert_eq!(parsed.uri.path.segments(), ["submit"]);
        assert_eq!(parsed.get.get("k"), Some("v"));
        assert_eq!(parsed.auth.user, "user");
        assert_eq!(parsed.body.content_length(), 7);
        assert_eq!(parsed.body.read_all().await, b"payload");

        // Reformatting the parsed message reproduces the original bytes.
        parsed.body.start_output(consts::H_MEDIA_TEXT).write(b"payload");
        assert_eq!(format_request(&parsed), wire);
    }

    #[async_std::test]
    async fn chunked_response_round_trips() {
        let mut original = Response::new(StatusCode::Ok.into());
        original.headers.set(consts::H_TRANSFER_ENCODING, consts::H_T_ENC_CHUNKED);
        original.body.start_output(consts::H_MEDIA_TEXT).write(b"Hello");
        let wire = format_response(&original);

        let text = String::from_utf8(wire.clone()).unwrap();
        assert!(text.contains("5\r\nHello\r\n0\r\n\r\n"));

        let connection = Connection::from_bytes(&wire);
        let mut parsed = Response::default();
        Http1Parser::default().response(&connection, &mut parsed).await.unwrap();
        assert!(parsed.body.as_input_mut().unwrap().is_chunked());
        assert_eq!(parsed.body.read_all().await, b"Hello");
    }
}
