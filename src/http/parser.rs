use async_std::io;

use crate::consts;
use crate::http::auth::{self, Auth};
use crate::http::body::{Body, InputBody};
use crate::http::cookie;
use crate::http::headers::Headers;
use crate::http::protocol::Protocol;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::{Status, StatusCode};
use crate::http::uri::{InvalidUri, Uri};
use crate::io::connection::Connection;
use crate::util;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageParseError {
    // The peer closed an idle connection before sending a request line.
    NoRequest,

    InvalidRequestLine,
    InvalidStatusLine,
    InvalidUri,
    UriTooLong,
    UnsupportedVersion,

    InvalidHeader,
    NoHostHeader,
    ExpectationFailed,

    InvalidBody,
    BodyTooLarge,

    TimedOut,
    EndOfStream,
    Unknown,
}

pub type MessageParseResult<T> = Result<T, MessageParseError>;

impl From<InvalidUri> for MessageParseError {
    fn from(_: InvalidUri) -> Self {
        MessageParseError::InvalidUri
    }
}

impl MessageParseError {
    // The response status describing this parse outcome.
    pub fn status(&self) -> Status {
        match self {
            MessageParseError::UriTooLong => StatusCode::UriTooLong.into(),
            MessageParseError::UnsupportedVersion => StatusCode::HttpVersionNotSupported.into(),
            MessageParseError::BodyTooLarge => StatusCode::PayloadTooLarge.into(),
            MessageParseError::TimedOut => StatusCode::RequestTimeout.into(),
            MessageParseError::ExpectationFailed => StatusCode::ExpectationFailed.into(),
            _ => StatusCode::BadRequest.into(),
        }
    }
}

// Reads HTTP/1.x messages from a connection's input buffer, leaving bodies unread. The target
// length limit guards the request line before the URI parser runs.
pub struct Http1Parser {
    pub max_uri_length: usize,
}

impl Default for Http1Parser {
    fn default() -> Self {
        Http1Parser { max_uri_length: consts::MAX_URI_LENGTH }
    }
}

impl Http1Parser {
    // Parses one request into `request`. On error the request keeps whatever was populated
    // before the failure.
    pub async fn request(&self, connection: &Connection, request: &mut Request) -> MessageParseResult<()> {
        request.received_date = util::get_time_utc();

        let line = self.request_line(connection).await?;
        let parts = line.split(' ').collect::<Vec<_>>();
        if parts.len() != 3 || parts.iter().any(|part| part.is_empty()) {
            return Err(MessageParseError::InvalidRequestLine);
        }

        request.method = parts[0].parse().map_err(|_| MessageParseError::InvalidRequestLine)?;
        if parts[1].len() > self.max_uri_length {
            return Err(MessageParseError::UriTooLong);
        }
        request.uri = Uri::parse(parts[1])?;
        request.get = request.uri.query.clone();
        request.protocol = parse_version(parts[2])?;

        request.headers = self.headers(connection).await?;
        if request.protocol == Protocol::http_1_1() && !request.headers.contains(consts::H_HOST) {
            return Err(MessageParseError::NoHostHeader);
        }

        request.user_agent = request.headers.get(consts::H_USER_AGENT).unwrap_or("").to_string();
        for header in request.headers.get_all(consts::H_COOKIE) {
            for cookie in cookie::parse_cookie_header(header).iter() {
                request.cookies.append(cookie.clone());
            }
        }
        if let Some(header) = request.headers.get(consts::H_AUTHORIZATION) {
            request.auth = Auth::parse(header);
        }
        if let Some(header) = request.headers.get(consts::H_PROXY_AUTHORIZATION) {
            request.proxy_auth = Auth::parse(header);
        }

        self.handle_expect(connection, request).await?;

        request.body = self.body(&request.headers, connection)?;
        Ok(())
    }

    // Parses one response into `response`; symmetric to `request`.
    pub async fn response(&self, connection: &Connection, response: &mut Response) -> MessageParseResult<()> {
        let line = read_line(connection).await?;
        let mut parts = line.splitn(3, ' ');
        let version = parts.next().unwrap_or("");
        let code = parts.next().ok_or(MessageParseError::InvalidStatusLine)?;
        let reason = parts.next().unwrap_or("");

        response.protocol = parse_version(version)?;
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(MessageParseError::InvalidStatusLine);
        }
        let code = code.parse::<u16>().map_err(|_| MessageParseError::InvalidStatusLine)?;
        response.status = if reason.is_empty() {
            Status::new(code)
        } else {
            Status::with_reason(code, reason)
        };

        response.headers = self.headers(connection).await?;

        if let Some(date) = response.headers.get(consts::H_DATE).and_then(util::parse_time_imf) {
            response.date = date;
        }
        for header in response.headers.get_all(consts::H_SET_COOKIE) {
            if let Some(cookie) = cookie::parse_set_cookie(header) {
                response.cookies.append(cookie);
            }
        }
        for header in response.headers.get_all(consts::H_WWW_AUTHENTICATE) {
            response.www_authenticate.extend(auth::parse_challenges(header));
        }
        for header in response.headers.get_all(consts::H_PROXY_AUTHENTICATE) {
            response.proxy_authenticate.extend(auth::parse_challenges(header));
        }

        response.body = self.body(&response.headers, connection)?;
        Ok(())
    }

    // Reads the request line, skipping the stray blank lines some clients send between
    // keep-alive requests. A connection that closes before any input is NoRequest, which the
    // server treats as a clean end rather than an error.
    async fn request_line(&self, connection: &Connection) -> MessageParseResult<String> {
        for _ in 0..4 {
            let line = match read_line(connection).await {
                Ok(line) => line,
                Err(MessageParseError::EndOfStream) => return Err(MessageParseError::NoRequest),
                Err(e) => return Err(e),
            };
            if !line.is_empty() {
                return Ok(line);
            }
        }
        Err(MessageParseError::InvalidRequestLine)
    }

    async fn headers(&self, connection: &Connection) -> MessageParseResult<Headers> {
        let mut headers = Headers::new();

        loop {
            let line = read_line(connection).await?;
            if line.is_empty() {
                return Ok(headers);
            }

            // Folded continuation lines (obs-fold) are joined onto the previous value with a
            // single space.
            if line.starts_with(' ') || line.starts_with('\t') {
                if !headers.extend_last(line.trim_matches(consts::OPTIONAL_WHITESPACE)) {
                    return Err(MessageParseError::InvalidHeader);
                }
                continue;
            }

            let colon = line.find(':').ok_or(MessageParseError::InvalidHeader)?;
            let name = &line[..colon];
            let value = line[colon + 1..].trim_matches(consts::OPTIONAL_WHITESPACE);
            if name.ends_with(|c: char| c.is_ascii_whitespace()) || !headers.append(name, value) {
                return Err(MessageParseError::InvalidHeader);
            }
        }
    }

    // `Expect: 100-continue` gets its interim response before the body is framed; any other
    // expectation fails the request.
    async fn handle_expect(&self, connection: &Connection, request: &mut Request) -> MessageParseResult<()> {
        let expect = match request.headers.get(consts::H_EXPECT) {
            Some(expect) => expect,
            None => return Ok(()),
        };
        if !expect.eq_ignore_ascii_case(consts::H_EXPECT_CONTINUE) {
            return Err(MessageParseError::ExpectationFailed);
        }

        let interim = format!("{} {}{}{}", request.protocol, Status::new(StatusCode::Continue as u16), consts::CRLF, consts::CRLF);
        connection.write(interim.as_bytes()).await;
        connection.commit_output().await.map_err(|_| MessageParseError::Unknown)
    }

    fn body(&self, headers: &Headers, connection: &Connection) -> MessageParseResult<Body> {
        let body = InputBody::start_input(headers, connection.clone()).map_err(|_| MessageParseError::InvalidBody)?;
        Ok(if body.has_data() { Body::Input(body) } else { Body::Empty })
    }
}

fn parse_version(raw: &str) -> MessageParseResult<Protocol> {
    let protocol = Protocol::parse(raw).ok_or(MessageParseError::InvalidRequestLine)?;
    if protocol == Protocol::http_1_0() || protocol == Protocol::http_1_1() {
        Ok(protocol)
    } else {
        Err(MessageParseError::UnsupportedVersion)
    }
}

async fn read_line(connection: &Connection) -> MessageParseResult<String> {
    match connection.read_line().await {
        Ok(line) => Ok(line),
        Err(e) => Err(classify_io(connection, e).await),
    }
}

async fn classify_io(connection: &Connection, error: io::Error) -> MessageParseError {
    if error.kind() == io::ErrorKind::TimedOut || connection.timed_out().await {
        MessageParseError::TimedOut
    } else if connection.input_exceeded().await {
        MessageParseError::BodyTooLarge
    } else if error.kind() == io::ErrorKind::UnexpectedEof {
        MessageParseError::EndOfStream
    } else {
        MessageParseError::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Method;

    async fn parse_request(wire: &[u8]) -> (Request, MessageParseResult<()>) {
        let connection = Connection::from_bytes(wire);
        let mut request = Request::default();
        let result = Http1Parser::default().request(&connection, &mut request).await;
        request.connection = Some(connection);
        (request, result)
    }

    async fn parse_response(wire: &[u8]) -> (Response, MessageParseResult<()>) {
        let connection = Connection::from_bytes(wire);
        let mut response = Response::default();
        let result = Http1Parser::default().response(&connection, &mut response).await;
        response.connection = Some(connection);
        (response, result)
    }

    #[async_std::test]
    async fn parses_get_request() {
        let (request, result) = parse_request(b"GET /path?x=1 HTTP/1.1\r\nHost: h\r\nUser-Agent: test\r\n\r\n").await;
        assert_eq!(result, Ok(()));
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.uri.path.segments(), ["path"]);
        assert_eq!(request.get.get("x"), Some("1"));
        assert_eq!(request.protocol, Protocol::http_1_1());
        assert_eq!(request.headers.get("host"), Some("h"));
        assert_eq!(request.user_agent, "test");
        assert!(!request.body.has_data());
    }

    #[async_std::test]
    async fn accepts_lf_only_lines_and_leading_blanks() {
        let (request, result) = parse_request(b"\r\n\nGET / HTTP/1.0\nHost: h\n\n").await;
        assert_eq!(result, Ok(()));
        assert_eq!(request.protocol, Protocol::http_1_0());
    }

    #[async_std::test]
    async fn extracts_cookies_and_auth() {
        let wire = b"GET / HTTP/1.1\r\n\
            Host: h\r\n\
            Cookie: session=abc; theme=dark\r\n\
            Authorization: Basic aGVsbG86dGhlcmU=\r\n\
            \r\n";
        let (request, result) = parse_request(wire).await;
        assert_eq!(result, Ok(()));
        assert_eq!(request.cookies.value("session"), Some("abc"));
        assert_eq!(request.cookies.value("theme"), Some("dark"));
        assert_eq!(request.auth.user, "hello");
        assert_eq!(request.auth.password, "there");
    }

    #[async_std::test]
    async fn joins_folded_header_lines() {
        let (request, result) = parse_request(b"GET / HTTP/1.1\r\nHost: h\r\nX-Long: first\r\n second\r\n\r\n").await;
        assert_eq!(result, Ok(()));
        assert_eq!(request.headers.get("X-Long"), Some("first second"));
    }

    #[async_std::test]
    async fn frames_length_delimited_body_without_reading() {
        let wire = b"POST /f HTTP/1.1\r\nHost: h\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello";
        let (mut request, result) = parse_request(wire).await;
        assert_eq!(result, Ok(()));
        assert_eq!(request.body.content_length(), 5);
        assert_eq!(request.body.read_all().await, b"hello");
    }

    #[async_std::test]
    async fn parses_urlencoded_post_data() {
        let wire = b"POST /f HTTP/1.1\r\n\
            Host: h\r\n\
            Content-Type: application/x-www-form-urlencoded\r\n\
            Content-Length: 7\r\n\
            \r\n\
            a=1&b=2";
        let (mut request, result) = parse_request(wire).await;
        assert_eq!(result, Ok(()));
        assert!(request.can_parse_post());
        assert!(request.parse_post().await);
        assert_eq!(request.post.get("a"), Some("1"));
        assert_eq!(request.post.get("b"), Some("2"));
    }

    #[async_std::test]
    async fn reads_chunked_request_body() {
        let wire = b"POST /f HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n";
        let (mut request, result) = parse_request(wire).await;
        assert_eq!(result, Ok(()));
        assert!(request.body.as_input_mut().unwrap().is_chunked());
        assert_eq!(request.body.read_all().await, b"abcde");
        assert_eq!(request.body.content_length(), 5);
    }

    #[async_std::test]
    async fn error_statuses() {
        assert_eq!(parse_request(b"garbage\r\n\r\n").await.1, Err(MessageParseError::InvalidRequestLine));
        assert_eq!(parse_request(b"GET / HTTP/3.0\r\n\r\n").await.1, Err(MessageParseError::UnsupportedVersion));
        assert_eq!(parse_request(b"GET / FTP/1.1\r\n\r\n").await.1, Err(MessageParseError::InvalidRequestLine));
        assert_eq!(parse_request(b"GET / HTTP/1.1\r\n\r\n").await.1, Err(MessageParseError::NoHostHeader));
        assert_eq!(parse_request(b"").await.1, Err(MessageParseError::NoRequest));
        assert_eq!(
            parse_request(b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: nope\r\n\r\n").await.1,
            Err(MessageParseError::InvalidBody)
        );

        let long_target = format!("GET /{} HTTP/1.1\r\nHost: h\r\n\r\n", "a".repeat(consts::MAX_URI_LENGTH));
        assert_eq!(parse_request(long_target.as_bytes()).await.1, Err(MessageParseError::UriTooLong));
    }

    #[async_std::test]
    async fn error_status_mapping() {
        assert_eq!(MessageParseError::UriTooLong.status(), StatusCode::UriTooLong);
        assert_eq!(MessageParseError::UnsupportedVersion.status(), StatusCode::HttpVersionNotSupported);
        assert_eq!(MessageParseError::TimedOut.status(), StatusCode::RequestTimeout);
        assert_eq!(MessageParseError::BodyTooLarge.status(), StatusCode::PayloadTooLarge);
        assert_eq!(MessageParseError::InvalidHeader.status(), StatusCode::BadRequest);
    }

    #[async_std::test]
    async fn parses_response_with_body() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi";
        let (mut response, result) = parse_response(wire).await;
        assert_eq!(result, Ok(()));
        assert_eq!(response.status.code, 200);
        assert_eq!(response.status.reason, "OK");
        assert_eq!(response.body.read_all().await, b"hi");
    }

    #[async_std::test]
    async fn parses_response_cookies_and_challenges() {
        let wire = b"HTTP/1.1 401 Unauthorized\r\n\
            Set-Cookie: id=1; HttpOnly\r\n\
            Set-Cookie: theme=light\r\n\
            WWW-Authenticate: Basic realm=\"files\"\r\n\
            Content-Length: 0\r\n\
            \r\n";
        let (response, result) = parse_response(wire).await;
        assert_eq!(result, Ok(()));
        assert_eq!(response.cookies.len(), 2);
        assert_eq!(response.cookies.value("theme"), Some("light"));
        assert_eq!(response.www_authenticate.len(), 1);
        assert_eq!(response.www_authenticate[0].realm, "files");
    }

    #[async_std::test]
    async fn response_reason_defaults_when_missing() {
        let (response, result) = parse_response(b"HTTP/1.1 204\r\n\r\n").await;
        assert_eq!(result, Ok(()));
        assert_eq!(response.status.reason, "No Content");
    }
}
