use std::fmt::Write;

use regex::Regex;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::io::socket::ListenAddress;

const DEFAULT_TIME_FORMAT: &str = "[%d/%b/%Y:%H:%M:%S %z]";

// An Apache-style access log format, parsed once into a token list and expanded per exchange.
// Directives are `%x` or `%{argument}x`; unknown labels expand to nothing.
pub struct LogFormat {
    tokens: Vec<LogToken>,
}

enum LogToken {
    Literal(String),
    Field { label: char, argument: String },
}

impl LogFormat {
    pub fn parse(format: &str) -> Self {
        let directive = Regex::new(r"%(?:\{([^}]*)\})?(.)").unwrap();
        let mut tokens = Vec::new();
        let mut last_end = 0;

        for capture in directive.captures_iter(format) {
            let whole = capture.get(0).unwrap();
            if whole.start() > last_end {
                tokens.push(LogToken::Literal(format[last_end..whole.start()].to_string()));
            }
            last_end = whole.end();

            let label = capture.get(2).unwrap().as_str().chars().next().unwrap();
            if label == '%' {
                tokens.push(LogToken::Literal("%".to_string()));
            } else {
                tokens.push(LogToken::Field {
                    label,
                    argument: capture.get(1).map(|arg| arg.as_str().to_string()).unwrap_or_default(),
                });
            }
        }
        if last_end < format.len() {
            tokens.push(LogToken::Literal(format[last_end..].to_string()));
        }
        LogFormat { tokens }
    }

    pub async fn expand(&self, request: &Request, response: &Response, listen: Option<&ListenAddress>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                LogToken::Literal(text) => out.push_str(text),
                LogToken::Field { label, argument } => {
                    let field = expand_field(*label, argument, request, response, listen).await;
                    out.push_str(&field);
                }
            }
        }
        out
    }
}

async fn expand_field(
    label: char,
    argument: &str,
    request: &Request,
    response: &Response,
    listen: Option<&ListenAddress>,
) -> String {
    match label {
        // Remote and local endpoint addresses.
        'h' | 'a' => match &request.connection {
            Some(connection) => connection
                .remote_address()
                .await
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "-".to_string()),
            None => "-".to_string(),
        },
        'A' => match &request.connection {
            Some(connection) => connection
                .local_address()
                .await
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "-".to_string()),
            None => "-".to_string(),
        },
        'B' => response.body.content_length().to_string(),
        'b' => clf(response.body.content_length()),
        'C' => request.cookies.value(argument).unwrap_or("-").to_string(),
        'D' => service_time_us(request, response).to_string(),
        'H' => request.protocol.to_string(),
        'i' => request.headers.get(argument).unwrap_or("-").to_string(),
        'm' => request.method.to_string(),
        'o' => response.headers.get(argument).unwrap_or("-").to_string(),
        'p' => match argument {
            "remote" => match &request.connection {
                Some(connection) => connection
                    .remote_address()
                    .await
                    .map(|addr| addr.port().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                None => "-".to_string(),
            },
            "local" => match &request.connection {
                Some(connection) => connection
                    .local_address()
                    .await
                    .map(|addr| addr.port().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                None => "-".to_string(),
            },
            _ => listen.map(|listen| listen.port.to_string()).unwrap_or_else(|| "-".to_string()),
        },
        'P' => worker_id(),
        'q' => request.uri.query_string(true),
        'r' => format!("{} {} {}", request.method, request.uri.full(), request.protocol),
        's' => response.status.code.to_string(),
        't' => {
            let pattern = if argument.is_empty() { DEFAULT_TIME_FORMAT } else { argument };
            let mut formatted = String::new();
            match write!(formatted, "{}", request.received_date.format(pattern)) {
                Ok(()) => formatted,
                Err(_) => String::new(),
            }
        }
        'T' => {
            let us = service_time_us(request, response);
            match argument {
                "us" => us.to_string(),
                "ms" => (us / 1_000).to_string(),
                _ => (us / 1_000_000).to_string(),
            }
        }
        'u' => {
            if request.auth.user.is_empty() {
                "-".to_string()
            } else {
                request.auth.user.clone()
            }
        }
        'U' => request.uri.path.url_encoded(),
        'X' => (if response.status.is_error() { "X" } else { "-" }).to_string(),
        _ => String::new(),
    }
}

// CLF prints a dash where a count would be zero.
fn clf(count: usize) -> String {
    if count == 0 {
        "-".to_string()
    } else {
        count.to_string()
    }
}

fn service_time_us(request: &Request, response: &Response) -> i64 {
    (response.date - request.received_date).num_microseconds().unwrap_or(0).max(0)
}

fn worker_id() -> String {
    let id = format!("{:?}", std::thread::current().id());
    let digits = id.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
    if digits.is_empty() {
        id
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::http::request::Method;
    use crate::http::status::StatusCode;
    use crate::http::uri::Uri;
    use crate::http::cookie::Cookie;

    fn exchange() -> (Request, Response) {
        let mut request = Request::new(Method::Get, Uri::parse("/files/a.txt?dl=1").unwrap());
        request.protocol = crate::http::protocol::Protocol::http_1_1();
        request.headers.append("Referer", "http://other.example/");
        request.cookies.append(Cookie::new("session", "s123"));
        request.received_date = Utc.timestamp(1_600_000_000, 0);

        let mut response = Response::new(StatusCode::Ok.into());
        response.body.start_output("text/plain").write(b"hello");
        response.date = request.received_date + Duration::microseconds(2_500);
        (request, response)
    }

    #[async_std::test]
    async fn expands_literals_and_escapes() {
        let (request, response) = exchange();
        let line = LogFormat::parse("100%% done").expand(&request, &response, None).await;
        assert_eq!(line, "100% done");
    }

    #[async_std::test]
    async fn expands_request_fields() {
        let (request, response) = exchange();
        let format = LogFormat::parse("%m %U%q -> %s %B bytes");
        let line = format.expand(&request, &response, None).await;
        assert_eq!(line, "GET /files/a.txt?dl=1 -> 200 5 bytes");
    }

    #[async_std::test]
    async fn expands_first_request_line() {
        let (request, response) = exchange();
        let line = LogFormat::parse("%r").expand(&request, &response, None).await;
        assert_eq!(line, "GET /files/a.txt?dl=1 HTTP/1.1");
    }

    #[async_std::test]
    async fn expands_arguments() {
        let (request, response) = exchange();
        let format = LogFormat::parse("%{session}C %{Referer}i %{missing}i");
        let line = format.expand(&request, &response, None).await;
        assert_eq!(line, "s123 http://other.example/ -");
    }

    #[async_std::test]
    async fn expands_times() {
        let (request, response) = exchange();
        assert_eq!(LogFormat::parse("%D").expand(&request, &response, None).await, "2500");
        assert_eq!(LogFormat::parse("%{us}T").expand(&request, &response, None).await, "2500");
        assert_eq!(LogFormat::parse("%{ms}T").expand(&request, &response, None).await, "2");
        assert_eq!(LogFormat::parse("%{s}T").expand(&request, &response, None).await, "0");
        assert_eq!(LogFormat::parse("%{%Y}t").expand(&request, &response, None).await, "2020");
    }

    #[async_std::test]
    async fn missing_connection_renders_dashes() {
        let (request, response) = exchange();
        let line = LogFormat::parse("%h:%{remote}p %{canonical}p").expand(&request, &response, None).await;
        assert_eq!(line, "-:- -");
    }

    #[async_std::test]
    async fn canonical_port_uses_listen_address() {
        let (request, response) = exchange();
        let listen = ListenAddress::new("0.0.0.0", 8080);
        let line = LogFormat::parse("%p").expand(&request, &response, Some(&listen)).await;
        assert_eq!(line, "8080");
    }

    #[async_std::test]
    async fn clf_dash_for_empty_body() {
        let (request, mut response) = exchange();
        response.body.stop_output();
        assert_eq!(LogFormat::parse("%B %b").expand(&request, &response, None).await, "0 -");
    }

    #[async_std::test]
    async fn completion_flag() {
        let (request, mut response) = exchange();
        assert_eq!(LogFormat::parse("%X").expand(&request, &response, None).await, "-");
        response.status = StatusCode::InternalServerError.into();
        assert_eq!(LogFormat::parse("%X").expand(&request, &response, None).await, "X");
    }
}
