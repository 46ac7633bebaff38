use std::sync::Arc;
use std::time::Duration;

use async_std::io;
use async_std::net::TcpStream;
use async_tls::TlsConnector;

use crate::consts;
use crate::http::formatter::Http1Formatter;
use crate::http::parser::Http1Parser;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::{Status, StatusCode};
use crate::http::uri::Authority;
use crate::io::connection::Connection;
use crate::io::socket::{SocketStream, TimeoutSocket};
use crate::server::client_intends_to_close;

// An HTTP/1.x client. `query` runs one exchange against the request's URI, dialing TLS for
// `https`. A connection is kept for reuse when both sides allow it and silently redialed when
// it cannot be used again.
pub struct Client {
    timeout: Option<Duration>,
    max_response_size: usize,
    tls: TlsConnector,
    reuse: Option<(Authority, Connection)>,
}

impl Default for Client {
    fn default() -> Self {
        Client::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Client {
            timeout: Some(consts::MAX_READ_TIMEOUT),
            max_response_size: consts::MAX_BODY_LENGTH,
            tls: TlsConnector::default(),
            reuse: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn set_max_response_size(&mut self, size: usize) {
        self.max_response_size = size;
    }

    // Use this TLS configuration for `https` destinations (e.g. to pin trust roots).
    pub fn set_tls(&mut self, config: rustls::ClientConfig) {
        self.tls = TlsConnector::from(Arc::new(config));
    }

    // Sends `request` to the authority in its URI and parses the reply into `response`.
    // Transport failures are the `Err` side; parse results come back as the `Ok` status.
    pub async fn query(&mut self, request: &mut Request, response: &mut Response) -> io::Result<Status> {
        let connection = self.obtain_connection(request).await?;

        let mut wire = Vec::new();
        Http1Formatter.request(&mut wire, request);
        connection.write(&wire).await;
        connection.commit_output().await?;

        connection.expect_input(Some(self.max_response_size)).await;
        let status = match Http1Parser::default().response(&connection, response).await {
            Ok(()) => Status::from(StatusCode::Ok),
            Err(e) => e.status(),
        };
        connection.expect_input(None).await;
        response.connection = Some(connection.clone());

        self.retain_or_close(request, response, connection).await;
        Ok(status)
    }

    async fn obtain_connection(&mut self, request: &Request) -> io::Result<Connection> {
        let authority = &request.uri.authority;
        if authority.host.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "request URI has no host"));
        }

        if let Some((held_authority, connection)) = self.reuse.take() {
            if held_authority == *authority && connection.connected().await {
                return Ok(connection);
            }
            connection.close().await;
        }
        self.dial(request).await
    }

    async fn dial(&self, request: &Request) -> io::Result<Connection> {
        let authority = &request.uri.authority;
        let https = request.uri.scheme.eq_ignore_ascii_case("https");
        let host = authority.host.trim_start_matches('[').trim_end_matches(']').to_string();
        let port = authority.port.unwrap_or(if https { 443 } else { 80 });

        let connect = TcpStream::connect((host.as_str(), port));
        let stream = match self.timeout {
            Some(timeout) => io::timeout(timeout, connect).await?,
            None => connect.await?,
        };

        let stream = if https {
            let handshake = self.tls.connect(&authority.host, stream);
            let stream = match self.timeout {
                Some(timeout) => io::timeout(timeout, handshake).await?,
                None => handshake.await?,
            };
            SocketStream::TlsClient(stream)
        } else {
            SocketStream::Plain(stream)
        };
        Ok(Connection::new(TimeoutSocket::new(stream, self.timeout)))
    }

    // Keeps the connection only when both request and response allow reuse; anything ambiguous
    // degrades to close.
    async fn retain_or_close(&mut self, request: &Request, response: &Response, connection: Connection) {
        let response_closes = response
            .headers
            .get(consts::H_CONNECTION)
            .map(|options| options.eq_ignore_ascii_case(consts::H_CONN_CLOSE))
            .unwrap_or(response.protocol != crate::http::protocol::Protocol::http_1_1());

        if !client_intends_to_close(request) && !response_closes && connection.connected().await {
            self.reuse = Some((request.uri.authority.clone(), connection));
        } else {
            connection.close().await;
        }
    }
}
