use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_std::channel::{self, Receiver, Sender};
use async_std::io;
use async_std::net::{TcpListener, TcpStream};
use async_std::prelude::StreamExt;
use async_std::task::{self, JoinHandle};
use async_tls::TlsAcceptor;
use futures::{FutureExt, select};
use futures::future::BoxFuture;

use crate::consts;
use crate::http::formatter::Http1Formatter;
use crate::http::parser::{Http1Parser, MessageParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::{Status, StatusCode};
use crate::io::connection::Connection;
use crate::io::socket::{ListenAddress, SocketStream, TimeoutSocket};
use crate::log;

pub mod log_format;

// Application hooks driven by the server loop. `respond` runs once per parsed request, also for
// requests that failed to parse (the status says how). Handlers for different connections run
// in parallel; any shared state is the implementor's business.
pub trait Handler: Send + Sync + 'static {
    fn respond<'a>(&'a self, request: &'a mut Request, status: Status) -> BoxFuture<'a, Response>;

    // Policy hook before any bytes are read; returning false drops the connection.
    fn accept(&self, _connection: &Connection) -> bool {
        true
    }

    // Per-connection failures land here; the accept loop itself never stops over them.
    fn error(&self, _connection: Option<&Connection>, status: &Status) {
        log::warn(format!("connection error: {}", status));
    }
}

// An HTTP/1.x server: an acceptor task plus one worker task per connection. Configuration must
// be settled before `start`/`run`.
pub struct Server<H: Handler> {
    handler: Arc<H>,
    listen: ListenAddress,
    resolved: Option<ListenAddress>,
    settings: Settings,
    tls: Option<TlsAcceptor>,
    running: Arc<AtomicBool>,
    stop_sender: Sender<()>,
    stop_receiver: Receiver<()>,
    acceptor: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct Settings {
    timeout: Option<Duration>,
    max_request_size: usize,
    max_body_size: usize,
    keep_alive: bool,
}

impl<H: Handler> Server<H> {
    pub fn new(listen: ListenAddress, handler: H) -> Self {
        let (stop_sender, stop_receiver) = channel::bounded(1);
        Server {
            handler: Arc::new(handler),
            listen,
            resolved: None,
            settings: Settings {
                timeout: Some(consts::MAX_READ_TIMEOUT),
                max_request_size: consts::MAX_REQUEST_SIZE,
                max_body_size: consts::MAX_BODY_LENGTH,
                keep_alive: false,
            },
            tls: None,
            running: Arc::new(AtomicBool::new(false)),
            stop_sender,
            stop_receiver,
            acceptor: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.settings.timeout = Some(timeout);
    }

    pub fn clear_timeout(&mut self) {
        self.settings.timeout = None;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.settings.timeout
    }

    // Caps the request line plus header section, in bytes.
    pub fn set_max_request_size(&mut self, size: usize) {
        self.settings.max_request_size = size;
    }

    // Caps accepted message bodies, in bytes.
    pub fn set_max_body_size(&mut self, size: usize) {
        self.settings.max_body_size = size;
    }

    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.settings.keep_alive = keep_alive;
    }

    // Serve TLS connections with this configuration instead of plain TCP.
    pub fn set_tls(&mut self, config: rustls::ServerConfig) {
        self.tls = Some(TlsAcceptor::from(Arc::new(config)));
    }

    // The configured address, or the resolved one (with the OS-assigned port) once bound.
    pub fn listen_address(&self) -> ListenAddress {
        self.resolved.clone().unwrap_or_else(|| self.listen.clone())
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // Binds the listener and launches the acceptor in a background task.
    pub async fn start(&mut self) -> io::Result<()> {
        let listener = self.bind().await?;
        self.running.store(true, Ordering::SeqCst);
        let shared = self.shared();
        self.acceptor = Some(task::spawn(Shared::accept_loop(shared, listener)));
        Ok(())
    }

    // Binds and runs the accept loop in the calling task until a stop handle fires.
    pub async fn run(&mut self) -> io::Result<()> {
        let listener = self.bind().await?;
        self.running.store(true, Ordering::SeqCst);
        Shared::accept_loop(self.shared(), listener).await;
        Ok(())
    }

    // A cloneable handle that can signal shutdown from another task (e.g. a signal handler).
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { sender: self.stop_sender.clone() }
    }

    // Signals the acceptor to finish its current `accept` and return, then joins it. Workers
    // already past accept are left to complete their request.
    pub async fn stop(&mut self) {
        let _ = self.stop_sender.try_send(());
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.await;
        }
    }

    async fn bind(&mut self) -> io::Result<TcpListener> {
        let listener = TcpListener::bind(self.listen.to_string()).await?;
        self.resolved = listener.local_addr().ok().map(ListenAddress::from);
        Ok(listener)
    }

    fn shared(&self) -> Arc<Shared<H>> {
        Arc::new(Shared {
            handler: Arc::clone(&self.handler),
            settings: self.settings.clone(),
            tls: self.tls.clone(),
            running: Arc::clone(&self.running),
            stop_receiver: self.stop_receiver.clone(),
        })
    }
}

#[derive(Clone)]
pub struct StopHandle {
    sender: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.sender.try_send(());
    }
}

struct Shared<H: Handler> {
    handler: Arc<H>,
    settings: Settings,
    tls: Option<TlsAcceptor>,
    running: Arc<AtomicBool>,
    stop_receiver: Receiver<()>,
}

impl<H: Handler> Shared<H> {
    async fn accept_loop(shared: Arc<Self>, listener: TcpListener) {
        let mut incoming = listener.incoming();

        loop {
            select! {
                _ = shared.stop_receiver.recv().fuse() => break,
                stream = incoming.next().fuse() => match stream {
                    Some(Ok(stream)) => {
                        task::spawn(Self::handle_incoming(Arc::clone(&shared), stream));
                    }
                    Some(Err(e)) => {
                        shared.handler.error(None, &Status::with_reason(0, &e.to_string()));
                    }
                    None => break,
                }
            }
        }
        shared.running.store(false, Ordering::SeqCst);
    }

    async fn handle_incoming(shared: Arc<Self>, stream: TcpStream) {
        let stream = match shared.wrap_stream(stream).await {
            Ok(stream) => stream,
            Err(e) => {
                shared.handler.error(None, &Status::with_reason(0, &e.to_string()));
                return;
            }
        };
        let connection = Connection::new(TimeoutSocket::new(stream, shared.settings.timeout));

        if shared.handler.accept(&connection) {
            shared.serve_connection(&connection).await;
        }
        connection.close().await;
    }

    // TLS handshakes happen under the same deadline as any other read.
    async fn wrap_stream(&self, stream: TcpStream) -> io::Result<SocketStream> {
        match &self.tls {
            Some(acceptor) => {
                let handshake = acceptor.accept(stream);
                let stream = match self.settings.timeout {
                    Some(timeout) => io::timeout(timeout, handshake).await?,
                    None => handshake.await?,
                };
                Ok(SocketStream::TlsServer(stream))
            }
            None => Ok(SocketStream::Plain(stream)),
        }
    }

    async fn serve_connection(&self, connection: &Connection) {
        let parser = Http1Parser::default();

        loop {
            connection.expect_input(Some(self.settings.max_request_size)).await;

            let mut request = Request::default();
            request.connection = Some(connection.clone());

            let mut status = match parser.request(connection, &mut request).await {
                Ok(()) => Status::from(StatusCode::Ok),
                // The client closed an idle connection; nothing to respond to.
                Err(MessageParseError::NoRequest) => break,
                Err(e) => e.status(),
            };
            connection.expect_input(None).await;

            // Reject oversized declared bodies up front, before a single body byte is read.
            if status == StatusCode::Ok && request.body.content_length() > self.settings.max_body_size {
                status = StatusCode::PayloadTooLarge.into();
            }
            if let Some(body) = request.body.as_input_mut() {
                body.set_max_size(self.settings.max_body_size);
            }

            let parse_failed = status != StatusCode::Ok;
            let mut response = self.handler.respond(&mut request, status.clone()).await;
            response.connection = Some(connection.clone());

            if let Err(e) = self.send(connection, &request, &mut response).await {
                self.handler.error(Some(connection), &Status::with_reason(0, &e.to_string()));
                break;
            }
            if parse_failed || !self.reuse_connection(&request, &response) {
                break;
            }
        }
    }

    async fn send(&self, connection: &Connection, request: &Request, response: &mut Response) -> io::Result<()> {
        response.clean_body(request);

        let mut wire = Vec::new();
        Http1Formatter.response(&mut wire, response);
        connection.write(&wire).await;
        connection.commit_output().await
    }

    fn reuse_connection(&self, request: &Request, response: &Response) -> bool {
        self.settings.keep_alive
            && !client_intends_to_close(request)
            && !wants_close(response.headers.get(consts::H_CONNECTION))
    }
}

// Both 1.0 and 1.1 peers can veto reuse; 1.0 peers must opt in.
pub(crate) fn client_intends_to_close(request: &Request) -> bool {
    let connection = request.headers.get(consts::H_CONNECTION);
    if request.protocol == crate::http::protocol::Protocol::http_1_1() {
        wants_close(connection)
    } else {
        !connection
            .map(|options| options.eq_ignore_ascii_case(consts::H_CONN_KEEP_ALIVE))
            .unwrap_or(false)
    }
}

fn wants_close(connection_header: Option<&str>) -> bool {
    connection_header
        .map(|options| options.eq_ignore_ascii_case(consts::H_CONN_CLOSE))
        .unwrap_or(false)
}
