// Palfrey is a small HTTP/1.x agent library: a strict-but-tolerant wire parser and formatter, an
// RFC 3986 URI model, timeout-aware plain/TLS connections, and server/client agents built on
// async-std tasks.

pub mod client;
pub mod config;
pub mod consts;
pub mod http;
pub mod io;
pub mod log;
pub mod server;
pub mod util;

pub use client::Client;
pub use config::{ServerConfig, TlsConfig};
pub use http::auth::{Auth, AuthChallenge};
pub use http::body::{Body, InputBody, OutputBody};
pub use http::cookie::{Cookie, CookieJar};
pub use http::formatter::Http1Formatter;
pub use http::headers::Headers;
pub use http::message::MessageBuilder;
pub use http::mime::MimeType;
pub use http::parser::{Http1Parser, MessageParseError};
pub use http::protocol::Protocol;
pub use http::request::{Method, Request, RequestFile};
pub use http::response::Response;
pub use http::status::{Status, StatusClass, StatusCode};
pub use http::uri::{Authority, DataMap, Path, Uri};
pub use io::connection::Connection;
pub use io::socket::ListenAddress;
pub use server::{Handler, Server, StopHandle};
pub use server::log_format::LogFormat;
