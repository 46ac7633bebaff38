use std::time::Duration;

pub const OPTIONAL_WHITESPACE: &[char] = &[' ', '\t'];
pub const CRLF: &str = "\r\n";

pub const SERVER_NAME_VERSION: &str = "Palfrey/0.1.0";

pub const MAX_URI_LENGTH: usize = 8_192;
pub const MAX_REQUEST_SIZE: usize = 16_384;
pub const MAX_BODY_LENGTH: usize = 4_194_304;
pub const MAX_READ_TIMEOUT: Duration = Duration::from_secs(10);

pub const READ_CHUNK_SIZE: usize = 4_096;

pub const H_HOST: &str = "Host";
pub const H_CONTENT_LENGTH: &str = "Content-Length";
pub const H_CONTENT_TYPE: &str = "Content-Type";
pub const H_TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const H_CONNECTION: &str = "Connection";
pub const H_COOKIE: &str = "Cookie";
pub const H_SET_COOKIE: &str = "Set-Cookie";
pub const H_AUTHORIZATION: &str = "Authorization";
pub const H_PROXY_AUTHORIZATION: &str = "Proxy-Authorization";
pub const H_WWW_AUTHENTICATE: &str = "WWW-Authenticate";
pub const H_PROXY_AUTHENTICATE: &str = "Proxy-Authenticate";
pub const H_LOCATION: &str = "Location";
pub const H_DATE: &str = "Date";
pub const H_USER_AGENT: &str = "User-Agent";
pub const H_SERVER: &str = "Server";
pub const H_EXPECT: &str = "Expect";

pub const H_T_ENC_CHUNKED: &str = "chunked";

pub const H_CONN_KEEP_ALIVE: &str = "keep-alive";
pub const H_CONN_CLOSE: &str = "close";

pub const H_EXPECT_CONTINUE: &str = "100-continue";

pub const H_AUTH_BASIC: &str = "Basic";
pub const H_AUTH_REALM: &str = "realm";

pub const H_MEDIA_BINARY: &str = "application/octet-stream";
pub const H_MEDIA_TEXT: &str = "text/plain";
pub const H_MEDIA_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const H_MEDIA_FORM_DATA: &str = "multipart/form-data";
