// Request and response structs.
pub mod request;
pub mod response;

// URI structs, percent-encoding, and query string handling.
pub mod uri;

// HTTP message header section struct.
pub mod headers;

// Cookie jar and Set-Cookie attribute handling.
pub mod cookie;

// Authorization credentials and authentication challenges.
pub mod auth;

// Media type parsing.
pub mod mime;

// Protocol name/version pairs.
pub mod protocol;

// Status codes, classes, and reason phrases.
pub mod status;

// Message body framing and buffers.
pub mod body;

// multipart/form-data decoding.
mod multipart;

// HTTP message builder.
pub mod message;

// HTTP/1.x message parser.
pub mod parser;

// HTTP/1.x message formatter.
pub mod formatter;

// Shared k=v list tokenizing.
mod syntax;
