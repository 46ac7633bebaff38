use crate::consts;
use crate::http::headers::Headers;
use crate::http::mime::MimeType;
use crate::io::connection::Connection;

// How a message body is delimited on the wire, decided from the received headers. Chunked
// framing only applies when no Content-Length is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyFraming {
    Empty,
    ContentLength(usize),
    Chunked,
}

// Raised when the framing headers are unusable: a non-numeric Content-Length or a transfer
// encoding other than chunked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InvalidFraming;

impl BodyFraming {
    pub fn from_headers(headers: &Headers) -> Result<Self, InvalidFraming> {
        if let Some(encoding) = headers.get(consts::H_TRANSFER_ENCODING) {
            if !encoding.trim().eq_ignore_ascii_case(consts::H_T_ENC_CHUNKED) {
                return Err(InvalidFraming);
            }
            if !headers.contains(consts::H_CONTENT_LENGTH) {
                return Ok(BodyFraming::Chunked);
            }
        }
        match headers.get(consts::H_CONTENT_LENGTH) {
            Some(length) => match length.trim().parse() {
                Ok(length) => Ok(BodyFraming::ContentLength(length)),
                Err(_) => Err(InvalidFraming),
            },
            None => Ok(BodyFraming::Empty),
        }
    }
}

// An unread message body attached to the connection's input buffer. Reading is lazy: the parser
// only records the framing, and `read_all` later pulls exactly the framed bytes. Any framing
// violation (short read, oversize chunked body, malformed chunk header) sets a sticky error
// flag for the handler to observe.
pub struct InputBody {
    content_type: MimeType,
    framing: BodyFraming,
    content_length: usize,
    max_size: Option<usize>,
    error: bool,
    eof: bool,
    connection: Option<Connection>,
}

impl Default for InputBody {
    fn default() -> Self {
        InputBody {
            content_type: MimeType::default(),
            framing: BodyFraming::Empty,
            content_length: 0,
            max_size: None,
            error: false,
            eof: false,
            connection: None,
        }
    }
}

impl InputBody {
    pub(crate) fn start_input(headers: &Headers, connection: Connection) -> Result<Self, InvalidFraming> {
        let framing = BodyFraming::from_headers(headers)?;
        let content_type = headers.get(consts::H_CONTENT_TYPE).map(MimeType::parse).unwrap_or_default();
        let content_length = match framing {
            BodyFraming::ContentLength(length) => length,
            _ => 0,
        };

        Ok(InputBody {
            content_type,
            framing,
            content_length,
            connection: Some(connection),
            ..InputBody::default()
        })
    }

    pub fn has_data(&self) -> bool {
        self.framing != BodyFraming::Empty
    }

    pub fn is_chunked(&self) -> bool {
        self.framing == BodyFraming::Chunked
    }

    // For length-delimited bodies, the declared size; for chunked bodies, the total read so far.
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn content_type(&self) -> &MimeType {
        &self.content_type
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    pub(crate) fn set_max_size(&mut self, max_size: usize) {
        self.max_size = Some(max_size);
    }

    // Drains the whole framed body. On failure the sticky error flag is set and whatever was
    // read is returned.
    pub async fn read_all(&mut self) -> Vec<u8> {
        if self.eof {
            return Vec::new();
        }
        self.eof = true;

        let connection = match (&self.connection, &self.framing) {
            (_, BodyFraming::Empty) => return Vec::new(),
            (Some(connection), _) => connection.clone(),
            (None, _) => {
                self.error = true;
                return Vec::new();
            }
        };

        match self.framing.clone() {
            BodyFraming::ContentLength(length) => match connection.read_exact(length).await {
                Ok(data) => data,
                Err(_) => {
                    self.error = true;
                    Vec::new()
                }
            },
            BodyFraming::Chunked => {
                let data = self.read_chunked(&connection).await;
                self.content_length = data.len();
                data
            }
            BodyFraming::Empty => unreachable!(),
        }
    }

    // Reads size-prefixed chunks until the zero-size terminator, then reads and discards any
    // trailer fields. Chunk extensions after ';' are ignored.
    async fn read_chunked(&mut self, connection: &Connection) -> Vec<u8> {
        let mut body = Vec::new();

        loop {
            let line = match connection.read_line().await {
                Ok(line) => line,
                Err(_) => return self.fail(body),
            };
            let size_part = line.split(';').next().unwrap_or("").trim();
            let chunk_size = match usize::from_str_radix(size_part, 16) {
                Ok(size) => size,
                Err(_) => return self.fail(body),
            };

            if chunk_size == 0 {
                break;
            }
            if let Some(max_size) = self.max_size {
                if body.len() + chunk_size > max_size {
                    return self.fail(body);
                }
            }

            match connection.read_exact(chunk_size).await {
                Ok(chunk) => body.extend_from_slice(&chunk),
                Err(_) => return self.fail(body),
            }
            match connection.read_line().await {
                Ok(line) if line.is_empty() => {}
                _ => return self.fail(body),
            }
        }

        // Trailer section: fields until the empty line, all discarded.
        loop {
            match connection.read_line().await {
                Ok(line) if line.is_empty() => break,
                Ok(_) => {}
                Err(_) => return self.fail(body),
            }
        }
        body
    }

    fn fail(&mut self, partial: Vec<u8>) -> Vec<u8> {
        self.error = true;
        partial
    }
}

// An in-memory body under construction for sending. `start_output` arms it with a content type;
// `stop_output` drops the data and disables emission (used when a status forbids a body).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputBody {
    content_type: MimeType,
    data: Vec<u8>,
    active: bool,
}

impl OutputBody {
    pub fn start_output(content_type: &str) -> Self {
        OutputBody {
            content_type: MimeType::parse(content_type),
            data: Vec::new(),
            active: true,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        if self.active {
            self.data.extend_from_slice(bytes);
        }
    }

    pub fn stop_output(&mut self) {
        self.data.clear();
        self.active = false;
    }

    pub fn has_data(&self) -> bool {
        self.active
    }

    pub fn content_length(&self) -> usize {
        self.data.len()
    }

    pub fn content_type(&self) -> &MimeType {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

// The body slot on a message: nothing, a parsed incoming stream, or an outgoing buffer.
pub enum Body {
    Empty,
    Input(InputBody),
    Output(OutputBody),
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl Body {
    pub fn has_data(&self) -> bool {
        match self {
            Body::Empty => false,
            Body::Input(input) => input.has_data(),
            Body::Output(output) => output.has_data(),
        }
    }

    pub fn content_length(&self) -> usize {
        match self {
            Body::Empty => 0,
            Body::Input(input) => input.content_length(),
            Body::Output(output) => output.content_length(),
        }
    }

    pub fn content_type(&self) -> MimeType {
        match self {
            Body::Empty => MimeType::default(),
            Body::Input(input) => input.content_type().clone(),
            Body::Output(output) => output.content_type().clone(),
        }
    }

    pub fn error(&self) -> bool {
        matches!(self, Body::Input(input) if input.error())
    }

    // Switches this slot to an output body with the given content type.
    pub fn start_output(&mut self, content_type: &str) -> &mut OutputBody {
        *self = Body::Output(OutputBody::start_output(content_type));
        match self {
            Body::Output(output) => output,
            _ => unreachable!(),
        }
    }

    pub fn stop_output(&mut self) {
        if let Body::Output(output) = self {
            output.stop_output();
        }
        *self = Body::Empty;
    }

    pub async fn read_all(&mut self) -> Vec<u8> {
        match self {
            Body::Empty => Vec::new(),
            Body::Input(input) => input.read_all().await,
            Body::Output(output) => output.data().to_vec(),
        }
    }

    pub fn as_output(&self) -> Option<&OutputBody> {
        match self {
            Body::Output(output) => Some(output),
            _ => None,
        }
    }

    pub fn as_input_mut(&mut self) -> Option<&mut InputBody> {
        match self {
            Body::Input(input) => Some(input),
            _ => None,
        }
    }
}
