use std::fmt::{self, Display, Formatter};
use std::net::{Shutdown, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use async_std::io;
use async_std::net::TcpStream;
use futures::{AsyncReadExt, AsyncWriteExt};

// A host and port to bind to; port 0 asks the OS for an ephemeral port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl ListenAddress {
    pub fn new(host: &str, port: u16) -> Self {
        ListenAddress { host: host.to_string(), port }
    }

    // A wildcard bind on the given port.
    pub fn any(port: u16) -> Self {
        ListenAddress::new("0.0.0.0", port)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let colon = raw.rfind(':')?;
        let port = raw[colon + 1..].parse().ok()?;
        Some(ListenAddress::new(&raw[..colon], port))
    }
}

impl From<SocketAddr> for ListenAddress {
    fn from(addr: SocketAddr) -> Self {
        ListenAddress::new(&addr.ip().to_string(), addr.port())
    }
}

impl FromStr for ListenAddress {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ListenAddress::parse(raw).ok_or(())
    }
}

impl Display for ListenAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// The transport variants sharing one read/write/close surface. TLS streams are wrapped before
// construction; this type never performs handshakes itself.
pub enum SocketStream {
    Plain(TcpStream),
    TlsServer(async_tls::server::TlsStream<TcpStream>),
    TlsClient(async_tls::client::TlsStream<TcpStream>),
    #[cfg(test)]
    Memory(futures::io::Cursor<Vec<u8>>),
}

impl SocketStream {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SocketStream::Plain(stream) => stream.read(buf).await,
            SocketStream::TlsServer(stream) => stream.read(buf).await,
            SocketStream::TlsClient(stream) => stream.read(buf).await,
            #[cfg(test)]
            SocketStream::Memory(cursor) => cursor.read(buf).await,
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            SocketStream::Plain(stream) => stream.write_all(buf).await,
            SocketStream::TlsServer(stream) => stream.write_all(buf).await,
            SocketStream::TlsClient(stream) => stream.write_all(buf).await,
            #[cfg(test)]
            SocketStream::Memory(cursor) => cursor.write_all(buf).await,
        }
    }

    async fn flush(&mut self) -> io::Result<()> {
        match self {
            SocketStream::Plain(stream) => stream.flush().await,
            SocketStream::TlsServer(stream) => stream.flush().await,
            SocketStream::TlsClient(stream) => stream.flush().await,
            #[cfg(test)]
            SocketStream::Memory(cursor) => cursor.flush().await,
        }
    }

    fn tcp(&self) -> Option<&TcpStream> {
        match self {
            SocketStream::Plain(stream) => Some(stream),
            SocketStream::TlsServer(stream) => Some(stream.get_ref()),
            SocketStream::TlsClient(stream) => Some(stream.get_ref()),
            #[cfg(test)]
            SocketStream::Memory(_) => None,
        }
    }
}

// A socket with a configurable deadline on every read and write. A timed-out operation fails
// with `ErrorKind::TimedOut` and leaves a sticky flag for the parser to translate.
pub struct TimeoutSocket {
    stream: SocketStream,
    timeout: Option<Duration>,
    timed_out: bool,
    open: bool,
}

impl TimeoutSocket {
    pub fn new(stream: SocketStream, timeout: Option<Duration>) -> Self {
        TimeoutSocket { stream, timeout, timed_out: false, open: true }
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = match self.timeout {
            Some(duration) => io::timeout(duration, self.stream.read(buf)).await,
            None => self.stream.read(buf).await,
        };
        self.note_timeout(&result);
        result
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let result = match self.timeout {
            Some(duration) => io::timeout(duration, self.stream.write_all(buf)).await,
            None => self.stream.write_all(buf).await,
        };
        self.note_timeout(&result);
        result
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    fn note_timeout<T>(&mut self, result: &io::Result<T>) {
        if let Err(e) = result {
            if e.kind() == io::ErrorKind::TimedOut {
                self.timed_out = true;
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(tcp) = self.stream.tcp() {
            let _ = tcp.shutdown(Shutdown::Both);
        }
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn local_address(&self) -> Option<SocketAddr> {
        self.stream.tcp().and_then(|tcp| tcp.local_addr().ok())
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.stream.tcp().and_then(|tcp| tcp.peer_addr().ok())
    }

    #[cfg(test)]
    pub fn into_memory(self) -> Option<Vec<u8>> {
        match self.stream {
            SocketStream::Memory(cursor) => Some(cursor.into_inner()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_parses_host_and_port() {
        assert_eq!(ListenAddress::parse("127.0.0.1:8080"), Some(ListenAddress::new("127.0.0.1", 8080)));
        assert_eq!(ListenAddress::parse("[::1]:80"), Some(ListenAddress::new("[::1]", 80)));
        assert_eq!(ListenAddress::parse("nope"), None);
        assert_eq!(ListenAddress::any(0).to_string(), "0.0.0.0:0");
    }

    #[async_std::test]
    async fn memory_socket_reads_and_writes() {
        let mut socket = TimeoutSocket::new(SocketStream::Memory(futures::io::Cursor::new(b"abc".to_vec())), None);
        let mut buf = [0u8; 2];
        assert_eq!(socket.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf, b"ab");
        assert!(!socket.timed_out());
    }
}
