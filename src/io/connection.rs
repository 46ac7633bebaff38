use std::net::SocketAddr;
use std::time::Duration;

use async_std::io;
use async_std::sync::{Arc, Mutex};

use crate::io::buffer::{NetworkInputBuffer, NetworkOutputBuffer};
use crate::io::socket::TimeoutSocket;

struct ConnectionData {
    socket: TimeoutSocket,
    input: NetworkInputBuffer,
    output: NetworkOutputBuffer,
}

// A shared handle over one socket and its buffers. Clones refer to the same underlying
// connection, so the parser, formatter, and handler all observe the same state and closing any
// handle closes them all. Equality is identity. Concurrent use of one connection from two tasks
// is a contract violation; the internal lock only serializes individual operations.
#[derive(Clone)]
pub struct Connection {
    data: Arc<Mutex<ConnectionData>>,
}

impl Connection {
    pub fn new(socket: TimeoutSocket) -> Self {
        Connection {
            data: Arc::new(Mutex::new(ConnectionData {
                socket,
                input: NetworkInputBuffer::new(),
                output: NetworkOutputBuffer::new(),
            })),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(input: &[u8]) -> Self {
        use crate::io::socket::SocketStream;
        let cursor = futures::io::Cursor::new(input.to_vec());
        Connection::new(TimeoutSocket::new(SocketStream::Memory(cursor), None))
    }

    // Arms the input buffer's byte budget for the next message phase.
    pub async fn expect_input(&self, budget: Option<usize>) {
        self.data.lock().await.input.expect_input(budget);
    }

    // Whether the last input failure was the budget being exhausted.
    pub async fn input_exceeded(&self) -> bool {
        self.data.lock().await.input.exceeded()
    }

    pub async fn read_line(&self) -> io::Result<String> {
        let mut data = self.data.lock().await;
        let ConnectionData { socket, input, .. } = &mut *data;
        input.read_line(socket).await
    }

    pub async fn read_exact(&self, len: usize) -> io::Result<Vec<u8>> {
        let mut data = self.data.lock().await;
        let ConnectionData { socket, input, .. } = &mut *data;
        input.read_exact(socket, len).await
    }

    pub async fn has_buffered_input(&self) -> bool {
        self.data.lock().await.input.has_buffered()
    }

    pub async fn write(&self, bytes: &[u8]) {
        self.data.lock().await.output.write(bytes);
    }

    // Flushes everything staged in the output buffer down the socket.
    pub async fn commit_output(&self) -> io::Result<()> {
        let mut data = self.data.lock().await;
        let ConnectionData { socket, output, .. } = &mut *data;
        output.commit(socket).await
    }

    pub async fn close(&self) {
        self.data.lock().await.socket.close();
    }

    pub async fn connected(&self) -> bool {
        self.data.lock().await.socket.is_open()
    }

    pub async fn timed_out(&self) -> bool {
        self.data.lock().await.socket.timed_out()
    }

    pub async fn timeout(&self) -> Option<Duration> {
        self.data.lock().await.socket.timeout()
    }

    pub async fn set_timeout(&self, timeout: Option<Duration>) {
        self.data.lock().await.socket.set_timeout(timeout);
    }

    pub async fn local_address(&self) -> Option<SocketAddr> {
        self.data.lock().await.socket.local_address()
    }

    pub async fn remote_address(&self) -> Option<SocketAddr> {
        self.data.lock().await.socket.remote_address()
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Connection {}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Connection({:p})", Arc::as_ptr(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn clones_share_identity() {
        let connection = Connection::from_bytes(b"");
        let clone = connection.clone();
        assert_eq!(connection, clone);
        assert_ne!(connection, Connection::from_bytes(b""));

        clone.close().await;
        assert!(!connection.connected().await);
    }

    #[async_std::test]
    async fn reads_through_shared_handle() {
        let connection = Connection::from_bytes(b"line\r\nrest");
        let clone = connection.clone();
        assert_eq!(connection.read_line().await.unwrap(), "line");
        assert_eq!(clone.read_exact(4).await.unwrap(), b"rest");
    }
}
