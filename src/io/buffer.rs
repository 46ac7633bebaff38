use async_std::io;

use crate::consts;
use crate::io::socket::TimeoutSocket;

// Buffered input over a socket with an optional byte budget. The server arms the budget before
// parsing so an over-long header section or body fails fast instead of buffering without bound.
pub struct NetworkInputBuffer {
    data: Vec<u8>,
    pos: usize,
    budget: Option<usize>,
    exceeded: bool,
}

impl NetworkInputBuffer {
    pub fn new() -> Self {
        NetworkInputBuffer {
            data: Vec::new(),
            pos: 0,
            budget: None,
            exceeded: false,
        }
    }

    // Sets the remaining input budget; `None` lifts the cap.
    pub fn expect_input(&mut self, budget: Option<usize>) {
        self.budget = budget;
        self.exceeded = false;
    }

    pub fn exceeded(&self) -> bool {
        self.exceeded
    }

    fn available(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn consume(&mut self, count: usize) -> Vec<u8> {
        let consumed = self.data[self.pos..self.pos + count].to_vec();
        self.pos += count;
        if self.pos == self.data.len() {
            self.data.clear();
            self.pos = 0;
        }
        consumed
    }

    async fn fill(&mut self, socket: &mut TimeoutSocket) -> io::Result<usize> {
        if let Some(0) = self.budget {
            self.exceeded = true;
            return Err(io::Error::new(io::ErrorKind::Other, "input budget exceeded"));
        }

        let mut chunk = [0u8; consts::READ_CHUNK_SIZE];
        let cap = self.budget.unwrap_or(chunk.len()).min(chunk.len());
        let count = socket.read(&mut chunk[..cap]).await?;

        if let Some(budget) = &mut self.budget {
            *budget -= count;
        }
        self.data.extend_from_slice(&chunk[..count]);
        Ok(count)
    }

    // Reads through the next LF, tolerating bare-LF input, and returns the line without its
    // terminator. EOF before any terminator is an error.
    pub async fn read_line(&mut self, socket: &mut TimeoutSocket) -> io::Result<String> {
        loop {
            if let Some(index) = self.available().iter().position(|&b| b == b'\n') {
                let mut line = self.consume(index + 1);
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if self.fill(socket).await? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed mid-line"));
            }
        }
    }

    pub async fn read_exact(&mut self, socket: &mut TimeoutSocket, len: usize) -> io::Result<Vec<u8>> {
        while self.available().len() < len {
            if self.fill(socket).await? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed mid-body"));
            }
        }
        Ok(self.consume(len))
    }

    // Whether any unread bytes are already buffered.
    pub fn has_buffered(&self) -> bool {
        self.pos < self.data.len()
    }
}

// Outgoing bytes staged until `commit` pushes them down the socket in one write.
pub struct NetworkOutputBuffer {
    data: Vec<u8>,
}

impl NetworkOutputBuffer {
    pub fn new() -> Self {
        NetworkOutputBuffer { data: Vec::new() }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub async fn commit(&mut self, socket: &mut TimeoutSocket) -> io::Result<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut self.data);
        socket.write_all(&data).await?;
        socket.flush().await
    }
}
