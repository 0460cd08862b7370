use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::protocol::{decode, encode, Message};
use crate::transport::Transport;

/// Default timeout for a single send (30 seconds).
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum frame body size (1 MB); larger length prefixes are rejected
/// before anything is allocated.
pub const MAX_MESSAGE_SIZE: u32 = 1_000_000;

const LEN_PREFIX: usize = 4;
const READ_CHUNK: usize = 4096;

/// Length-prefixed bincode frames over a TCP stream: a 4-byte big-endian
/// body length followed by the body.
pub struct TcpTransport {
    stream: TcpStream,
    send_timeout: Duration,
    idle_timeout: Option<Duration>,
    max_message_size: u32,
    /// Bytes read but not yet consumed as a whole frame.
    pending: Vec<u8>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_config(stream, DEFAULT_SEND_TIMEOUT, None, MAX_MESSAGE_SIZE)
    }

    /// `idle_timeout` bounds how long `recv` waits for the next byte; `None`
    /// waits forever.
    pub fn with_config(
        stream: TcpStream,
        send_timeout: Duration,
        idle_timeout: Option<Duration>,
        max_message_size: u32,
    ) -> Self {
        Self {
            stream,
            send_timeout,
            idle_timeout,
            max_message_size,
            pending: Vec::new(),
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Pop one complete frame off the pending buffer, if there is one.
    fn take_frame(&mut self) -> anyhow::Result<Option<Message>> {
        if self.pending.len() < LEN_PREFIX {
            return Ok(None);
        }
        let mut len_buf = [0u8; LEN_PREFIX];
        len_buf.copy_from_slice(&self.pending[..LEN_PREFIX]);
        let len = u32::from_be_bytes(len_buf);

        if len > self.max_message_size {
            return Err(anyhow::anyhow!(
                "Message too large: {} bytes (max: {})",
                len,
                self.max_message_size
            ));
        }
        if len == 0 {
            return Err(anyhow::anyhow!("Invalid message length: 0"));
        }

        let end = LEN_PREFIX + len as usize;
        if self.pending.len() < end {
            return Ok(None);
        }
        let msg = decode(&self.pending[LEN_PREFIX..end]);
        self.pending.drain(..end);
        msg.map(Some)
    }

    async fn fill(&mut self) -> anyhow::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let read = self.stream.read(&mut chunk);
        let n = match self.idle_timeout {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| anyhow::anyhow!("Receive timeout after {:?}", limit))?,
            None => read.await,
        }
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionReset {
                anyhow::anyhow!("Connection reset by peer")
            } else {
                anyhow::anyhow!("Read error: {}", e)
            }
        })?;
        if n == 0 {
            return Err(anyhow::anyhow!("Connection closed by peer"));
        }
        self.pending.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        let data = encode(&msg)?;
        if data.len() as u64 > self.max_message_size as u64 {
            return Err(anyhow::anyhow!(
                "Message too large: {} bytes (max: {})",
                data.len(),
                self.max_message_size
            ));
        }

        let mut frame = Vec::with_capacity(LEN_PREFIX + data.len());
        frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
        frame.extend_from_slice(&data);

        timeout(self.send_timeout, self.stream.write_all(&frame))
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", self.send_timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::BrokenPipe
                    || e.kind() == std::io::ErrorKind::ConnectionReset
                {
                    anyhow::anyhow!("Connection closed by peer")
                } else {
                    anyhow::anyhow!("Write error: {}", e)
                }
            })
    }

    // Only `read` is awaited and every byte it yields lands in `pending`
    // before the next await, so dropping this future never loses data.
    async fn recv(&mut self) -> anyhow::Result<Message> {
        loop {
            if let Some(msg) = self.take_frame()? {
                return Ok(msg);
            }
            self.fill().await?;
        }
    }
}
