use crate::protocol::Message;

/// Ordered, message-framed link to one peer.
///
/// `recv` must be cancel-safe: the server races it against its outbox in a
/// `select!`, and a dropped `recv` future may not lose a partial frame.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Message>;
}

pub mod in_memory;
pub mod tcp;

pub use in_memory::InMemoryTransport;
pub use tcp::TcpTransport;
