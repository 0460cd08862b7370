use seabattle::transport::in_memory::InMemoryTransport;
use seabattle::transport::tcp::TcpTransport;
use seabattle::transport::Transport;
use seabattle::{Coord, Message};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};

fn shot(row: usize, col: usize) -> Message {
    Message::Shot { at: Coord::new(row, col).unwrap() }
}

#[tokio::test]
async fn in_memory_keeps_order() -> anyhow::Result<()> {
    let (mut a, mut b) = InMemoryTransport::pair();
    for i in 0..5 {
        a.send(shot(i, i)).await?;
    }
    b.send(Message::Resign).await?;
    for i in 0..5 {
        assert_eq!(b.recv().await?, shot(i, i));
    }
    assert_eq!(a.recv().await?, Message::Resign);
    Ok(())
}

#[tokio::test]
async fn in_memory_reports_closed_peer() {
    let (mut a, b) = InMemoryTransport::pair();
    drop(b);
    assert!(a.send(Message::Resign).await.is_err());
    assert!(a.recv().await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_frames_round_trip() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut transport = TcpTransport::new(stream);
        let msg = transport.recv().await?;
        transport.send(msg).await?;
        let next = transport.recv().await?;
        transport.send(next).await?;
        anyhow::Ok(())
    });

    let mut client = TcpTransport::connect(addr).await?;
    let big = Message::Error { message: "x".repeat(20_000) };
    client.send(shot(3, 4)).await?;
    assert_eq!(client.recv().await?, shot(3, 4));
    client.send(big.clone()).await?;
    assert_eq!(client.recv().await?, big);
    server.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_rejects_oversized_length_prefix() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let writer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        socket.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).await?;
        socket.flush().await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        anyhow::Ok(())
    });

    let mut transport = TcpTransport::connect(addr).await?;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("too large"), "{}", err);
    writer.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_reports_peer_close_mid_frame() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let writer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        socket.write_all(&100u32.to_be_bytes()).await?;
        socket.write_all(&[0u8; 10]).await?;
        anyhow::Ok(())
    });

    let mut transport = TcpTransport::connect(addr).await?;
    writer.await??;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("closed"), "{}", err);
    Ok(())
}

/// A `recv` abandoned half way through a frame loses nothing.
#[tokio::test(flavor = "multi_thread")]
async fn tcp_recv_is_cancel_safe() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let frame = {
        let body = seabattle::protocol::encode(&shot(9, 9))?;
        let mut frame = (body.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(&body);
        frame
    };

    let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();
    let writer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let split = frame.len() / 2;
        socket.write_all(&frame[..split]).await?;
        socket.flush().await?;
        let _ = go_rx.await;
        socket.write_all(&frame[split..]).await?;
        socket.flush().await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        anyhow::Ok(())
    });

    let mut transport = TcpTransport::connect(addr).await?;
    assert!(timeout(Duration::from_millis(100), transport.recv()).await.is_err());
    let _ = go_tx.send(());
    assert_eq!(transport.recv().await?, shot(9, 9));
    writer.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_idle_timeout() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let holder = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(socket);
        anyhow::Ok(())
    });

    let stream = tokio::net::TcpStream::connect(addr).await?;
    let mut transport = TcpTransport::with_config(
        stream,
        Duration::from_secs(1),
        Some(Duration::from_millis(50)),
        seabattle::MAX_MESSAGE_SIZE,
    );
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("timeout"), "{}", err);
    holder.await??;
    Ok(())
}
