// WebSocket server for communication with the messaging bridge.

use async_trait::async_trait;
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug, PartialEq)]
pub enum WsEvent {
    /// A new WebSocket client has connected.
    Connected { addr: String },
    /// The current WebSocket client has disconnected.
    Disconnected,
    /// A text message was received from the client (raw JSON string).
    Message(String),
}

/// Source of raw client connections.
#[async_trait]
pub trait Listener: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Wait for the next client. Returns the stream and a printable peer
    /// address.
    async fn accept(&mut self) -> std::io::Result<(Self::Stream, String)>;
}

/// TCP listener bound to the loopback interface.
pub struct TungsteniteListener {
    inner: TcpListener,
}

impl TungsteniteListener {
    pub async fn bind(port: u16) -> anyhow::Result<Self> {
        let inner = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        info!("WebSocket server listening on {}", inner.local_addr()?);
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.inner.local_addr()
    }
}

#[async_trait]
impl Listener for TungsteniteListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> std::io::Result<(TcpStream, String)> {
        let (stream, addr) = self.inner.accept().await?;
        Ok((stream, addr.to_string()))
    }
}

/// Run the WebSocket server, forwarding inbound events through `tx` and
/// writing every string from `out_rx` to the connected client.
///
/// Accepts one connection at a time. Outbound messages produced while no
/// client is connected are dropped. Returns when either channel closes.
pub async fn run<L: Listener>(
    mut listener: L,
    tx: mpsc::Sender<WsEvent>,
    mut out_rx: mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            out = out_rx.recv() => {
                match out {
                    Some(_) => {
                        debug!("Dropping outbound message: no client connected");
                        continue;
                    }
                    None => return Ok(()),
                }
            }
        };
        info!("Accepted connection from {addr}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {addr}: {e}");
                continue;
            }
        };

        if tx
            .send(WsEvent::Connected { addr: addr.clone() })
            .await
            .is_err()
        {
            return Ok(());
        }

        let (mut write, mut read) = ws_stream.split();
        let keep_running = loop {
            tokio::select! {
                incoming = read.next() => {
                    match handle_incoming(incoming, &tx, &addr).await {
                        Flow::Continue => {}
                        Flow::Disconnected => break true,
                        Flow::Stop => break false,
                    }
                }
                out = out_rx.recv() => {
                    let Some(text) = out else {
                        let _ = write.send(Message::Close(None)).await;
                        break false;
                    };
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        warn!("Failed to write to {addr}: {e}");
                        break true;
                    }
                }
            }
        };

        if tx.send(WsEvent::Disconnected).await.is_err() || !keep_running {
            return Ok(());
        }
    }
}

enum Flow {
    Continue,
    /// The client went away; wait for the next one.
    Disconnected,
    /// The event receiver is gone; shut down.
    Stop,
}

async fn handle_incoming(
    incoming: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Flow {
    match incoming {
        Some(Ok(Message::Text(text))) => {
            if tx.send(WsEvent::Message(text.to_string())).await.is_err() {
                return Flow::Stop;
            }
            Flow::Continue
        }
        Some(Ok(Message::Close(_))) => {
            info!("Client {addr} sent close frame");
            Flow::Disconnected
        }
        Some(Err(e)) => {
            warn!("WebSocket error from {addr}: {e}");
            Flow::Disconnected
        }
        None => Flow::Disconnected,
        // Ignore Binary, Ping, Pong, Frame variants.
        Some(Ok(_)) => Flow::Continue,
    }
}

/// Process raw WebSocket [`Message`] items from any [`Stream`], forwarding
/// text payloads through `tx`. Returns `Err(())` if the channel is closed.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match handle_incoming(stream.next().await, tx, addr).await {
            Flow::Continue => {}
            Flow::Disconnected => return Ok(()),
            Flow::Stop => return Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::Error as WsError;

    /// Helper: create a stream of Message results from a vec.
    fn mock_stream(
        messages: Vec<Result<Message, WsError>>,
    ) -> impl Stream<Item = Result<Message, WsError>> + Unpin {
        stream::iter(messages)
    }

    /// Hands out one in-memory connection, then never accepts again.
    struct OneShotListener {
        stream: Option<DuplexStream>,
    }

    #[async_trait]
    impl Listener for OneShotListener {
        type Stream = DuplexStream;

        async fn accept(&mut self) -> std::io::Result<(DuplexStream, String)> {
            match self.stream.take() {
                Some(s) => Ok((s, "memory".to_string())),
                None => std::future::pending().await,
            }
        }
    }

    #[tokio::test]
    async fn text_message_forwarded_to_channel() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![Ok(Message::Text("hello".into()))];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), WsEvent::Message("hello".into()));
    }

    #[tokio::test]
    async fn close_frame_stops_processing() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Text("before_close".into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("after_close_should_not_appear".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("before_close".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_stops_processing() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Text("before_error".into())),
            Err(WsError::ConnectionClosed),
            Ok(Message::Text("after_error_should_not_appear".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("before_error".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn binary_and_ping_messages_are_ignored() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(vec![].into())),
            Ok(Message::Text("after_ignored".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("after_ignored".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn returns_err_when_channel_closed() {
        let (tx, rx) = mpsc::channel(64);
        drop(rx);

        let messages = vec![Ok(Message::Text("orphan".into()))];
        let result = process_message_stream(mock_stream(messages), &tx, "test").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_relays_both_directions() {
        let (server_side, client_side) = tokio::io::duplex(4096);
        let listener = OneShotListener {
            stream: Some(server_side),
        };
        let (tx, mut rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(16);
        let server = tokio::spawn(run(listener, tx, out_rx));

        let (mut client, _) = tokio_tungstenite::client_async("ws://localhost/", client_side)
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Connected {
                addr: "memory".into()
            }
        );

        client
            .send(Message::Text(r#"{"type":"COMMAND"}"#.into()))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message(r#"{"type":"COMMAND"}"#.into())
        );

        out_tx.send("board".to_string()).await.unwrap();
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::Text("board".into()));

        drop(out_tx);
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn run_drops_outbound_without_client() {
        let listener = OneShotListener { stream: None };
        let (tx, _rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(16);
        let server = tokio::spawn(run(listener, tx, out_rx));

        out_tx.send("nobody listening".to_string()).await.unwrap();
        drop(out_tx);
        server.await.unwrap().unwrap();
    }
}
