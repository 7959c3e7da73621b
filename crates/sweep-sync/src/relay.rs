//! Websocket fan-out relay. Every text frame a peer sends is forwarded
//! verbatim to every other connected peer; payloads are never inspected.

use std::net::SocketAddr;

use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::ToSocketAddrs;
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::SyncResult;

const RELAY_BUFFER: usize = 256;

#[derive(Debug, Clone)]
struct Frame {
    from: u64,
    text: String,
}

pub struct Relay {
    listener: TcpListener,
    peers: broadcast::Sender<Frame>,
}

impl Relay {
    pub async fn bind(addr: impl ToSocketAddrs) -> SyncResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (peers, _) = broadcast::channel(RELAY_BUFFER);
        Ok(Self { listener, peers })
    }

    pub fn local_addr(&self) -> SyncResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts peers until the listener fails.
    pub async fn serve(self) -> SyncResult<()> {
        info!(addr = ?self.listener.local_addr().ok(), "relay listening");
        let mut next_peer = 0u64;
        loop {
            let (stream, remote) = self.listener.accept().await?;
            next_peer += 1;
            let id = next_peer;
            let peers = self.peers.clone();
            tokio::spawn(async move {
                serve_peer(stream, id, peers).await;
                debug!(peer = id, %remote, "peer disconnected");
            });
        }
    }
}

async fn serve_peer(stream: TcpStream, id: u64, peers: broadcast::Sender<Frame>) {
    let mut frames = peers.subscribe();
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(err) => {
            warn!(peer = id, error = %err, "websocket handshake failed");
            return;
        }
    };
    debug!(peer = id, "peer connected");
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = peers.send(Frame {
                        from: id,
                        text: text.as_str().to_owned(),
                    });
                }
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(peer = id, error = %err, "peer read failed");
                    break;
                }
            },
            relayed = frames.recv() => match relayed {
                Ok(frame) if frame.from == id => {}
                Ok(frame) => {
                    if sink.send(Message::Text(frame.text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(peer = id, skipped, "peer fell behind, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio_tungstenite::connect_async;

    use super::*;

    #[tokio::test]
    async fn relays_raw_text_without_decoding() {
        let relay = Relay::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}/ws", relay.local_addr().expect("addr"));
        tokio::spawn(relay.serve());

        let (mut a, _) = connect_async(url.as_str()).await.expect("a");
        let (mut b, _) = connect_async(url.as_str()).await.expect("b");
        // Let both peer tasks subscribe before anything is sent.
        tokio::time::sleep(Duration::from_millis(50)).await;

        a.send(Message::Text("not even json".into())).await.expect("send");
        let received = tokio::time::timeout(Duration::from_secs(5), b.next())
            .await
            .expect("timeout")
            .expect("frame")
            .expect("message");
        assert_eq!(received, Message::Text("not even json".into()));
    }
}
