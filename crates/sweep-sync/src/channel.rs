//! Auto-reconnecting client for the peer relay.
//!
//! Outbound messages are fire-and-forget: anything sent while the socket is
//! not open is dropped, and nothing is replayed after a reconnect.

use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use sweep_core::protocol::ChannelMessage;
use sweep_core::ChannelStatus;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::error::SyncResult;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub reconnect_delay: Duration,
}

pub struct ChannelHandle {
    outbound: mpsc::UnboundedSender<ChannelMessage>,
    status: watch::Receiver<ChannelStatus>,
    status_tx: Option<watch::Sender<ChannelStatus>>,
    task: Option<JoinHandle<()>>,
}

enum PumpExit {
    Disconnected,
    Shutdown,
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

impl ChannelHandle {
    /// Starts the connection loop. Decoded peer messages are pushed into
    /// `inbound`; the loop stops once that receiver or this handle is gone.
    pub fn spawn(
        config: ChannelConfig,
        inbound: mpsc::UnboundedSender<ChannelMessage>,
    ) -> SyncResult<Self> {
        Url::parse(&config.url)?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ChannelStatus::Connecting);
        let task = tokio::spawn(run(config, inbound, outbound_rx, status_tx));
        Ok(Self {
            outbound,
            status,
            status_tx: None,
            task: Some(task),
        })
    }

    /// A channel with no socket behind it. It always reports open and hands
    /// every sent message to the returned receiver.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<ChannelMessage>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ChannelStatus::Open);
        let handle = Self {
            outbound,
            status,
            status_tx: Some(status_tx),
            task: None,
        };
        (handle, outbound_rx)
    }

    /// Returns false when the message was dropped.
    pub fn send(&self, message: ChannelMessage) -> bool {
        if self.status() != ChannelStatus::Open {
            debug!(action = message.action(), "channel not open, dropping message");
            return false;
        }
        self.outbound.send(message).is_ok()
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    pub async fn wait_open(&self, timeout: Duration) -> bool {
        let mut status = self.status.clone();
        let opened = tokio::time::timeout(
            timeout,
            status.wait_for(|status| *status == ChannelStatus::Open),
        )
        .await;
        matches!(opened, Ok(Ok(_)))
    }

    /// Flushes queued messages, sends a close frame and waits briefly for
    /// the connection loop to finish. Dropping the handle without calling
    /// this still stops the loop, just without waiting.
    pub async fn close(mut self, grace: Duration) {
        let task = self.task.take();
        drop(self);
        if let Some(task) = task {
            if tokio::time::timeout(grace, task).await.is_err() {
                debug!("realtime channel did not stop within grace period");
            }
        }
    }

    /// Only meaningful for detached channels.
    pub fn set_status(&self, status: ChannelStatus) {
        if let Some(tx) = &self.status_tx {
            tx.send_replace(status);
        }
    }
}

async fn run(
    config: ChannelConfig,
    inbound: mpsc::UnboundedSender<ChannelMessage>,
    mut outbound_rx: mpsc::UnboundedReceiver<ChannelMessage>,
    status: watch::Sender<ChannelStatus>,
) {
    loop {
        status.send_replace(ChannelStatus::Connecting);
        match connect_async(config.url.as_str()).await {
            Ok((socket, _)) => {
                while outbound_rx.try_recv().is_ok() {}
                info!(url = %config.url, "realtime channel open");
                status.send_replace(ChannelStatus::Open);
                match pump(socket, &inbound, &mut outbound_rx).await {
                    PumpExit::Shutdown => {
                        status.send_replace(ChannelStatus::Closed);
                        return;
                    }
                    PumpExit::Disconnected => {
                        warn!(url = %config.url, "realtime channel closed");
                    }
                }
            }
            Err(err) => {
                warn!(url = %config.url, error = %err, "realtime channel connect failed");
            }
        }
        status.send_replace(ChannelStatus::Closed);
        if inbound.is_closed() {
            return;
        }
        let wake = tokio::time::sleep(config.reconnect_delay);
        tokio::pin!(wake);
        loop {
            tokio::select! {
                () = &mut wake => break,
                message = outbound_rx.recv() => match message {
                    Some(message) => {
                        debug!(action = message.action(), "channel closed, dropping message");
                    }
                    None => return,
                },
            }
        }
    }
}

async fn pump(
    socket: Socket,
    inbound: &mpsc::UnboundedSender<ChannelMessage>,
    outbound_rx: &mut mpsc::UnboundedReceiver<ChannelMessage>,
) -> PumpExit {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ChannelMessage::decode(text.as_str()) {
                    Some(message) => {
                        if inbound.send(message).is_err() {
                            return PumpExit::Shutdown;
                        }
                    }
                    None => debug!(payload = text.as_str(), "ignoring undecodable peer message"),
                },
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        return PumpExit::Disconnected;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return PumpExit::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "realtime channel read failed");
                    return PumpExit::Disconnected;
                }
            },
            message = outbound_rx.recv() => match message {
                Some(message) => match message.encode() {
                    Ok(json) => {
                        if let Err(err) = sink.send(Message::Text(json.into())).await {
                            warn!(error = %err, "realtime channel write failed");
                            return PumpExit::Disconnected;
                        }
                    }
                    Err(err) => warn!(error = %err, "failed to encode peer message"),
                },
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpExit::Shutdown;
                }
            },
        }
    }
}
