//! Inbound host channel.
//!
//! The host sends JSON messages (see [`message`]) over either line-delimited
//! stdin or a local WebSocket server. Valid messages become [`HostCommand`]s
//! on an mpsc queue consumed by the view; malformed ones are logged and
//! dropped. Nothing is ever sent back.
//!
//! The channel is an explicit subscription: [`HostChannel::start`] when the
//! view mounts, [`HostChannel::stop`] when it unmounts.

pub mod message;
mod stdio;
mod ws;

pub use message::{HostCommand, HostMessage, MessageError};

use std::net::SocketAddr;
use tokio::io::AsyncBufRead;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 9240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdin,
    Websocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdin,
    WebSocket { port: u16 },
}

impl Transport {
    pub fn from_kind(kind: TransportKind, port: u16) -> Self {
        match kind {
            TransportKind::Stdin => Transport::Stdin,
            TransportKind::Websocket => Transport::WebSocket { port },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to bind host channel on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("host channel IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CommandSender = mpsc::UnboundedSender<HostCommand>;

pub struct HostChannel {
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl HostChannel {
    /// Starts listening. Must be called inside a tokio runtime.
    pub async fn start(transport: Transport, commands: CommandSender) -> Result<Self, ChannelError> {
        match transport {
            Transport::Stdin => {
                log::info!("Host channel reading JSON lines from stdin");
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                Ok(Self::start_with_reader(stdin, commands))
            }
            Transport::WebSocket { port } => {
                let listener = ws::bind(port).await?;
                let local_addr = listener.local_addr()?;
                log::info!("Host channel listening on ws://{}", local_addr);
                let (shutdown, _) = broadcast::channel(1);
                let task = tokio::spawn(ws::serve(listener, commands, shutdown.clone()));
                Ok(Self {
                    shutdown,
                    tasks: vec![task],
                    local_addr: Some(local_addr),
                })
            }
        }
    }

    /// Line-delimited JSON from any async reader.
    pub fn start_with_reader<R>(reader: R, commands: CommandSender) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (shutdown, receiver) = broadcast::channel(1);
        let task = tokio::spawn(async move {
            stdio::read_lines(reader, commands, receiver).await;
        });
        Self {
            shutdown,
            tasks: vec![task],
            local_addr: None,
        }
    }

    /// Bound address of the WebSocket transport.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stops every transport task and waits for them to finish.
    pub async fn stop(self) {
        // no receivers just means every task already ended
        let _ = self.shutdown.send(());
        for task in self.tasks {
            if let Err(err) = task.await {
                log::warn!("Host channel task ended abnormally: {}", err);
            }
        }
        log::info!("Host channel stopped");
    }
}

/// Parses one message and queues it. Returns true if a command was queued.
pub(crate) fn dispatch(text: &str, commands: &CommandSender) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    match HostCommand::parse(text) {
        Ok(command) => {
            log::debug!("Host command for '{}'", command.part);
            commands.send(command).is_ok()
        }
        Err(MessageError::UnknownPart(part)) => {
            log::debug!("Ignoring host message for unknown part '{}'", part);
            false
        }
        Err(err) => {
            log::warn!("Dropping malformed host message: {}", err);
            false
        }
    }
}
