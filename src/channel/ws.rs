use crate::channel::{dispatch, ChannelError, CommandSender};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message;

/// Binds on loopback only; the host page runs on the same machine.
pub(crate) async fn bind(port: u16) -> Result<TcpListener, ChannelError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| ChannelError::Bind { addr, source })
}

/// Accept loop. Any number of host connections may send messages.
pub(crate) async fn serve(listener: TcpListener, commands: CommandSender, shutdown: broadcast::Sender<()>) {
    let mut shutdown_rx = shutdown.subscribe();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        log::info!("Host connected from {}", peer_addr);
                        connections.spawn(handle_connection(
                            stream,
                            peer_addr,
                            commands.clone(),
                            shutdown.subscribe(),
                        ));
                    }
                    Err(e) => {
                        log::warn!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    while connections.join_next().await.is_some() {}
    log::debug!("WebSocket server shutdown complete");
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    commands: CommandSender,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            log::warn!("WebSocket handshake failed for {}: {}", peer_addr, e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg_opt = read.next() => {
                match msg_opt {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&text, &commands);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // binary and control frames carry no host messages
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("Receive error for {}: {}", peer_addr, e);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    log::info!("Host disconnected: {}", peer_addr);
}
