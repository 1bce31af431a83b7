use crate::channel::{dispatch, CommandSender};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;

/// Reads one message per line until EOF, an IO error or shutdown.
/// Returns the number of commands queued.
pub(crate) async fn read_lines<R>(
    reader: R,
    commands: CommandSender,
    mut shutdown: broadcast::Receiver<()>,
) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if dispatch(&line, &commands) {
                        delivered += 1;
                    }
                }
                Ok(None) => {
                    log::info!("Host input closed");
                    break;
                }
                Err(err) => {
                    log::warn!("Host input read failed: {}", err);
                    break;
                }
            },
            _ = shutdown.recv() => break,
        }
    }
    delivered
}
