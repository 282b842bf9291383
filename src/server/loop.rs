// Server loop module
// Accepts connections until shutdown, then drains active connections

use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop until `shutdown` resolves
///
/// After shutdown the listener is closed and every connection is told to
/// finish: idle keep-alive connections close immediately, busy ones after
/// their current response. Stragglers get up to `performance.read_timeout`
/// seconds.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &graceful,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst));

    let drain_timeout = Duration::from_secs(state.config.performance.read_timeout);
    let remaining = tokio::select! {
        () = graceful.shutdown() => 0,
        () = tokio::time::sleep(drain_timeout) => active_connections.load(Ordering::SeqCst),
    };

    logger::log_shutdown_complete(remaining);
    Ok(())
}
