// Server loop module
// Accepts connections until shutdown, then drains the open ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::{accept_connection, ServiceKind};
use crate::config;
use crate::logger;

/// Poll interval while waiting for connections to drain
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run one listener until shutdown is requested
///
/// After shutdown the listener is closed and open connections get up to
/// `server.shutdown_timeout` seconds to finish their current request.
/// Returns the number of connections still open when the wait ended.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    kind: ServiceKind,
) -> usize {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = Arc::clone(&state.shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, kind);
                    }
                    Err(e) => {
                        let message = format!("Failed to accept connection: {e}");
                        match kind {
                            ServiceKind::Gateway => logger::log_error(&message),
                            ServiceKind::Admin => logger::log_admin_error(&message),
                        }
                    }
                }
            }

            () = shutdown.wait() => break,
        }
    }

    drop(listener);
    let timeout = Duration::from_secs(state.config.server.shutdown_timeout);
    let remaining = drain(&active_connections, timeout).await;
    if remaining == 0 {
        logger::log_shutdown(&format!("{} listener drained", kind.label()));
    } else {
        logger::log_warning(&format!(
            "[Shutdown] {} listener: {remaining} connection(s) still open after {}s",
            kind.label(),
            timeout.as_secs()
        ));
    }
    remaining
}

/// Wait for the counter to reach zero or the timeout to expire
async fn drain(active_connections: &AtomicUsize, timeout: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let open = active_connections.load(Ordering::SeqCst);
        if open == 0 || tokio::time::Instant::now() >= deadline {
            return open;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let counter = AtomicUsize::new(0);
        assert_eq!(drain(&counter, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_at_deadline() {
        let counter = AtomicUsize::new(2);
        let started = tokio::time::Instant::now();
        assert_eq!(drain(&counter, Duration::from_millis(120)).await, 2);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }
}
