// Connection handling module
// Accepts a single TCP connection and serves it until close or shutdown

use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::{service_fn, HttpService};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use super::signal::Shutdown;
use crate::api;
use crate::config::{self, PerformanceConfig};
use crate::handler;
use crate::logger;

/// Which service a listener exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// File requests routed through the registry
    Gateway,
    /// Mount management API
    Admin,
}

impl ServiceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gateway => "gateway",
            Self::Admin => "admin",
        }
    }
}

/// Accept and process a connection, checking limits and logging.
///
/// The connection limit applies to the gateway listener only.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<config::AppState>,
    conn_counter: &Arc<AtomicUsize>,
    kind: ServiceKind,
) {
    // Increment counter first, then check limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if kind == ServiceKind::Gateway {
        if let Some(max_conn) = state.config.performance.max_connections {
            if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
                conn_counter.fetch_sub(1, Ordering::SeqCst);
                logger::log_warning(&format!(
                    "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
                ));
                drop(stream);
                return;
            }
        }
    }

    logger::log_connection_accepted(&peer_addr);
    if state.config.performance.tcp_nodelay {
        if let Err(e) = stream.set_nodelay(true) {
            logger::log_warning(&format!("Failed to set TCP_NODELAY for {peer_addr}: {e}"));
        }
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        kind,
    );
}

/// Handle a single connection in a spawned task.
///
/// The counter is decremented once hyper is done with the connection.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<config::AppState>,
    conn_counter: Arc<AtomicUsize>,
    kind: ServiceKind,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let builder = http1_builder(&state.config.performance);
        let shutdown = Arc::clone(&state.shutdown);

        let result = match kind {
            ServiceKind::Gateway => {
                let service = service_fn(move |req| {
                    handler::handle_request(req, Arc::clone(&state), peer_addr)
                });
                serve(io, &builder, service, &shutdown).await
            }
            ServiceKind::Admin => {
                let service = service_fn(move |req| api::handle_admin(req, Arc::clone(&state)));
                serve(io, &builder, service, &shutdown).await
            }
        };

        if let Err(err) = result {
            if err.is_timeout() {
                logger::log_debug(&format!(
                    "[Connection] {peer_addr} ({}) timed out reading headers",
                    kind.label()
                ));
            } else if !err.is_incomplete_message() {
                logger::log_connection_error(&err);
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

fn http1_builder(performance: &PerformanceConfig) -> http1::Builder {
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(performance.keep_alive);
    if performance.read_timeout > 0 {
        builder.header_read_timeout(Duration::from_secs(performance.read_timeout));
    }
    builder
}

/// Serve one connection, finishing the in-flight request on shutdown
async fn serve<S>(
    io: TokioIo<TcpStream>,
    builder: &http1::Builder,
    service: S,
    shutdown: &Shutdown,
) -> hyper::Result<()>
where
    S: HttpService<Incoming>,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    S::ResBody: 'static,
    <S::ResBody as Body>::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.wait() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}
