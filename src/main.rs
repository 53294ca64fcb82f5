use std::sync::Arc;

use fsgate::config::{AppState, Config, RegistrationMode};
use fsgate::gateway::Gateway;
use fsgate::logger;
use fsgate::server::{self, ServiceKind};

/// Config file used when no path is given (extension optional)
const DEFAULT_CONFIG: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Runtime thread count follows server.workers
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_addr = cfg.get_socket_addr()?;
    let admin_addr = cfg.get_admin_socket_addr()?;

    let gateway = Arc::new(Gateway::from_config(&cfg).await);
    let app_listener = server::create_reusable_listener(app_addr)?;
    let admin_listener = server::create_reusable_listener(admin_addr)?;

    let mode = cfg.registry.mode;
    let state = Arc::new(AppState::new(cfg, gateway));
    server::start_signal_handler(Arc::clone(&state.shutdown))?;

    logger::log_server_start(&app_addr, &state.config);
    logger::log_info(&format!("[ADMIN] Mount API on http://{admin_addr}/v1/mounts"));
    if mode == RegistrationMode::Static {
        logger::log_info("[ADMIN] Registry is static, mount changes will be refused");
    }

    let admin = tokio::spawn(server::start_server_loop(
        admin_listener,
        Arc::clone(&state),
        ServiceKind::Admin,
    ));
    server::start_server_loop(app_listener, Arc::clone(&state), ServiceKind::Gateway).await;

    if let Err(e) = admin.await {
        logger::log_admin_error(&format!("Admin server task failed: {e}"));
    }
    logger::log_shutdown("Stopped");
    Ok(())
}
