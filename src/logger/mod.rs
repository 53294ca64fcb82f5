//! Logger module
//!
//! Provides logging utilities for the gateway including:
//! - Server lifecycle and mount logging
//! - Access logging with multiple formats
//! - Level-filtered debug/info/warning/error messages
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = Level::parse(&config.logging.level).unwrap_or_else(|| {
        eprintln!(
            "[WARN] Unknown log level '{}', using info",
            config.logging.level
        );
        Level::Info
    });
    writer::set_level(level);
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn stamp(level: Level, message: &str) -> String {
    format!(
        "{} [{level}] {message}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
    )
}

/// Write to info/access log
fn write_info(level: Level, message: &str) {
    if !writer::enabled(level) {
        return;
    }
    let line = stamp(level, message);
    if let Some(w) = writer::get() {
        w.write_info(&line);
    } else {
        println!("{line}");
    }
}

/// Write to error log
fn write_error(level: Level, message: &str) {
    if !writer::enabled(level) {
        return;
    }
    let line = stamp(level, message);
    if let Some(w) = writer::get() {
        w.write_error(&line);
    } else {
        eprintln!("{line}");
    }
}

/// Write to access log specifically (never level-filtered)
fn write_access(message: &str) {
    if let Some(w) = writer::get() {
        w.write_access(message);
    } else {
        println!("{message}");
    }
}

pub fn log_debug(message: &str) {
    write_info(Level::Debug, message);
}

pub fn log_info(message: &str) {
    write_info(Level::Info, message);
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, message);
}

pub fn log_error(message: &str) {
    write_error(Level::Error, message);
}

pub fn log_admin_error(message: &str) {
    write_error(Level::Error, &format!("[ADMIN] {message}"));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    log_info("======================================");
    log_info("File gateway started");
    log_info(&format!("Listening on: http://{addr}"));
    log_info(&format!("Server name: {}", config.http.server_name));
    log_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        log_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        log_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        log_info(&format!("Error log: {path}"));
    }
    log_info("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_error(&format!("Failed to serve connection: {err}"));
}

/// Log the mounted prefixes, one per line, in the registry's sorted order
pub fn log_mounts(prefixes: &[String]) {
    log_info(&format!("[Mount] {} filesystem(s) mounted", prefixes.len()));
    for prefix in prefixes {
        log_info(&format!("[Mount]   {prefix}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_admin_request(method: &str, path: &str, status: u16) {
    log_info(&format!("[ADMIN] {method} {path} - {status}"));
}

pub fn log_shutdown(stage: &str) {
    log_info(&format!("[Shutdown] {stage}"));
}
