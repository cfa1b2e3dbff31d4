// Health Panel - Web Server
// REST API with Axum over the configured persistence adapter

use anyhow::{Context, Result};
use health_panel::api::{self, AppState};
use health_panel::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🌐 Health Panel - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env()?;

    // Stores may own blocking HTTP clients, build them before the runtime starts
    let store = config.open_store()?;
    let sheet = config.open_sheet()?;
    info!(backend = store.name(), sheet_proxy = sheet.is_some(), "Store ready");

    let state = AppState::new(store, sheet, config.max_records);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/getEntries", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    runtime.block_on(api::serve(state.clone(), &config.bind_addr))?;

    // Last handle to the stores is released outside the runtime
    drop(runtime);
    drop(state);

    Ok(())
}
