mod config;
mod controller;
mod datastore;
mod log;
mod model;

use std::env;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use dotenv::dotenv;
use signal_hook::consts::{SIGINT, SIGTERM};
use tokio::sync::RwLock;
use tracing::{event, info, Level};
use tracing_subscriber::EnvFilter;

use config::Config;
use controller::{ServerConfig, TodoController};
use datastore::MemoryTodoStore;

const CONFIG_ENV: &str = "TODOSERVICE_CONFIG";

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = match env::var(CONFIG_ENV) {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::default(),
    };
    let env_filter = EnvFilter::try_from_env("TODOSERVICE_LOG");
    log::setup(env_filter, config.log.as_ref());

    event!(Level::INFO, "Starting todoservice: {}", env!("FULL_VERSION"));

    let datastore = Arc::new(RwLock::new(MemoryTodoStore::new()));
    let controller = TodoController::start(datastore, ServerConfig::try_from(&config)?)?;
    info!(addr = %controller.local_addr(), "todoservice is listening");

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, term.clone())?;
    signal_hook::flag::register(SIGTERM, term.clone())?;

    while !term.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(200));
    }
    info!("Stopping todoservice");
    controller.stop()?;
    Ok(())
}

#[cfg(all(test, feature = "e2e"))]
mod e2e_tests;
