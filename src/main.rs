use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod metadata;
mod server;
mod upstream;

use upstream::ivs::IvsClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    // Worker thread count follows server.workers, otherwise CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("[CONFIG] Using {workers} worker threads"));
    } else {
        logger::log_info("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let upstream = IvsClient::new(cfg.stream.region.as_deref()).await;

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg, Arc::new(upstream)));
    server::start_server_loop(listener, state, server::signal::shutdown_signal()).await?;

    Ok(())
}
