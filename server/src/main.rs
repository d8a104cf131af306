use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use todo_server::{Config, ServerError, TodoStore};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    if let Err(err) = serve(config).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> Result<(), ServerError> {
    if let Some(url) = &config.public_url {
        todo_server::config::parse_public_url(url)?;
    }
    let store = TodoStore::connect(&config.database_url, config.max_connections).await?;
    let listener = TcpListener::bind(config.bind_addr()).await?;
    todo_server::run(listener, store, &config.settings(), shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
