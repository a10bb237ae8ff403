use clap::Parser;
use ledger_node::{router, AppState, Args};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.env_filter())
        .init();

    let state = AppState::bootstrap(&args)?;
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("ledger-node listening on http://{}", args.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    state.flush().await?;
    info!("mempool flushed, bye");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    state.cancel_mining();
}
