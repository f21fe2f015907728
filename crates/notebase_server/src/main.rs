use std::error::Error;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use notebase_core::{init_logging, open_db, Settings};
use notebase_server::{create_router, AppState};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=server_exit module=server status=error reason={err}");
            eprintln!("notebase-server: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env()?;
    init_logging(settings.log_level, &settings.log_dir)?;
    let conn = open_db(&settings.db_path)?;
    log::info!(
        "event=db_open module=server status=ok path={}",
        settings.db_path.display()
    );

    // Blocking HTTP clients are built and dropped outside the async runtime.
    let state = Arc::new(AppState::from_settings(conn, &settings));
    let router = create_router(Arc::clone(&state), &settings.cors_origins);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(serve(router, settings.bind_addr));
    drop(runtime);
    drop(state);
    served
}

async fn serve(router: Router, bind_addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("event=server_listen module=server status=ok addr={bind_addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
