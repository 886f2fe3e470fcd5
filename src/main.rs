use anyhow::Result;
use clap::Parser;
use pv_monitor_rs::{cli, config, db, logging, migrations, openapi, routes, state};
use std::io::ErrorKind;
use tokio::net::TcpListener;

/// Binds the API socket, turning common OS refusals into a hint about the CLI flags.
async fn open_listener(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port)).await.map_err(|err| {
        let hint = match err.kind() {
            ErrorKind::AddrInUse => format!("port {port} is taken, pass --port to pick a free one"),
            ErrorKind::PermissionDenied => format!("not permitted to listen on port {port}"),
            _ => "check --host and --port".to_string(),
        };
        anyhow::Error::new(err).context(format!("cannot listen on {host}:{port}: {hint}"))
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {err:#}");
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    if args.print_openapi {
        println!(
            "{}",
            serde_json::to_string_pretty(&openapi::openapi_json())?
        );
        return Ok(());
    }

    let _ = dotenvy::dotenv();

    let config = config::PvConfig::from_env()?;
    logging::init(&config)?;

    let pool = db::connect_lazy(&config.database_url, config.db_max_connections)?;
    if args.apply_migrations {
        migrations::apply_migrations(&pool, &args.migrations_dir).await?;
    }

    let state = state::AppState {
        config,
        db: pool,
    };

    let app = routes::router(state);
    let listener = open_listener(&args.host, args.port).await?;
    tracing::info!(host = %args.host, port = args.port, "pv-monitor-rs listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn occupied_port_points_at_the_port_flag() -> Result<()> {
        let held = match TcpListener::bind(("127.0.0.1", 0)).await {
            Ok(listener) => listener,
            // Sandboxed runners may refuse to listen at all.
            Err(err) if err.kind() == ErrorKind::PermissionDenied => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let port = held.local_addr()?.port();

        let err = open_listener("127.0.0.1", port).await.unwrap_err();
        let kind = err.downcast_ref::<std::io::Error>().map(|io| io.kind());
        if kind != Some(ErrorKind::AddrInUse) {
            return Ok(());
        }
        let message = err.to_string();
        assert!(message.contains(&format!("127.0.0.1:{port}")));
        assert!(message.contains("--port"));
        Ok(())
    }

    #[tokio::test]
    async fn free_port_is_bound() -> Result<()> {
        match open_listener("127.0.0.1", 0).await {
            Ok(listener) => assert_ne!(listener.local_addr()?.port(), 0),
            Err(err) => {
                let denied = err
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == ErrorKind::PermissionDenied);
                assert!(denied, "unexpected bind failure: {err:#}");
            }
        }
        Ok(())
    }
}
