use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pv-monitor-rs",
    version,
    about = "Photovoltaic plant monitoring API"
)]
pub struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
    /// Apply the SQL files under --migrations-dir before serving.
    #[arg(long, default_value_t = false)]
    pub apply_migrations: bool,
    #[arg(long, default_value = "migrations")]
    pub migrations_dir: PathBuf,
}
