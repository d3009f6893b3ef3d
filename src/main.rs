use clap::Parser;
use research_kpi::app::{self, AppState};
use research_kpi::auth::AdminCredential;
use research_kpi::{Settings, WorkbookStore};
use std::path::PathBuf;

/// Research KPI dashboard web server
#[derive(Parser, Debug)]
#[command(name = "kpi-dashboard", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, default_value = "kpi.toml", env = "KPI_CONFIG")]
    config: PathBuf,

    /// Override the bind address
    #[arg(short, long, env = "KPI_BIND")]
    bind: Option<String>,

    /// Override the workbook path
    #[arg(short, long, env = "KPI_WORKBOOK")]
    workbook: Option<PathBuf>,

    /// Argon2 PHC hash of the admin password
    #[arg(long, env = "KPI_ADMIN_PASSWORD_HASH", hide_env_values = true)]
    admin_password_hash: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = Settings::load(&args.config)?;
    if let Some(bind) = args.bind {
        settings.server.bind = bind;
    }
    if let Some(workbook) = args.workbook {
        settings.store.workbook = workbook;
    }
    if args.admin_password_hash.is_some() {
        settings.auth.admin_password_hash = args.admin_password_hash;
    }

    log::info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let store = WorkbookStore::open(&settings.store)?;
    log::info!("Using workbook {}", store.path().display());

    let credential = AdminCredential::new(settings.auth.admin_password_hash.clone())?;
    let state = AppState::new(Box::new(store), settings, credential)?;

    app::run(state).await
}
