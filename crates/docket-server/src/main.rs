#![deny(clippy::unwrap_used)]

use docket_db::migrate;
use docket_server::{bootstrap, cli, settings};

#[tokio::main]
async fn main() {
    let run_mode = cli::parse_args();
    let settings = if matches!(run_mode, cli::RunMode::Server) {
        settings::Settings::from_env()
    } else {
        settings::Settings::from_env_with_options(false)
    };
    bootstrap::init_tracing();
    let metrics_config = settings.config.metrics.clone();
    if matches!(run_mode, cli::RunMode::Server) {
        if let Err(missing) = settings::preflight(&settings) {
            tracing::error!(
                event = "preflight_failed",
                missing = ?missing,
                "Required configuration missing"
            );
            std::process::exit(1);
        }
    }
    bootstrap::log_startup(&settings, &metrics_config);
    bootstrap::init_metrics_registry(&metrics_config);

    let db = match bootstrap::connect_db(&settings).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(event = "db_connect_failed", error = %err);
            std::process::exit(1);
        }
    };
    match run_mode {
        cli::RunMode::Migrate => {
            if let Err(err) = migrate(&db).await {
                tracing::error!(error = %err, "migration failed");
                std::process::exit(1);
            }
            tracing::info!("migrations applied");
            return;
        }
        cli::RunMode::Init(args) => {
            if let Err(err) = cli::init::run(&settings, &db, &args).await {
                eprintln!("{err}");
                std::process::exit(1);
            }
            return;
        }
        cli::RunMode::Server => {}
    }

    let state = bootstrap::build_state(&settings, db);
    bootstrap::load_dynamic_origins(&state).await;
    bootstrap::start_background_tasks(&settings, &state);
    let app = bootstrap::build_app(&metrics_config, state);
    bootstrap::serve(&settings, app).await;
}
