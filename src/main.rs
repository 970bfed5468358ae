#![allow(non_snake_case)]

use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plannerBot::cli;
use plannerBot::config::{AppConfig, Settings};
use plannerBot::runtime;

const DEFAULT_RUN_MODE: &str = "service";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plannerBot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };

    let settings = match Settings::load(&config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let run_mode = config
        .get_prop("RUN_MODE")
        .unwrap_or(DEFAULT_RUN_MODE.to_string());
    if run_mode == "service" {
        runtime::run_service(settings).await;
    } else if run_mode == "cli" {
        cli::cli(settings).await;
    } else {
        println!("Invalid run mode {}", run_mode);
    }
}
