use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use warp::Filter;

use recipe_share::{actions, handlers::AppState, routes::routes, Config};

#[derive(Parser)]
#[command(name = "recipe_share", version, about = "Recipe sharing API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Import ingredients from a JSON file of `{"name", "measurement_unit"}` objects
    LoadIngredients { path: PathBuf },
}

async fn connect(config: &Config) -> Result<Pool<Postgres>, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Environment misconfigured: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to connect to the database: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = AppState {
                pool,
                secret: Arc::new(config.secret_key),
            };

            log::info!("Listening on {}", config.bind_address);
            warp::serve(routes(state).with(warp::log("recipe_share::api")))
                .run(config.bind_address)
                .await;
        }
        Command::LoadIngredients { path } => {
            let result = match actions::read_ingredients_file(&path).await {
                Ok(ingredients) => actions::import_ingredients(&ingredients, &pool).await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                log::error!(
                    "Failed to import {}: {}",
                    path.display(),
                    e.info.unwrap_or_default()
                );
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
