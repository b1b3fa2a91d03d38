use std::{env, error::Error, fs::OpenOptions, net::SocketAddr, process::exit, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_tracker::{
    AppState, ChatCompletionClient, WebPushRelay, build_router, graceful_shutdown,
    logging_middleware,
};

/// The web server for the expense tracker.
///
/// Secrets are read from the environment: SECRET (cookie key), AI_API_KEY or
/// OPENAI_API_KEY, VAPID_PRIVATE_KEY_PATH, VAPID_PUBLIC_KEY and VAPID_EMAIL.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// Base URL of the OpenAI compatible chat completion API.
    #[arg(long, default_value = "https://api.novita.ai/openai")]
    ai_base_url: String,

    /// The model used for insights, answers and category suggestions.
    #[arg(long, default_value = "deepseek/deepseek-v3.1")]
    ai_model: String,

    /// The public URL of this app, sent to the AI provider as the referer.
    #[arg(long, default_value = "http://localhost:3000")]
    app_url: String,

    /// Where to write the debug log.
    #[arg(long, default_value = "debug.log")]
    log_path: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(&args.log_path)?;

    if time_tz::timezones::get_by_name(&args.timezone).is_none() {
        tracing::error!("\"{}\" is not a valid canonical timezone name", args.timezone);
        exit(1);
    }

    let secret = required_env("SECRET")?;
    let vapid_private_key_path = required_env("VAPID_PRIVATE_KEY_PATH")?;
    let vapid_public_key = required_env("VAPID_PUBLIC_KEY")?;
    let vapid_email = required_env("VAPID_EMAIL")?;

    let ai_api_key = env::var("AI_API_KEY")
        .or_else(|_| env::var("OPENAI_API_KEY"))
        .unwrap_or_else(|_| {
            tracing::warn!(
                "Neither AI_API_KEY nor OPENAI_API_KEY is set, AI features will use their fallbacks"
            );
            String::new()
        });

    let insight_model =
        ChatCompletionClient::new(&args.ai_base_url, &ai_api_key, &args.ai_model, &args.app_url)?;

    let vapid_private_key_pem = std::fs::read(&vapid_private_key_path).inspect_err(|error| {
        tracing::error!("Could not read the VAPID private key at {vapid_private_key_path}: {error}")
    })?;
    let push_relay = WebPushRelay::new(vapid_private_key_pem, &vapid_email);

    let conn = Connection::open(&args.db_path)?;
    let state = AppState::new(
        conn,
        &secret,
        &args.timezone,
        Arc::new(insight_model),
        Arc::new(push_relay),
        &vapid_public_key,
    )?;

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

fn required_env(name: &str) -> Result<String, Box<dyn Error>> {
    env::var(name).map_err(|_| format!("The environment variable '{name}' must be set").into())
}

fn setup_logging(log_path: &str) -> Result<(), Box<dyn Error>> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Handlers log their own errors.
        .on_failure(());

    router.layer(tracing_layer)
}
