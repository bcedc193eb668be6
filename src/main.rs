// src/main.rs
use actix_files::Files;
use actix_web::{App, HttpServer, middleware::Logger, web};
use renewal_tracker::context::AppContext;
use renewal_tracker::identity::{GoogleVerifier, IdentityVerifier};
use renewal_tracker::{auth, config, db, routes};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = config::Config::from_env().expect("Failed to load config from environment");
    config.warn_on_misconfiguration();

    tracing::info!("Starting subscription renewal tracker");

    let store = db::Store::open(&config.database_path)
        .await
        .map_err(std::io::Error::other)?;

    let google_client_id = config.google_client_id().map(str::to_string);
    let verifier = google_client_id
        .as_ref()
        .map(|id| Arc::new(GoogleVerifier::new(id.clone())) as Arc<dyn IdentityVerifier>);

    let context = web::Data::new(AppContext::new(store, google_client_id, verifier));
    let session_key = config.session_key();
    let secure_cookies = config.secure_cookies();
    let static_dir = config.static_dir.clone();
    let serve_static = static_dir.is_dir();

    tracing::info!(
        "Listening at http://{}:{} (store: {})",
        config.host,
        config.port,
        context.store.path().display()
    );

    HttpServer::new(move || {
        let app = App::new()
            .app_data(context.clone())
            .wrap(auth::session_middleware(session_key.clone(), secure_cookies))
            .wrap(Logger::default())
            .configure(routes);
        if serve_static {
            app.service(Files::new("/", &static_dir).index_file("index.html"))
        } else {
            app
        }
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
