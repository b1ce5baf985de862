// src/main.rs
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client as S3Client;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use music_academy::api::gateway_client::GatewayClient;
use music_academy::certificate::{ApproxMeasure, GlyphMeasure, TextMeasure};
use music_academy::config::{Config, MailTransport};
use music_academy::mail::{DynMailClient, LogMailClient, SmtpMailClient};
use music_academy::storage::Storage;
use music_academy::video::VideoLookup;
use music_academy::{api, docs, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{context}: {err}"))
}

fn text_measure(config: &Config) -> Arc<dyn TextMeasure> {
    match config.certificate_font_path.as_deref() {
        Some(path) => match GlyphMeasure::load(path) {
            Ok(measure) => {
                log::info!("certificate text measured with font {path}");
                Arc::new(measure)
            }
            Err(e) => {
                log::warn!("could not load certificate font {path}: {e}; using approximate widths");
                Arc::new(ApproxMeasure::default())
            }
        },
        None => Arc::new(ApproxMeasure::default()),
    }
}

fn mail_client(config: &Config) -> std::io::Result<DynMailClient> {
    match (config.mail_transport, config.smtp.as_ref()) {
        (MailTransport::Smtp, Some(smtp)) => {
            let client = SmtpMailClient::new(smtp, &config.mail_from, &config.mail_from_name)
                .map_err(|e| startup_error("smtp setup failed", e))?;
            Ok(Arc::new(client))
        }
        _ => {
            log::warn!("MAIL_TRANSPORT=log: emails are logged, not sent");
            Ok(Arc::new(LogMailClient))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("configuration error", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| startup_error("failed to connect to DB", e))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

    // S3-compatible endpoints (MinIO and friends) need path-style addressing
    if let Some(endpoint) = config.s3_endpoint.as_deref() {
        s3_config_builder = s3_config_builder.endpoint_url(endpoint).force_path_style(true);
    }

    let storage = Storage::new(
        S3Client::from_conf(s3_config_builder.build()),
        config.s3_bucket.clone(),
        config.s3_public_base_url.clone(),
    );

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .map_err(|e| startup_error("http client", e))?;

    let gateway = GatewayClient::new(
        http.clone(),
        config.gateway_base_url.clone(),
        config.gateway_key_id.clone(),
        config.gateway_key_secret.clone(),
        config.gateway_webhook_secret.clone(),
    );

    let state = web::Data::new(AppState {
        pool,
        storage,
        mailer: mail_client(&config)?,
        gateway,
        videos: VideoLookup::new(http, config.youtube_api_key.clone()),
        measure: text_measure(&config),
        site_url: config.site_url.clone(),
        chart_max_points: config.revenue_chart_max_points,
    });

    log::info!("listening on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
            .configure(api::configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
