mod inference;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use std::env;

use inference::config::ModelConfig;
use inference::model::ModelService;
use routes::configure_routes;
use storage::s3_service::S3Service;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let model_config = ModelConfig::load().unwrap_or_else(|e| {
        log::warn!("Could not read config/model.yaml ({}), using defaults", e);
        ModelConfig::default()
    });
    // The model itself is loaded on the first prediction, not here.
    let model = web::Data::new(ModelService::new(model_config));

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let s3_client = S3Client::new(&aws_config);

    let bucket = env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "brain-scan-uploads".to_string());
    let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    let s3_service = web::Data::new(S3Service::new(s3_client, bucket, region));

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(model.clone())
            .app_data(s3_service.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
