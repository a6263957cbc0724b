use actix_web::http::Method;
use actix_web::{HttpResponse, web};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{error, info, warn};
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

use shared::{PredictionRequest, PredictionResponse};

use crate::inference::model::{InferenceError, ModelService};
use crate::storage::s3_service::S3Service;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
enum PredictError {
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/predict")
            .route(web::post().to(handle_predict))
            .route(web::method(Method::OPTIONS).to(preflight))
            .route(web::route().to(method_not_allowed)),
    );
}

async fn preflight() -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Methods", "POST, OPTIONS"))
        .insert_header(("Access-Control-Allow-Headers", "Content-Type, Authorization"))
        .finish()
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorResponse {
        error: "Method not allowed. Use POST.".to_string(),
    })
}

async fn handle_predict(
    model: web::Data<ModelService>,
    storage: web::Data<S3Service>,
    body: web::Bytes,
) -> HttpResponse {
    let request: PredictionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return bad_request("No data provided"),
    };

    let encoded = match request
        .image
        .as_deref()
        .map(strip_data_url)
        .or(request.image_data.as_deref())
    {
        Some(encoded) => encoded.to_string(),
        None => {
            return bad_request("No image data provided. Send 'image' or 'imageData' in JSON.");
        }
    };
    let filename = S3Service::safe_filename(request.filename.as_deref());

    let request_id = Uuid::new_v4();
    info!("[{}] prediction requested for {}", request_id, filename);

    match run_prediction(&model, &storage, &encoded, &filename).await {
        Ok(response) => {
            info!(
                "[{}] predicted '{}' at {}%",
                request_id, response.result, response.confidence
            );
            HttpResponse::Ok()
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .json(response)
        }
        Err(e) => {
            error!("[{}] prediction failed: {}", request_id, e);
            HttpResponse::InternalServerError()
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .json(ErrorResponse {
                    error: format!("Prediction failed: {}", e),
                })
        }
    }
}

async fn run_prediction(
    model: &ModelService,
    storage: &S3Service,
    encoded: &str,
    filename: &str,
) -> Result<PredictionResponse, PredictError> {
    // Browser clients wrap base64 payloads across lines.
    let cleaned: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let image_data = STANDARD.decode(cleaned.as_bytes())?;

    // Removed on drop, on the error paths as well as on success.
    let mut scan_file = tempfile::Builder::new()
        .prefix("scan-")
        .suffix(".jpg")
        .tempfile()?;
    scan_file.write_all(&image_data)?;
    scan_file.flush()?;

    let prediction = model.predict(scan_file.path()).await?;

    let key = S3Service::object_key(filename);
    let image_url = match storage
        .upload_public(&image_data, &key, S3Service::content_type_for(filename))
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Storage upload failed: {}", e);
            None
        }
    };

    Ok(PredictionResponse {
        result: prediction.class.label(),
        confidence: prediction.confidence,
        image_url: image_url.or_else(|| Some(format!("/uploads/{}", filename))),
    })
}

fn strip_data_url(encoded: &str) -> &str {
    if encoded.starts_with("data:image") {
        encoded.splitn(2, ',').nth(1).unwrap_or("")
    } else {
        encoded
    }
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: message.to_string(),
    })
}
