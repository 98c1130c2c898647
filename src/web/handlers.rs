//! Request handlers for the presentation shell

use super::{page, AppState};
use crate::{
    error::{BgRemovalError, FailureKind, Result},
    processor::ProcessedImage,
    services::{DownloadNamer, ImageCodec},
    tracing_config::{events, spans},
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "image";

/// One uploaded file
#[derive(Debug)]
struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// A processed upload ready to be rendered or downloaded
#[derive(Debug)]
struct Outcome {
    upload: Upload,
    processed: ProcessedImage,
    download_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    error: String,
    hint: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthBody {
    status: &'static str,
    segmenter: String,
    version: &'static str,
}

fn status_for(error: &BgRemovalError) -> StatusCode {
    match error.kind() {
        FailureKind::Decode => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::Processing => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::index(&state.config))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        segmenter: state.processor.segmenter_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Form submission: render the result page or the error page
pub(crate) async fn remove_form(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4().to_string();
    async move {
        match process_upload(&state, multipart).await {
            Ok(outcome) => {
                let mime = ImageCodec::guess_mime(&outcome.upload.bytes);
                let view = page::ResultView {
                    original: &outcome.upload.bytes,
                    original_mime: mime,
                    processed_png: &outcome.processed.png,
                    download_name: &outcome.download_name,
                };
                Html(page::result(&state.config, &view)).into_response()
            },
            Err(e) => {
                events::error_with_context(&e, "remove");
                (status_for(&e), Html(page::error(&state.config, &e.to_string()))).into_response()
            },
        }
    }
    .instrument(spans::request(&request_id, "/remove"))
    .await
}

/// Programmatic variant: the PNG itself, or a JSON error
pub(crate) async fn remove_api(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4().to_string();
    async move {
        match process_upload(&state, multipart).await {
            Ok(outcome) => (
                [
                    (header::CONTENT_TYPE, "image/png".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", outcome.download_name),
                    ),
                ],
                outcome.processed.png,
            )
                .into_response(),
            Err(e) => {
                events::error_with_context(&e, "api remove");
                let body = ErrorBody {
                    error: e.to_string(),
                    hint: page::ERROR_HINT,
                };
                (status_for(&e), Json(body)).into_response()
            },
        }
    }
    .instrument(spans::request(&request_id, "/api/remove"))
    .await
}

async fn process_upload(state: &AppState, mut multipart: Multipart) -> Result<Outcome> {
    let upload = read_upload(&mut multipart).await?;
    if !state.config.upload.accepts(&upload.file_name) {
        return Err(BgRemovalError::unsupported_format(format!(
            "'{}' is not one of the accepted formats ({})",
            upload.file_name,
            state.config.upload.accepted_extensions.join(", ")
        )));
    }
    info!(file_name = %upload.file_name, bytes = upload.bytes.len(), "Upload received");

    let processor = state.processor.clone();
    let bytes = upload.bytes.clone();
    let processed = tokio::task::spawn_blocking(move || processor.process_bytes(&bytes))
        .await
        .map_err(|e| BgRemovalError::internal(format!("Processing task failed: {e}")))??;

    let download_name = DownloadNamer::file_name(&upload.file_name, &state.config.download);
    Ok(Outcome {
        upload,
        processed,
        download_name,
    })
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BgRemovalError::decode(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| BgRemovalError::decode(format!("Failed to read upload: {e}")))?;
        return Ok(Upload { file_name, bytes });
    }

    Err(BgRemovalError::decode(format!(
        "No image was uploaded (expected form field '{UPLOAD_FIELD}')"
    )))
}
