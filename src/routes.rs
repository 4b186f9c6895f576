use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::designer::{DesignRequest, DesignService};
use crate::error::DesignError;
use crate::prompt::RoomType;
use crate::store::{LocalFileStorage, RecordStore};

const DEFAULT_STYLE: &str = "modern minimalist";
const DEFAULT_ROOM_TYPE: &str = "living room";

pub struct AppState {
    pub service: DesignService,
    pub storage: Arc<LocalFileStorage>,
    pub records: Arc<RecordStore>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct GenerateResponse {
    url: String,
    #[serde(rename = "storedImage", skip_serializing_if = "Option::is_none")]
    stored_image: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationEntry {
    id: u64,
    original_image: String,
    generated_image: String,
    style: String,
    room_type: RoomType,
    timestamp: DateTime<Utc>,
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn design_error_response(err: DesignError) -> Response {
    let status = match err {
        DesignError::MissingImage => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(error = %err, "design generation failed");
    json_error(status, err.user_message())
}

pub async fn generate_designs(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut style = None;
    let mut room_type = None;
    let mut custom_prompt = None;
    let mut image_data = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.name().map(str::to_string).as_deref() {
                Some("style") => match field.text().await {
                    Ok(value) => style = Some(value),
                    Err(err) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            format!("reading form failed: {err}"),
                        );
                    }
                },
                Some("roomType") => match field.text().await {
                    Ok(value) => room_type = Some(value),
                    Err(err) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            format!("reading form failed: {err}"),
                        );
                    }
                },
                Some("customPrompt") => match field.text().await {
                    Ok(value) => custom_prompt = Some(value),
                    Err(err) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            format!("reading form failed: {err}"),
                        );
                    }
                },
                Some("image") => match field.bytes().await {
                    Ok(data) => image_data = Some(data.to_vec()),
                    Err(err) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            format!("reading image failed: {err}"),
                        );
                    }
                },
                _ => {}
            },
            Ok(None) => break,
            Err(err) => {
                return json_error(StatusCode::BAD_REQUEST, format!("reading form failed: {err}"));
            }
        }
    }

    let Some(image_data) = image_data else {
        return design_error_response(DesignError::MissingImage);
    };

    let request = DesignRequest {
        style: style.unwrap_or_else(|| DEFAULT_STYLE.to_string()),
        room_type: RoomType::from_input(room_type.as_deref().unwrap_or(DEFAULT_ROOM_TYPE)),
        custom_prompt: custom_prompt.unwrap_or_default(),
        image_data,
    };

    match state.service.generate(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(GenerateResponse {
                url: outcome.image_url,
                stored_image: outcome.stored_image_url,
            }),
        )
            .into_response(),
        Err(err) => design_error_response(err),
    }
}

pub async fn list_generations(State(state): State<Arc<AppState>>) -> Response {
    let records = match state.records.list_recent().await {
        Ok(records) => records,
        Err(err) => {
            error!(error = %err, "listing generations failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };

    let entries: Vec<GenerationEntry> = records
        .into_iter()
        .map(|record| GenerationEntry {
            id: record.id,
            original_image: state.storage.public_url(&record.original_image),
            generated_image: state.storage.public_url(&record.generated_image),
            style: record.style,
            room_type: record.room_type,
            timestamp: record.timestamp,
        })
        .collect();
    (StatusCode::OK, Json(entries)).into_response()
}
