use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use super::thumbnail::fetch_thumbnail;
use super::AppState;
use crate::download::{MediaKind, ResolvedDownload};
use crate::extractors::validate_url;
use crate::formats::SearchResponse;
use crate::utils::{content_disposition, content_type_for_filename};
use crate::DownloaderError;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub format_id: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl DownloadRequest {
    /// Trimmed url, format id and kind, or `InvalidInput` when a field is missing
    fn validate(&self) -> Result<(&str, &str, MediaKind), DownloaderError> {
        let url = self.url.as_deref().map(str::trim).unwrap_or_default();
        let format_id = self.format_id.as_deref().map(str::trim).unwrap_or_default();

        if url.is_empty() || format_id.is_empty() {
            return Err(DownloaderError::InvalidInput(
                "Missing required parameters".to_string(),
            ));
        }
        check_url(url)?;

        Ok((url, format_id, MediaKind::from_request(self.kind.as_deref())))
    }
}

fn check_url(url: &str) -> Result<(), DownloaderError> {
    validate_url(url)
        .map(|_| ())
        .map_err(|_| DownloaderError::InvalidInput("Invalid URL format".to_string()))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, DownloaderError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection);
        DownloaderError::InvalidInput("Invalid request body".to_string())
    })
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = chrono::Utc::now() - state.started_at;
    Json(json!({
        "status": "ok",
        "uptime_secs": uptime.num_seconds(),
    }))
}

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, DownloaderError> {
    let request = json_body(payload)?;
    let url = request.url.as_deref().map(str::trim).unwrap_or_default();

    if url.is_empty() {
        return Err(DownloaderError::InvalidInput(
            "Please provide a valid URL".to_string(),
        ));
    }
    check_url(url)?;

    let info = state.downloader.extract(url).await?;
    let response = SearchResponse::from_media(&info);

    tracing::info!(
        "Found {} video tiers and {} audio options for {}",
        response.formats.len(),
        response.audio_formats.len(),
        url
    );

    Ok(Json(response))
}

pub async fn get_download_url(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<ResolvedDownload>, DownloaderError> {
    let request = json_body(payload)?;
    let (url, format_id, kind) = request.validate()?;

    let resolved = state.downloader.resolve(url, format_id, kind).await?;
    Ok(Json(resolved))
}

/// Download on the server and stream the file back as an attachment
pub async fn download_file(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, DownloaderError> {
    let request = json_body(payload)?;
    let (url, format_id, kind) = request.validate()?;

    let downloaded = state
        .downloader
        .download_to_file(url, format_id, kind)
        .await?;

    let file = tokio::fs::File::open(&downloaded.path)
        .await
        .map_err(|err| {
            DownloaderError::DownloadFailure(format!("Cannot open downloaded file: {}", err))
        })?;

    let header_error =
        |_| DownloaderError::DownloadFailure("Cannot build download headers".to_string());
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_filename(&downloaded.filename)),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(downloaded.size));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&downloaded.filename)).map_err(header_error)?,
    );

    // the job directory lives until the body stream is dropped
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _job = &downloaded;
        chunk
    });

    Ok((headers, Body::from_stream(stream)).into_response())
}

pub async fn thumbnail(
    State(state): State<AppState>,
    Path(url): Path<String>,
) -> Result<Json<Value>, DownloaderError> {
    let data = fetch_thumbnail(&state.http_client, &url)
        .await
        .map_err(|err| {
            tracing::warn!("Thumbnail {} unavailable: {}", url, err);
            DownloaderError::from(err)
        })?;

    Ok(Json(json!({ "thumbnail": data })))
}
