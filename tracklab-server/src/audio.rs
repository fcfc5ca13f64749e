use std::path::Path;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json,
};
use serde::Serialize;
use tracklab_collab::{AiRequest, AudioAnalysis, ExportArtifact, Waveform};

use crate::{
    ai::AiResponse,
    auth::Session,
    schemas::{
        AnalyzeSchema, ExportSchema, MasterSchema, StemsSchema, ValidatedJson, WaveformSchema,
    },
    serialized::{ToSerialized, UploadResult},
    Router, ServerContext, ServerError, ServerResult,
};

/// Uploads above this size are refused
const UPLOAD_LIMIT: usize = 100 * 1024 * 1024;

#[utoipa::path(
    post,
    path = "/api/audio/upload",
    tag = "audio",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = UploadResult),
        (status = 413, description = "File exceeds the upload limit")
    )
)]
pub(crate) async fn upload(
    _session: Session,
    State(context): State<ServerContext>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResult>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Validation(e.body_text()))?
    {
        if field.name() != Some("audio") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();

        if !content_type.starts_with("audio/") {
            return Err(ServerError::Validation(
                "Only audio files are accepted".to_string(),
            ));
        }

        let filename = field.file_name().unwrap_or("upload.wav").to_string();
        let bytes = field.bytes().await.map_err(|_| ServerError::PayloadTooLarge)?;

        let file = context.collab.media.ingest(&filename, &bytes).await?;

        return Ok(Json(UploadResult {
            message: "Audio file uploaded successfully",
            audio: file.to_serialized(),
        }));
    }

    Err(ServerError::Validation("Missing audio file".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/audio/master",
    tag = "audio",
    request_body = MasterSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn master(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<MasterSchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Mastering {
                audio_url: body.audio_url,
                style: body.style,
                settings: body.settings,
            },
        )
        .await?;

    Ok(Json(AiResponse::new(
        "Audio mastered successfully",
        result.payload,
    )))
}

#[utoipa::path(
    post,
    path = "/api/audio/separate-stems",
    tag = "audio",
    request_body = StemsSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn separate_stems(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<StemsSchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Stems {
                audio_url: body.audio_url,
                stem_types: body.stem_types,
            },
        )
        .await?;

    Ok(Json(AiResponse::new(
        "Stems separated successfully",
        result.payload,
    )))
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    message: &'static str,
    analysis: AudioAnalysis,
}

#[utoipa::path(
    post,
    path = "/api/audio/analyze",
    tag = "audio",
    request_body = AnalyzeSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object)
    )
)]
pub(crate) async fn analyze(
    _session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<AnalyzeSchema>,
) -> ServerResult<Json<AnalyzeResponse>> {
    let analysis = context.collab.media.analyze(&body.audio_url).await?;

    Ok(Json(AnalyzeResponse {
        message: "Audio analysis completed",
        analysis,
    }))
}

#[derive(Debug, Serialize)]
struct WaveformResponse {
    message: &'static str,
    waveform: Waveform,
}

#[utoipa::path(
    post,
    path = "/api/audio/waveform",
    tag = "audio",
    request_body = WaveformSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object)
    )
)]
pub(crate) async fn waveform(
    _session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<WaveformSchema>,
) -> ServerResult<Json<WaveformResponse>> {
    let waveform = context
        .collab
        .media
        .waveform(Path::new(&body.audio_url), body.resolution)
        .await?;

    Ok(Json(WaveformResponse {
        message: "Waveform generated successfully",
        waveform,
    }))
}

#[derive(Debug, Serialize)]
struct ExportResponse {
    message: &'static str,
    export: ExportArtifact,
}

#[utoipa::path(
    post,
    path = "/api/audio/export",
    tag = "audio",
    request_body = ExportSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object)
    )
)]
pub(crate) async fn export(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ExportSchema>,
) -> ServerResult<Json<ExportResponse>> {
    // Only the owner can export a project
    let _ = context
        .collab
        .projects
        .get(session.user().id, body.project_id)
        .await?;

    let export = context
        .collab
        .media
        .export(body.project_id, &body.format, &body.quality)
        .await?;

    Ok(Json(ExportResponse {
        message: "Project export started",
        export,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/master", post(master))
        .route("/separate-stems", post(separate_stems))
        .route("/analyze", post(analyze))
        .route("/waveform", post(waveform))
        .route("/export", post(export))
}
