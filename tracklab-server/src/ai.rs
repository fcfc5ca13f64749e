use axum::{
    extract::State,
    routing::{get, post},
    Json,
};
use serde::Serialize;
use tracklab_collab::{AiPayload, AiRequest, ModelInfo, TrackSummary};

use crate::{
    auth::{OptionalSession, Session},
    schemas::{
        ChordsSchema, DrumsSchema, MelodySchema, MixingSchema, StructureSchema, ValidatedJson,
        VariationsSchema,
    },
    Router, ServerContext, ServerResult,
};

/// The envelope wrapping every generation response
#[derive(Debug, Serialize)]
pub struct AiResponse {
    message: &'static str,
    result: AiPayload,
}

impl AiResponse {
    pub fn new(message: &'static str, result: AiPayload) -> Self {
        Self { message, result }
    }
}

#[utoipa::path(
    post,
    path = "/api/ai/generate-melody",
    tag = "ai",
    request_body = MelodySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn generate_melody(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<MelodySchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Melody {
                prompt: body.prompt,
                style: body.style,
                key: body.key,
                tempo: body.tempo,
                length: body.length,
            },
        )
        .await?;

    Ok(Json(AiResponse {
        message: "Melody generated successfully",
        result: result.payload,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/suggest-chords",
    tag = "ai",
    request_body = ChordsSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn suggest_chords(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ChordsSchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Chords {
                genre: body.genre,
                key: body.key,
                mood: body.mood,
                length: body.length,
            },
        )
        .await?;

    Ok(Json(AiResponse {
        message: "Chord progressions generated successfully",
        result: result.payload,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/generate-drums",
    tag = "ai",
    request_body = DrumsSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn generate_drums(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<DrumsSchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Drums {
                style: body.style,
                tempo: body.tempo,
                complexity: body.complexity,
                length: body.length,
            },
        )
        .await?;

    Ok(Json(AiResponse {
        message: "Drum pattern generated successfully",
        result: result.payload,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/analyze-structure",
    tag = "ai",
    request_body = StructureSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn analyze_structure(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<StructureSchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Structure {
                audio_url: body.audio_url,
            },
        )
        .await?;

    Ok(Json(AiResponse {
        message: "Song structure analyzed successfully",
        result: result.payload,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/mixing-suggestions",
    tag = "ai",
    request_body = MixingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn mixing_suggestions(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<MixingSchema>,
) -> ServerResult<Json<AiResponse>> {
    let tracks = body
        .tracks
        .into_iter()
        .map(|t| TrackSummary {
            name: t.name,
            kind: t.kind,
        })
        .collect();

    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Mixing {
                tracks,
                genre: body.genre,
                reference_track: body.reference_track,
            },
        )
        .await?;

    Ok(Json(AiResponse {
        message: "Mixing suggestions generated successfully",
        result: result.payload,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/generate-variations",
    tag = "ai",
    request_body = VariationsSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object),
        (status = 402, description = "Not enough credits")
    )
)]
pub(crate) async fn generate_variations(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<VariationsSchema>,
) -> ServerResult<Json<AiResponse>> {
    let result = context
        .collab
        .ai
        .handle(
            session.user().id,
            AiRequest::Variations {
                audio_url: body.audio_url,
                variation_type: body.variation_type,
                intensity: body.intensity,
            },
        )
        .await?;

    Ok(Json(AiResponse {
        message: "Variations generated successfully",
        result: result.payload,
    }))
}

#[derive(Debug, Serialize)]
struct ModelList {
    models: Vec<ModelInfo>,
}

#[utoipa::path(
    get,
    path = "/api/ai/models",
    tag = "ai",
    responses(
        (status = 200, body = Object)
    )
)]
pub(crate) async fn models(
    _session: OptionalSession,
    State(context): State<ServerContext>,
) -> Json<ModelList> {
    Json(ModelList {
        models: context.collab.ai.models(),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/generate-melody", post(generate_melody))
        .route("/suggest-chords", post(suggest_chords))
        .route("/generate-drums", post(generate_drums))
        .route("/analyze-structure", post(analyze_structure))
        .route("/mixing-suggestions", post(mixing_suggestions))
        .route("/generate-variations", post(generate_variations))
        .route("/models", get(models))
}
