use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json,
};
use tracklab_collab::{NewProject, NewTrack, UpdatedProject, UpdatedTrack};

use crate::{
    auth::Session,
    schemas::{NewProjectSchema, NewTrackSchema, UpdateProjectSchema, UpdateTrackSchema, ValidatedJson},
    serialized::{Project, ProjectList, ToSerialized, Track, TrackList},
    Router, ServerContext, ServerError, ServerResult,
};

#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "projects",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = ProjectList)
    )
)]
pub(crate) async fn list_projects(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<ProjectList>> {
    let projects = context.collab.projects.list(session.user().id).await?;

    Ok(Json(ProjectList {
        projects: projects.to_serialized(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "projects",
    request_body = NewProjectSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Project)
    )
)]
pub(crate) async fn create_project(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewProjectSchema>,
) -> ServerResult<(StatusCode, Json<Project>)> {
    let project = context
        .collab
        .projects
        .create(
            session.user().id,
            NewProject {
                user_id: session.user().id,
                name: body.name,
                description: body.description,
                genre: body.genre,
                key_signature: body.key_signature,
                tempo: body.tempo,
                time_signature: body.time_signature,
                settings: body.settings,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "projects",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Project)
    )
)]
pub(crate) async fn project(
    session: Session,
    State(context): State<ServerContext>,
    Path(project_id): Path<i64>,
) -> ServerResult<Json<Project>> {
    let project = context
        .collab
        .projects
        .get(session.user().id, project_id)
        .await?;

    Ok(Json(project.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    tag = "projects",
    request_body = UpdateProjectSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Project)
    )
)]
pub(crate) async fn update_project(
    session: Session,
    State(context): State<ServerContext>,
    Path(project_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateProjectSchema>,
) -> ServerResult<Json<Project>> {
    let project = context
        .collab
        .projects
        .update(
            session.user().id,
            UpdatedProject {
                id: project_id,
                name: body.name,
                description: body.description,
                genre: body.genre,
                key_signature: body.key_signature,
                tempo: body.tempo,
                time_signature: body.time_signature,
                settings: body.settings,
            },
        )
        .await?;

    Ok(Json(project.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    tag = "projects",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Project and its tracks were deleted")
    )
)]
pub(crate) async fn delete_project(
    session: Session,
    State(context): State<ServerContext>,
    Path(project_id): Path<i64>,
) -> ServerResult<()> {
    context
        .collab
        .projects
        .delete(session.user().id, project_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}/tracks",
    tag = "projects",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = TrackList)
    )
)]
pub(crate) async fn list_tracks(
    session: Session,
    State(context): State<ServerContext>,
    Path(project_id): Path<i64>,
) -> ServerResult<Json<TrackList>> {
    let tracks = context
        .collab
        .projects
        .list_tracks(session.user().id, project_id)
        .await?;

    Ok(Json(TrackList {
        tracks: tracks.to_serialized(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/tracks",
    tag = "projects",
    request_body = NewTrackSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Track)
    )
)]
pub(crate) async fn add_track(
    session: Session,
    State(context): State<ServerContext>,
    Path(project_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<NewTrackSchema>,
) -> ServerResult<(StatusCode, Json<Track>)> {
    let effects = serde_json::from_value(body.effects)
        .map_err(|_| ServerError::Validation("Malformed effects chain".to_string()))?;
    let automation = serde_json::from_value(body.automation)
        .map_err(|_| ServerError::Validation("Malformed automation data".to_string()))?;

    let track = context
        .collab
        .projects
        .add_track(
            session.user().id,
            NewTrack {
                project_id,
                name: body.name,
                // The position is assigned when the track is added
                track_number: 0,
                instrument_type: body.instrument_type,
                volume: body.volume,
                pan: body.pan,
                muted: body.muted,
                soloed: body.soloed,
                effects,
                automation,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(track.to_serialized())))
}

#[utoipa::path(
    put,
    path = "/api/projects/{id}/tracks/{track_id}",
    tag = "projects",
    request_body = UpdateTrackSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Track)
    )
)]
pub(crate) async fn update_track(
    session: Session,
    State(context): State<ServerContext>,
    Path((_project_id, track_id)): Path<(i64, i64)>,
    ValidatedJson(body): ValidatedJson<UpdateTrackSchema>,
) -> ServerResult<Json<Track>> {
    let effects = body
        .effects
        .map(serde_json::from_value)
        .transpose()
        .map_err(|_| ServerError::Validation("Malformed effects chain".to_string()))?;
    let automation = body
        .automation
        .map(serde_json::from_value)
        .transpose()
        .map_err(|_| ServerError::Validation("Malformed automation data".to_string()))?;

    let track = context
        .collab
        .projects
        .update_track(
            session.user().id,
            UpdatedTrack {
                id: track_id,
                name: body.name,
                track_number: body.track_number,
                instrument_type: body.instrument_type,
                volume: body.volume,
                pan: body.pan,
                muted: body.muted,
                soloed: body.soloed,
                effects,
                automation,
            },
        )
        .await?;

    Ok(Json(track.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}/tracks/{track_id}",
    tag = "projects",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Track was deleted")
    )
)]
pub(crate) async fn delete_track(
    session: Session,
    State(context): State<ServerContext>,
    Path((_project_id, track_id)): Path<(i64, i64)>,
) -> ServerResult<()> {
    context
        .collab
        .projects
        .delete_track(session.user().id, track_id)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_projects))
        .route("/", post(create_project))
        .route("/:id", get(project))
        .route("/:id", put(update_project))
        .route("/:id", delete(delete_project))
        .route("/:id/tracks", get(list_tracks))
        .route("/:id/tracks", post(add_track))
        .route("/:id/tracks/:track_id", put(update_track))
        .route("/:id/tracks/:track_id", delete(delete_track))
}
