use axum::{
    extract::State,
    routing::{get, post},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    auth::Session,
    schemas::{InviteSchema, ValidatedJson},
    Router, ServerContext, ServerResult,
};

#[derive(Debug, Serialize)]
struct InvitationList {
    invitations: Vec<Value>,
}

#[utoipa::path(
    get,
    path = "/api/collaboration/invitations",
    tag = "collaboration",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object)
    )
)]
pub(crate) async fn invitations(_session: Session) -> Json<InvitationList> {
    // Stored invitations are not implemented yet, collaborators join
    // through the realtime gateway
    Json(InvitationList {
        invitations: vec![],
    })
}

#[derive(Debug, Serialize)]
struct InviteResult {
    message: &'static str,
}

#[utoipa::path(
    post,
    path = "/api/collaboration/invite",
    tag = "collaboration",
    request_body = InviteSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Object)
    )
)]
pub(crate) async fn invite(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<InviteSchema>,
) -> ServerResult<Json<InviteResult>> {
    // Only the owner can invite collaborators
    let _ = context
        .collab
        .projects
        .get(session.user().id, body.project_id)
        .await?;

    log::info!(
        "User {} invited {} to project {} as {}",
        session.user().id,
        body.email,
        body.project_id,
        body.permission_level
    );

    Ok(Json(InviteResult {
        message: "Invitation sent successfully",
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/invitations", get(invitations))
        .route("/invite", post(invite))
}
