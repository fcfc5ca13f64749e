use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post, put},
    Json,
};
use tracklab_collab::{
    AuthError, Credentials, DatabaseError, NewAccount, SessionData, UpdatedUser, UserData,
};

use crate::{
    schemas::{LoginSchema, RegisterSchema, UpdateProfileSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router, ServerContext, ServerError, ServerResult,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> UserData {
        self.0.user.clone()
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::Unauthorized)?;

        let parts: Vec<_> = token.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err(ServerError::Validation(
                "Authorization must be Bearer".to_string(),
            ));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let session = context
            .collab
            .auth
            .session(token)
            .await
            .map_err(|e| match e {
                AuthError::SessionExpired => ServerError::SessionExpired,
                AuthError::Db(DatabaseError::NotFound { .. }) => ServerError::Unauthorized,
                e => e.into(),
            })?;

        Ok(Self(session))
    }
}

/// Like [Session], but read-mostly endpoints using it continue
/// unauthenticated instead of rejecting when the token is missing or bad
pub struct OptionalSession(pub Option<SessionData>);

#[async_trait]
impl FromRequestParts<ServerContext> for OptionalSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await.ok();

        Ok(Self(session.map(|s| s.0)))
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 201, body = LoginResult)
    )
)]
pub(crate) async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<(StatusCode, Json<LoginResult>)> {
    let session = context
        .collab
        .auth
        .register(NewAccount {
            email: body.email,
            password: body.password,
            display_name: body.display_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(
            session
                .to_serialized()
                .with_message("User registered successfully"),
        ),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
pub(crate) async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .collab
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Session was deleted")
    )
)]
pub(crate) async fn logout(session: Session, State(context): State<ServerContext>) -> ServerResult<()> {
    context.collab.auth.logout(session.token()).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
pub(crate) async fn me(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "auth",
    request_body = UpdateProfileSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
pub(crate) async fn update_profile(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<UpdateProfileSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .auth
        .update_profile(UpdatedUser {
            id: session.user().id,
            display_name: body.display_name,
            preferences: body.preferences,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::Request;
    use tracklab_collab::{Collab, Config};

    use super::*;
    use crate::RateLimiter;

    async fn context() -> (ServerContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");

        let config = Config {
            uploads_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            ..Config::default()
        };

        let collab = Collab::init(&config).await.expect("collab initializes");

        let context = ServerContext {
            collab: Arc::new(collab),
            config: Arc::new(config),
            rate_limiter: Arc::new(RateLimiter::default()),
        };

        (context, dir)
    }

    fn request_parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");

        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let (parts, _) = builder.body(()).expect("request builds").into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_or_bad_tokens_continue_unauthenticated() {
        let (context, _dir) = context().await;

        let mut parts = request_parts(None);
        let session = OptionalSession::from_request_parts(&mut parts, &context)
            .await
            .expect("extraction never fails");
        assert!(session.0.is_none());

        let mut parts = request_parts(Some("Bearer nonsense"));
        let session = OptionalSession::from_request_parts(&mut parts, &context)
            .await
            .expect("extraction never fails");
        assert!(session.0.is_none());
    }

    #[tokio::test]
    async fn valid_tokens_yield_the_session_either_way() {
        let (context, _dir) = context().await;

        let issued = context
            .collab
            .auth
            .register(tracklab_collab::NewAccount {
                email: "soft@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
                display_name: "Soft".to_string(),
            })
            .await
            .expect("registers");

        let bearer = format!("Bearer {}", issued.token);

        let mut parts = request_parts(Some(&bearer));
        let session = OptionalSession::from_request_parts(&mut parts, &context)
            .await
            .expect("extraction never fails");
        assert_eq!(
            session.0.map(|s| s.user.id),
            Some(issued.user.id)
        );

        let mut parts = request_parts(Some(&bearer));
        let session = Session::from_request_parts(&mut parts, &context)
            .await
            .expect("the strict extractor accepts a valid token");
        assert_eq!(session.user().id, issued.user.id);
    }

    #[tokio::test]
    async fn the_strict_extractor_rejects_missing_tokens() {
        let (context, _dir) = context().await;

        let mut parts = request_parts(None);
        let result = Session::from_request_parts(&mut parts, &context).await;

        assert!(matches!(result, Err(ServerError::Unauthorized)));
    }
}
