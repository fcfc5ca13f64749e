use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    modifiers(&Security),
    info(
        description = "tracklab-server exposes endpoints to interact with this tracklab instance"
    ),
    paths(
        crate::auth::register,
        crate::auth::login,
        crate::auth::logout,
        crate::auth::me,
        crate::auth::update_profile,
        crate::projects::list_projects,
        crate::projects::create_project,
        crate::projects::project,
        crate::projects::update_project,
        crate::projects::delete_project,
        crate::projects::list_tracks,
        crate::projects::add_track,
        crate::projects::update_track,
        crate::projects::delete_track,
        crate::ai::generate_melody,
        crate::ai::suggest_chords,
        crate::ai::generate_drums,
        crate::ai::analyze_structure,
        crate::ai::mixing_suggestions,
        crate::ai::generate_variations,
        crate::ai::models,
        crate::audio::upload,
        crate::audio::master,
        crate::audio::separate_stems,
        crate::audio::analyze,
        crate::audio::waveform,
        crate::audio::export,
        crate::collaboration::invitations,
        crate::collaboration::invite,
    ),
    components(schemas(
        crate::serialized::User,
        crate::serialized::LoginResult,
        crate::serialized::Project,
        crate::serialized::ProjectList,
        crate::serialized::Track,
        crate::serialized::TrackList,
        crate::serialized::AudioFile,
        crate::serialized::UploadResult,
        crate::schemas::RegisterSchema,
        crate::schemas::LoginSchema,
        crate::schemas::UpdateProfileSchema,
        crate::schemas::NewProjectSchema,
        crate::schemas::UpdateProjectSchema,
        crate::schemas::NewTrackSchema,
        crate::schemas::UpdateTrackSchema,
        crate::schemas::MelodySchema,
        crate::schemas::ChordsSchema,
        crate::schemas::DrumsSchema,
        crate::schemas::MasterSchema,
        crate::schemas::StemsSchema,
        crate::schemas::StructureSchema,
        crate::schemas::MixingSchema,
        crate::schemas::MixTrackSchema,
        crate::schemas::VariationsSchema,
        crate::schemas::AnalyzeSchema,
        crate::schemas::WaveformSchema,
        crate::schemas::ExportSchema,
        crate::schemas::InviteSchema,
    ))
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
