use std::sync::Arc;
use thiserror::Error;

use crate::{
    Database, DatabaseError, NewProject, NewTrack, PrimaryKey, ProjectData, TrackData,
    UpdatedProject, UpdatedTrack,
};

/// Manages projects and the tracks inside them. Every operation takes the
/// acting user, and ownership is checked before anything is read or written.
pub struct ProjectManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    /// The project exists but belongs to someone else
    #[error("Access denied")]
    Forbidden,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> ProjectManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(
        &self,
        user_id: PrimaryKey,
        new_project: NewProject,
    ) -> Result<ProjectData, ProjectError> {
        Ok(self
            .db
            .create_project(NewProject {
                user_id,
                ..new_project
            })
            .await?)
    }

    pub async fn get(
        &self,
        user_id: PrimaryKey,
        project_id: PrimaryKey,
    ) -> Result<ProjectData, ProjectError> {
        self.owned_project(user_id, project_id).await
    }

    /// Lists the user's projects, most recently updated first
    pub async fn list(&self, user_id: PrimaryKey) -> Result<Vec<ProjectData>, ProjectError> {
        Ok(self.db.projects_by_user(user_id).await?)
    }

    pub async fn update(
        &self,
        user_id: PrimaryKey,
        updated_project: UpdatedProject,
    ) -> Result<ProjectData, ProjectError> {
        let _ = self.owned_project(user_id, updated_project.id).await?;
        Ok(self.db.update_project(updated_project).await?)
    }

    /// Deletes a project and all of its tracks
    pub async fn delete(
        &self,
        user_id: PrimaryKey,
        project_id: PrimaryKey,
    ) -> Result<(), ProjectError> {
        let _ = self.owned_project(user_id, project_id).await?;
        Ok(self.db.delete_project(project_id).await?)
    }

    /// Adds a track to a project, appending it after the existing tracks
    pub async fn add_track(
        &self,
        user_id: PrimaryKey,
        new_track: NewTrack,
    ) -> Result<TrackData, ProjectError> {
        let _ = self.owned_project(user_id, new_track.project_id).await?;

        let existing = self.db.tracks_by_project(new_track.project_id).await?;
        let next_number = existing
            .iter()
            .map(|t| t.track_number)
            .max()
            .unwrap_or_default()
            + 1;

        Ok(self
            .db
            .create_track(NewTrack {
                track_number: next_number,
                ..new_track
            })
            .await?)
    }

    pub async fn list_tracks(
        &self,
        user_id: PrimaryKey,
        project_id: PrimaryKey,
    ) -> Result<Vec<TrackData>, ProjectError> {
        let _ = self.owned_project(user_id, project_id).await?;
        Ok(self.db.tracks_by_project(project_id).await?)
    }

    pub async fn update_track(
        &self,
        user_id: PrimaryKey,
        updated_track: UpdatedTrack,
    ) -> Result<TrackData, ProjectError> {
        let track = self.db.track_by_id(updated_track.id).await?;
        let _ = self.owned_project(user_id, track.project_id).await?;

        Ok(self.db.update_track(updated_track).await?)
    }

    pub async fn delete_track(
        &self,
        user_id: PrimaryKey,
        track_id: PrimaryKey,
    ) -> Result<(), ProjectError> {
        let track = self.db.track_by_id(track_id).await?;
        let _ = self.owned_project(user_id, track.project_id).await?;

        Ok(self.db.delete_track(track_id).await?)
    }

    /// Fetches a project, failing with [ProjectError::Forbidden] if the
    /// acting user doesn't own it
    async fn owned_project(
        &self,
        user_id: PrimaryKey,
        project_id: PrimaryKey,
    ) -> Result<ProjectData, ProjectError> {
        let project = self.db.project_by_id(project_id).await?;

        if project.user_id != user_id {
            return Err(ProjectError::Forbidden);
        }

        Ok(project)
    }
}
