use serde_json::json;
use tempfile::TempDir;
use tracklab_collab::{
    Collab, Config, Database, DatabaseError, NewAccount, NewProject, NewTrack, ProjectError,
    SqliteDatabase,
};

async fn setup() -> (Collab<SqliteDatabase>, TempDir) {
    let dir = TempDir::new().expect("temp dir");

    let config = Config {
        uploads_dir: dir.path().join("uploads"),
        processed_dir: dir.path().join("processed"),
        ..Config::default()
    };

    let collab = Collab::init(&config).await.expect("collab initializes");
    (collab, dir)
}

async fn register(collab: &Collab<SqliteDatabase>, email: &str) -> i64 {
    let session = collab
        .auth
        .register(NewAccount {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
            display_name: "Test".to_string(),
        })
        .await
        .expect("registers");

    session.user.id
}

fn new_project(user_id: i64, name: &str) -> NewProject {
    NewProject {
        user_id,
        name: name.to_string(),
        description: String::new(),
        genre: "electronic".to_string(),
        key_signature: "C".to_string(),
        tempo: 120,
        time_signature: "4/4".to_string(),
        settings: json!({}),
    }
}

fn new_track(project_id: i64, name: &str) -> NewTrack {
    NewTrack {
        project_id,
        name: name.to_string(),
        track_number: 0,
        instrument_type: "synth".to_string(),
        volume: 0.8,
        pan: 0.,
        muted: false,
        soloed: false,
        effects: vec![],
        automation: vec![],
    }
}

#[tokio::test]
async fn tracks_are_numbered_in_order_of_insertion() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "order@example.com").await;

    let project = collab
        .projects
        .create(user_id, new_project(user_id, "Order"))
        .await
        .expect("creates project");

    let first = collab
        .projects
        .add_track(user_id, new_track(project.id, "Bass"))
        .await
        .expect("adds first track");
    let second = collab
        .projects
        .add_track(user_id, new_track(project.id, "Lead"))
        .await
        .expect("adds second track");

    assert_eq!(first.track_number, 1);
    assert_eq!(second.track_number, 2);
}

#[tokio::test]
async fn deleting_a_project_removes_its_tracks() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "cascade@example.com").await;

    let project = collab
        .projects
        .create(user_id, new_project(user_id, "Doomed"))
        .await
        .expect("creates project");

    let track = collab
        .projects
        .add_track(user_id, new_track(project.id, "Pads"))
        .await
        .expect("adds track");

    collab
        .projects
        .delete(user_id, project.id)
        .await
        .expect("deletes project");

    let orphan = collab.database().track_by_id(track.id).await;
    assert!(matches!(
        orphan,
        Err(DatabaseError::NotFound { resource: "track", .. })
    ));
}

#[tokio::test]
async fn other_users_projects_are_forbidden() {
    let (collab, _dir) = setup().await;
    let owner = register(&collab, "owner@example.com").await;
    let intruder = register(&collab, "intruder@example.com").await;

    let project = collab
        .projects
        .create(owner, new_project(owner, "Private"))
        .await
        .expect("creates project");

    let result = collab.projects.get(intruder, project.id).await;
    assert!(matches!(result, Err(ProjectError::Forbidden)));

    let result = collab.projects.delete(intruder, project.id).await;
    assert!(matches!(result, Err(ProjectError::Forbidden)));

    // The owner is unaffected
    collab
        .projects
        .get(owner, project.id)
        .await
        .expect("owner can still read");
}

#[tokio::test]
async fn missing_projects_are_not_found() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "missing@example.com").await;

    let result = collab.projects.get(user_id, 999).await;
    assert!(matches!(
        result,
        Err(ProjectError::Db(DatabaseError::NotFound { .. }))
    ));
}
