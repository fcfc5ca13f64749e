use tempfile::TempDir;
use tracklab_collab::{
    AiError, AiRequest, Collab, Config, LedgerError, NewAccount, SqliteDatabase,
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

fn melody_request(prompt: &str) -> AiRequest {
    AiRequest::Melody {
        prompt: prompt.to_string(),
        style: "electronic".to_string(),
        key: "C".to_string(),
        tempo: 120,
        length: 8,
    }
}

#[tokio::test]
async fn generation_charges_the_operation_cost() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "melody@example.com").await;

    let result = collab
        .ai
        .handle(user_id, melody_request("a gentle arp"))
        .await
        .expect("generates");

    assert_eq!(result.remaining_credits, 2.5);
    assert_eq!(collab.ledger.balance(user_id).await.expect("balance"), 2.5);
}

#[tokio::test]
async fn generation_stops_when_credits_run_out() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "stems@example.com").await;

    let request = AiRequest::Stems {
        audio_url: "http://localhost:8000/uploads/demo.wav".to_string(),
        stem_types: vec!["vocals".to_string(), "drums".to_string()],
    };

    // Stems cost 2 credits, so a fresh 3 credit account covers exactly one
    let first = collab.ai.handle(user_id, request.clone()).await.expect("first run");
    assert_eq!(first.remaining_credits, 1.);

    let second = collab.ai.handle(user_id, request).await;
    assert!(matches!(
        second,
        Err(AiError::Ledger(LedgerError::InsufficientCredits {
            required,
            balance,
        })) if required == 2. && balance == 1.
    ));

    assert_eq!(collab.ledger.balance(user_id).await.expect("balance"), 1.);
}

#[tokio::test]
async fn a_fresh_account_affords_exactly_six_melodies() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "spender@example.com").await;

    for run in 1..=6 {
        let result = collab
            .ai
            .handle(user_id, melody_request("a gentle arp"))
            .await
            .expect("generation succeeds while credits last");

        assert_eq!(result.remaining_credits, 3. - 0.5 * run as f64);
    }

    let exhausted = collab.ai.handle(user_id, melody_request("one more")).await;
    assert!(matches!(
        exhausted,
        Err(AiError::Ledger(LedgerError::InsufficientCredits { .. }))
    ));

    assert_eq!(collab.ledger.balance(user_id).await.expect("balance"), 0.);
}

#[tokio::test]
async fn invalid_requests_are_rejected_without_charge() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "invalid@example.com").await;

    let result = collab.ai.handle(user_id, melody_request("   ")).await;
    assert!(matches!(result, Err(AiError::MissingParameter("prompt"))));

    assert_eq!(collab.ledger.balance(user_id).await.expect("balance"), 3.);
}

#[tokio::test]
async fn the_model_catalogue_is_stable() {
    let (collab, _dir) = setup().await;

    let models = collab.ai.models();
    let ids: Vec<_> = models.iter().map(|m| m.id).collect();

    assert_eq!(ids, vec!["mastering-v1", "composition-v1", "separation-v1"]);
}
