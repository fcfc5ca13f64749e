use tempfile::TempDir;
use tracklab_collab::{Auth, Collab, Config, LedgerError, NewAccount, SqliteDatabase};

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

#[tokio::test]
async fn new_accounts_start_with_credits() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "credits@example.com").await;

    let balance = collab.ledger.balance(user_id).await.expect("balance");
    assert_eq!(balance, Auth::<SqliteDatabase>::STARTING_CREDITS);
}

#[tokio::test]
async fn debit_returns_the_new_balance() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "debit@example.com").await;

    let remaining = collab.ledger.debit(user_id, 0.5).await.expect("debits");
    assert_eq!(remaining, 2.5);

    let balance = collab.ledger.balance(user_id).await.expect("balance");
    assert_eq!(balance, 2.5);
}

#[tokio::test]
async fn insufficient_debit_leaves_the_balance_untouched() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "broke@example.com").await;

    let result = collab.ledger.debit(user_id, 5.).await;

    assert!(matches!(
        result,
        Err(LedgerError::InsufficientCredits {
            required,
            balance,
        }) if required == 5. && balance == 3.
    ));

    let balance = collab.ledger.balance(user_id).await.expect("balance");
    assert_eq!(balance, 3.);
}

#[tokio::test]
async fn credit_adds_to_the_balance() {
    let (collab, _dir) = setup().await;
    let user_id = register(&collab, "topup@example.com").await;

    let balance = collab.ledger.credit(user_id, 2.).await.expect("credits");
    assert_eq!(balance, 5.);
}
