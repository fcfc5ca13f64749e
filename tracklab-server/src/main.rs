use tracklab_collab::Config;
use tracklab_server::{init_logger, run_server};

#[tokio::main]
async fn main() {
    init_logger();

    let config = Config::from_env();
    run_server(config).await;
}
