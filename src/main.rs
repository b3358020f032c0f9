#[tokio::main]
async fn main() -> std::io::Result<()> {
    versus_server::run_with_config().await
}
