#[tokio::main]
async fn main() -> std::io::Result<()> {
    bomber_server::run_with_config().await
}
