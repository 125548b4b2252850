#[tokio::main]
async fn main() -> anyhow::Result<()> {
    co2_client::client().await
}
