#[tokio::main]
async fn main() -> anyhow::Result<()> {
    invin_backend::run().await
}
