use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sniper_cli::app_init()?;
    sniper_cli::run().await
}
