use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    assembly_cli::main_entry().await
}
