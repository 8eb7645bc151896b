//! labca - per-lab certificate authority CLI

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    labca_cli::run().await
}
