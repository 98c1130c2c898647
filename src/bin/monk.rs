//! Monk background remover
//!
//! Web upload page and command-line tool for removing image backgrounds with
//! a U²-Net segmentation model.

use monk_bgremove::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
