use anyhow::Result;
use splitzy::client::{ReceiptApiClient, RemoteFailure};
use splitzy::models::format_hash;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let base_url = std::env::var("SPLITZY_URL")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        println!("Usage: receipt-agent <receipt-image>");
        return Ok(());
    };

    println!("Splitzy Receipt Agent");
    println!("=====================");
    println!("Server: {}", base_url);
    println!("Receipt: {}", path.display());
    println!();

    let client = ReceiptApiClient::new(&base_url);

    match client.submit_file(&path).await {
        Ok(result) => {
            println!("[SUCCESS] Bill recorded on-chain");
            println!("   USD Amount: {}", result.usd_amount);
            println!("   ETH Price:  {}", result.unit_price);
            println!("   ETH Amount: {} ETH", result.crypto_display);
            println!("   Wei Amount: {} Wei", result.smallest_unit_amount);
            println!("   Transaction Hash: {}", format_hash(&result.receipt.tx_hash));
            if let Some(block) = result.receipt.block_number {
                println!("   Block: {}", block);
            }
        }
        Err(e) => match e.downcast_ref::<RemoteFailure>() {
            Some(failure) => {
                println!("[FAILED] {} stage: {}", failure.body.stage, failure.body.error);
                if let Some(tx_hash) = &failure.body.tx_hash {
                    println!("   Broadcast but unconfirmed: {}", tx_hash);
                    println!("   Check this hash before uploading the receipt again.");
                }
            }
            None => println!("[FAILED] {}", e),
        },
    }

    Ok(())
}
