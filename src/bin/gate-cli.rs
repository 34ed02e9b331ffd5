use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for the inkgate admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate system status
    Status,
    /// Inspect an account's ledger
    Ledger {
        /// Wallet address
        address: String,
    },
    /// List an account's unlocked chapters
    Entitlements {
        /// Wallet address
        address: String,
    },
    /// Record a manual credit adjustment (negative amounts debit)
    Adjust {
        /// Wallet address
        address: String,
        /// Signed credit amount
        amount: i64,
    },
    /// Recompute every balance from the transaction log
    Reconcile,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Ledger { address } => {
            let res = client
                .get(format!("{}/admin/accounts/{}/ledger", cli.url, address))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Entitlements { address } => {
            let res = client
                .get(format!(
                    "{}/admin/accounts/{}/entitlements",
                    cli.url, address
                ))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Adjust { address, amount } => {
            let res = client
                .post(format!("{}/admin/adjust", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "address": address, "amount": amount }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Reconcile => {
            let res = client
                .post(format!("{}/admin/reconcile", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        eprintln!("Request failed: {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
