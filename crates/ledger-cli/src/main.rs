use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{Block, Chain, Transaction};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        /// Sender
        #[arg(long)]
        sender: String,
        /// Recipient
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// Mine the pending transactions into a new block
    Mine,
    /// Print the whole chain as JSON
    Chain,
    /// Print pending transactions
    Mempool,
    /// Download the chain and check hashes, links and proofs locally
    Verify,
}

#[derive(Serialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: f64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct TxId {
    #[serde(rename = "txID")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct Mined {
    index: u64,
    proof: u64,
    timestamp: i64,
    prevhash: String,
}

/// Unwrap the node's `{status, data}` envelope, turning `status: "error"`
/// into an `Err` carrying the node's message.
async fn unwrap_envelope<T: DeserializeOwned>(res: reqwest::Response) -> Result<T> {
    let http_status = res.status();
    let body = res.text().await?;
    debug!(%http_status, %body, "node replied");
    let value: serde_json::Value =
        serde_json::from_str(&body).with_context(|| format!("non-JSON reply ({http_status})"))?;
    if value["status"] != "success" {
        bail!("node returned {http_status}: {}", value["data"]);
    }
    let envelope: Envelope<T> = serde_json::from_value(value).context("unexpected reply shape")?;
    debug!(status = %envelope.status, "decoded reply");
    Ok(envelope.data)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    match cli.cmd {
        Command::Submit {
            sender,
            recipient,
            amount,
        } => {
            let tx = TxIn {
                sender,
                recipient,
                amount,
            };
            let res = client
                .post(format!("{node}/transaction"))
                .json(&tx)
                .send()
                .await?;
            let id: TxId = unwrap_envelope(res).await?;
            println!("{}", id.tx_id);
        }
        Command::Mine => {
            let res = client.get(format!("{node}/mine")).send().await?;
            let mined: Mined = unwrap_envelope(res).await?;
            println!(
                "mined block {} (proof {}, timestamp {}, prev {})",
                mined.index, mined.proof, mined.timestamp, mined.prevhash
            );
        }
        Command::Chain => {
            let res = client.get(format!("{node}/blockchain")).send().await?;
            let blocks: Vec<Block> = unwrap_envelope(res).await?;
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }
        Command::Mempool => {
            let res = client.get(format!("{node}/mempool")).send().await?;
            let pending: Vec<Transaction> = unwrap_envelope(res).await?;
            for tx in &pending {
                println!(
                    "{}  {} -> {}  {}",
                    tx.id(),
                    tx.sender(),
                    tx.recipient(),
                    ledger_core::format_amount(tx.amount())
                );
            }
            println!("{} pending", pending.len());
        }
        Command::Verify => {
            let res = client.get(format!("{node}/blockchain")).send().await?;
            let blocks: Vec<Block> = unwrap_envelope(res).await?;
            let chain = Chain::from_blocks(blocks).context("chain failed verification")?;
            let tip = chain.last()?;
            println!("chain ok: height {}, tip {}", chain.height(), tip.hash());
        }
    }
    Ok(())
}
