use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ledger_core::{constants::POW_TARGET_DIFFICULTY, validate_chain, ChainSnapshot};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_NODE: &str = "http://127.0.0.1:5001";

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the minimal ledger node")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine one block on the node
    Mine {
        /// Node base URL (e.g. http://127.0.0.1:5001)
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Print the node's full chain
    Chain {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Fetch the chain and check every link and proof locally
    Verify {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
        /// Difficulty the node was started with
        #[arg(long, default_value_t = POW_TARGET_DIFFICULTY)]
        difficulty: usize,
    },
}

async fn get_text(client: &reqwest::Client, url: String) -> Result<()> {
    debug!(%url, "GET");
    let res = client.get(url).send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    match cli.cmd {
        Command::Mine { node } => get_text(&client, format!("{node}/mine_block")).await?,
        Command::Chain { node } => get_text(&client, format!("{node}/get_chain")).await?,
        Command::Verify { node, difficulty } => {
            let snapshot: ChainSnapshot = client
                .get(format!("{node}/get_chain"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if snapshot.length != snapshot.chain.len() {
                warn!(
                    reported = snapshot.length,
                    received = snapshot.chain.len(),
                    "length mismatch"
                );
                bail!(
                    "node reported {} blocks but sent {}",
                    snapshot.length,
                    snapshot.chain.len()
                );
            }
            match validate_chain(&snapshot.chain, difficulty) {
                Ok(()) => println!("chain of {} blocks is valid", snapshot.length),
                Err(e) => bail!("chain is invalid: {e}"),
            }
        }
    }
    Ok(())
}
