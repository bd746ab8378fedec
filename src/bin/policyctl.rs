use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "policyctl")]
#[command(about = "Management CLI for flashpolicyd", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:10844")]
    url: String,

    /// Admin API bearer token.
    #[arg(short, long, env = "FLASHPOLICYD_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check daemon status
    Status,
    /// Show client counters and uptime
    Stats,
    /// List active connections
    Connections,
    /// Perform a policy handshake and print the document
    Probe {
        /// Policy server address, e.g. 127.0.0.1:10843
        addr: String,

        /// Seconds to wait for the reply.
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Status => "/admin/status",
        Commands::Stats => "/admin/stats",
        Commands::Connections => "/admin/connections",
        Commands::Probe { addr, timeout } => {
            let document = probe(&addr, Duration::from_secs(timeout)).await?;
            print!("{}", document);
            return Ok(());
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn probe(addr: &str, timeout: Duration) -> Result<String, Box<dyn std::error::Error>> {
    let exchange = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(b"<policy-file-request/>\0").await?;
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await?;
        Ok::<_, std::io::Error>(reply)
    };

    let reply = tokio::time::timeout(timeout, exchange).await??;
    if reply.is_empty() {
        return Err("server closed the connection without a policy document".into());
    }
    Ok(reply)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
