use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use latency_balancer::admin::handlers::{BackendStatus, SystemStatus};

#[derive(Parser)]
#[command(name = "lb-cli")]
#[command(about = "Diagnostics CLI for the latency balancer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, env = "LB_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balancer status
    Status,
    /// List backends with their latest samples
    Backends,
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
            let status: SystemStatus = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("version:   {}", status.version);
            println!("status:    {}", status.status);
            println!("backends:  {}/{} available", status.available_backends, status.backends);
            println!("uptime:    {}s", status.uptime_secs);
        }
        Commands::Backends => {
            let backends: Vec<BackendStatus> = client
                .get(format!("{}/admin/backends", cli.url))
                .headers(headers)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{:<2} {:<32} {:<12} {:>16} {:>10}", "", "ADDRESS", "STATE", "SAMPLE_NS", "AGE_MS");
            for b in backends {
                println!(
                    "{:<2} {:<32} {:<12} {:>16} {:>10}",
                    if b.selected { "*" } else { "" },
                    b.address,
                    b.state,
                    b.sample_ns.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                    b.last_updated_ms_ago.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                );
            }
        }
    }

    Ok(())
}
