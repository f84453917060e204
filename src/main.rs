// src/main.rs
use clap::Parser;
use nosqli::{render_report, scan, ScanOptions};
use std::path::PathBuf;

/// NoSQL injection vulnerability scanner (AUTHORIZED USE ONLY)
#[derive(Parser)]
#[command(name = "nosqli")]
#[command(version)]
#[command(about = "Scans HTTP endpoints for MongoDB/Mongoose NoSQL injection", long_about = None)]
struct Cli {
    /// Target URL to scan
    #[arg(short, long)]
    target: Option<String>,

    /// Path to a raw HTTP request file to use as the seed request
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// Request body data (JSON or form-encoded)
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Proxy URL (falls back to the HTTP_PROXY environment variable)
    #[arg(long)]
    proxy: Option<String>,

    /// Custom User-Agent string
    #[arg(long)]
    user_agent: Option<String>,

    /// Rewrite http:// targets to https://
    #[arg(long)]
    require_https: bool,

    /// Disable TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Sleep injected by timing payloads, in milliseconds
    #[arg(long, default_value = "500")]
    sleep_ms: u64,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Confirm you are authorized to test the target
    #[arg(long)]
    confirm_authorized: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Probing injects live payloads; refuse to run without an explicit
    // acknowledgement of authorization.
    if !cli.confirm_authorized {
        eprintln!("This scanner sends attack payloads to the target.");
        eprintln!("Only test systems you own or have written permission to assess;");
        eprintln!("unauthorized testing is illegal.");
        eprintln!();
        eprintln!("Re-run with --confirm-authorized to acknowledge.");
        std::process::exit(1);
    }

    let options = ScanOptions {
        target: cli.target,
        request_file: cli.request,
        request_data: cli.data,
        proxy: cli.proxy,
        user_agent: cli.user_agent,
        require_https: cli.require_https,
        allow_insecure_certificates: cli.insecure,
        sleep_ms: cli.sleep_ms,
        timeout_secs: cli.timeout,
        ..Default::default()
    };

    if let Err(e) = options.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    println!(
        "Scan started at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    match scan(&options).await {
        Ok(findings) => match cli.output.as_str() {
            "json" => match serde_json::to_string_pretty(&findings) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Failed to serialize findings: {}", e);
                    std::process::exit(1);
                }
            },
            _ => print!("{}", render_report(&findings)),
        },
        Err(e) => {
            eprintln!("Scan failed: {}", e);
            std::process::exit(1);
        }
    }
}
