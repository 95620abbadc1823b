//! SGOS proxy example
//!
//! Connects to an SGOS appliance, prints its identity, optionally applies a
//! configuration file (inline blocks included) and waits for a health check.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example sgos_proxy -- --host proxy1 --user admin --password secret
//! ```
//!
//! Apply a configuration file:
//! ```bash
//! cargo run --example sgos_proxy -- --host proxy1 --user admin --password secret \
//!     --enable-secret secret --config proxy.cfg
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use sgossh::driver::{DEFAULT_EOF_MARKER, parse_source};
use sgossh::{Condition, Directive, DriverBuilder, MatchMode, PollOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== sgossh SGOS Example ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = DriverBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .danger_disable_host_key_verification();

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }
    if let Some(secret) = &args.enable_secret {
        builder = builder.enable_secret(secret);
    }

    let mut driver = builder.build()?;
    driver.open().await?;
    println!("Connected at {}\n", driver.current_prompt()?);

    let info = driver.device_info().await?;
    println!("Version:  {}", info.version.as_deref().unwrap_or("unknown"));
    println!("Model:    {}", info.model.as_deref().unwrap_or("unknown"));
    println!("Hostname: {}\n", info.hostname.as_deref().unwrap_or("unknown"));

    if let Some(path) = &args.config {
        println!("--- Applying {} ---\n", path.display());
        let source = std::fs::read_to_string(path)?;
        let directives = parse_source(&source, DEFAULT_EOF_MARKER)?;

        let result = driver.apply_config(&directives).await?;
        for (request, response) in result.requests.iter().zip(&result.responses) {
            let first_line = request.command.lines().next().unwrap_or("");
            match &response.failure_message {
                Some(message) => println!("  FAIL {first_line}: {message}"),
                None => println!("  ok   {first_line}"),
            }
        }
        println!();
    }

    println!("--- Waiting for health checks ---\n");
    let conditions: Vec<Condition> = vec!["result[0] not contains Unhealthy".parse()?];
    let options = PollOptions {
        match_mode: MatchMode::All,
        retries: 5,
        interval: Duration::from_secs(2),
    };
    match driver
        .poll_until(&[Directive::new("show health-checks statistics")], &conditions, &options)
        .await
    {
        Ok(_) => println!("Health checks OK"),
        Err(e) => eprintln!("Health checks not ready: {e}"),
    }

    driver.close().await?;
    println!("\nDisconnected.");
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    enable_secret: Option<String>,
    config: Option<PathBuf>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Args {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            enable_secret: None,
            config: None,
            timeout: 30,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--enable-secret" | "-e" => parsed.enable_secret = value,
                "--config" | "-c" => parsed.config = value.map(PathBuf::from),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30)
                }
                "--help" => {
                    println!(
                        "Usage: sgos_proxy --host HOST --user USER (--password PASS | --key PATH) \
                         [--enable-secret SECRET] [--config FILE] [--port PORT] [--timeout SECS]"
                    );
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        parsed
    }
}
