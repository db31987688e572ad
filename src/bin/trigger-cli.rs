use clap::{Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use trigger_launcher::package::PackageId;
use trigger_launcher::registration::{Registration, RegistrationClient};

#[derive(Parser)]
#[command(name = "trigger-cli")]
#[command(about = "Management CLI for a running trigger service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8088")]
    url: Url,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List triggers running for a party
    List {
        #[arg(short, long)]
        party: String,
    },
    /// Start a trigger for a party
    Add {
        #[arg(short, long)]
        party: String,
        /// Qualified trigger name, Module:entity
        #[arg(short, long)]
        trigger: String,
        #[arg(long)]
        package_id: String,
    },
    /// Show the status of a trigger
    Status { trigger_id: String },
    /// Stop a trigger
    Remove { trigger_id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = RegistrationClient::with_base_url(cli.url, Duration::from_secs(cli.timeout))?;

    match cli.command {
        Commands::List { party } => {
            let ids = client.list(&party).await?;
            if ids.is_empty() {
                println!("No triggers running for {}", party);
            }
            for id in ids {
                println!("{}", id);
            }
        }
        Commands::Add {
            party,
            trigger,
            package_id,
        } => {
            let registration = Registration::new(party, PackageId::new(package_id), trigger);
            let registered = client.register(&registration).await?;
            println!(
                "{}",
                registered.trigger_id.as_deref().unwrap_or("registered (no id returned)")
            );
        }
        Commands::Status { trigger_id } => {
            print_json(&client.status(&trigger_id).await?)?;
        }
        Commands::Remove { trigger_id } => {
            print_json(&client.stop(&trigger_id).await?)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
