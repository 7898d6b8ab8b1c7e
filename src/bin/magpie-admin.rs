use anyhow::Result;
use clap::{Parser, Subcommand};
use magpie::config::Config;
use magpie::store::{format_sequential_uuid, CounterStore, LinkStore, TallyStore};

#[derive(Parser)]
#[command(name = "magpie-admin")]
#[command(about = "Magpie snapshot inspection CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the persisted state
    Status,
    /// List all short link mappings
    Links,
    /// Show the top countries by request count
    Leaderboard {
        /// Number of entries to show
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Status => {
            let counter = CounterStore::load(&config.snapshots.counter_file).await?;
            let links = LinkStore::load(&config.snapshots.links_file).await?;
            let tally = TallyStore::load(&config.snapshots.tally_file).await?;

            let next = counter.current().await;
            println!(
                "Next sequence value: {next} ({})",
                format_sequential_uuid(next)
            );
            println!("Short links:         {}", links.len().await);
            println!(
                "Country tally:       {} labels, {} requests",
                tally.len().await,
                tally.total().await
            );
        }
        Commands::Links => {
            let links = LinkStore::load(&config.snapshots.links_file).await?;
            let entries = links.entries().await;
            if entries.is_empty() {
                println!("No short links recorded.");
            } else {
                println!("{:<24} URL", "Short path");
                println!("{}", "-".repeat(72));
                for (short_path, url) in entries {
                    println!("{short_path:<24} {url}");
                }
            }
        }
        Commands::Leaderboard { top } => {
            let tally = TallyStore::load(&config.snapshots.tally_file).await?;
            let entries = tally.top_n(top).await;
            if entries.is_empty() {
                println!("No requests tallied yet.");
            } else {
                println!("{:<24} Count", "Country");
                println!("{}", "-".repeat(32));
                for (country, count) in entries {
                    println!("{country:<24} {count}");
                }
            }
        }
    }

    Ok(())
}
