use anyhow::Context;
use clap::{Parser, Subcommand};

use shelf_kernel::settings::Settings;
use shelf_store::RecordStore;

#[derive(Parser)]
#[command(name = "shelf", about = "SHELF book management service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Print the sample catalog as it would be loaded into a fresh store.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry);

    match cli.command {
        Command::Serve => shelf_app::run(settings).await,
        Command::Seed => seed(),
    }
}

/// Load the sample catalog into a fresh store and report what was inserted.
/// The served application seeds itself at startup when `store.seed` is set;
/// this command exists to inspect the catalog without starting a server.
fn seed() -> anyhow::Result<()> {
    let store = RecordStore::new();
    for book in shelf_app::modules::books::sample_catalog() {
        let record = store.insert(book)?;
        println!(
            "{}: {} by {} ({})",
            record.id, record.title, record.author, record.publication_year
        );
    }
    println!("seeded {} books", store.len()?);
    Ok(())
}
