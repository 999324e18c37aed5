use anyhow::{Context, Result};
use apartment_tracker::config::Settings;
use apartment_tracker::db::{count_listings, recent_listings, Database};
use apartment_tracker::logging;
use apartment_tracker::mailer::{BrevoMailer, HttpImageSource};
use apartment_tracker::pipeline::Pipeline;
use apartment_tracker::scheduler::Scheduler;
use apartment_tracker::scraper::{Extractor, Fetcher};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "apartment_tracker", about = "Watches a rental listings page for new apartments")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check now, then every TRACKER_INTERVAL_MINUTES (default)
    Run,
    /// Run a single check and exit
    Once,
    /// Send one test email to verify the Brevo credentials
    TestEmail,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1️⃣ Settings from TRACKER_* environment variables
    let settings = Settings::load()?;
    logging::init(&settings.log_path)
        .with_context(|| format!("opening log file {}", settings.log_path))?;
    info!(target_url = %settings.target_url, db = %settings.db_path, "Settings loaded");

    let mailer = BrevoMailer::new(
        settings.mailer_config(),
        HttpImageSource::new(settings.image_timeout())?,
    );

    if let Some(Commands::TestEmail) = cli.command {
        if let Err(e) = mailer.send_test() {
            error!("❌ Test email failed: {e}");
            return Err(e.into());
        }
        return Ok(());
    }

    // 2️⃣ Open the database, adding any columns older files are missing
    let db = Database::open(&settings.db_path)?;
    info!("Database {} holds {} listings", db.path(), count_listings(&db)?);
    if let Some(last) = recent_listings(&db, 1)?.first() {
        info!("Last new listing: {} (first seen {})", last.listing.title, last.first_seen);
    }

    // 3️⃣ Wire the pipeline
    let fetcher = Fetcher::new(settings.retry_policy(), settings.request_timeout())?;
    let extractor = Extractor::new(&settings.base_origin)?;

    let mailer_config = settings.mailer_config();
    if mailer_config.api_key.is_none() || mailer_config.sender_email.is_none() {
        warn!("Email credentials not configured; new listings will only be logged");
    }

    let mut pipeline = Pipeline::new(settings.target_url.clone(), fetcher, extractor, db)
        .with_notifier(Box::new(mailer));

    // 4️⃣ Run now, then every interval
    match cli.command {
        Some(Commands::Once) => {
            let new_listings = pipeline.run_cycle()?;
            info!("Check finished with {} new listings", new_listings.len());
            Ok(())
        }
        _ => Scheduler::new(settings.interval()).run(|| pipeline.run_cycle().map(|_| ())),
    }
}
