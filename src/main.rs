// src/main.rs

//! mihari: keyword site monitor CLI.
//!
//! One invocation performs one full sweep; an external scheduler (cron,
//! CI workflow) drives the cadence. Per-site failures are handled inside
//! the run, so a nonzero exit only means an unrecoverable startup error
//! or a broken store.

use clap::Parser;

use mihari::config::{HttpConfig, MailConfig, RunMode};
use mihari::error::Result;
use mihari::models::Sites;
use mihari::notify::{Notifier, NullNotifier, SmtpNotifier};
use mihari::pipeline::run_monitor;
use mihari::store::SeenStore;

#[derive(Parser, Debug)]
#[command(
    name = "mihari",
    version,
    about = "Watches configured web sites for new or updated articles and emails alerts"
)]
struct Cli {
    /// Site rules file
    #[arg(long, default_value = "data/sites.toml")]
    sites: String,

    /// Seen-item database path
    #[arg(long, default_value = "data/seen.db")]
    db: String,

    /// Record items but never send mail
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let sites = Sites::load_or_default(&cli.sites);
    sites.validate()?;

    let http = HttpConfig::default();
    http.validate()?;

    let mail = MailConfig::from_env()?;
    let run_mode = RunMode::from_env();

    let store = SeenStore::open(&cli.db)?;

    let notifier: Box<dyn Notifier> = if cli.dry_run {
        log::info!("Dry run: notifications disabled");
        Box::new(NullNotifier)
    } else {
        match SmtpNotifier::from_config(&mail)? {
            Some(smtp) => Box::new(smtp),
            None => {
                log::warn!("SMTP credentials not set; notifications disabled");
                Box::new(NullNotifier)
            }
        }
    };

    run_monitor(&http, run_mode, &sites.sites, &store, notifier.as_ref()).await?;
    Ok(())
}
