//! relato - offline-first municipal incident reporter
//!
//! Field-user front end over the `relato-core` submission pipeline:
//! - `submit` records a report (queued locally, delivered when possible)
//! - `queue` inspects or clears the pending queue
//! - `sync` manually drains the queue to the collector
//! - `status` shows configuration and queue state
//! - `locations` lists the location catalog
//! - `watch` probes connectivity and drains whenever it comes back
//!
//! Uses XDG Base Directory specification for file locations:
//! - Queue: $XDG_DATA_HOME/relato/queue.db (~/.local/share/relato/queue.db)
//! - Config: $XDG_CONFIG_HOME/relato/config.toml (~/.config/relato/config.toml)
//! - Catalog: $XDG_CONFIG_HOME/relato/catalog.toml
//! - Logs: $XDG_STATE_HOME/relato/ (~/.local/state/relato/)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use relato_core::{
    drain_on_reconnect, CollectorClient, Config, ConnectivitySignal, GpsFix, ImageTranscoder,
    LocationCatalog, PositionFeed, QueueStore, ReportDraft, SubmissionCoordinator,
    SubmissionOutcome, SyncEngine, SyncOutcome,
};

#[derive(Parser)]
#[command(name = "relato")]
#[command(about = "Record and deliver location-tagged incident reports")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a new incident report
    Submit(SubmitArgs),

    /// Inspect or clear the queue of pending reports
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Deliver pending reports to the collector now
    Sync,

    /// Show configuration and queue status
    Status,

    /// List the location catalog
    Locations {
        /// Show neighborhoods of this region
        #[arg(long)]
        region: Option<String>,

        /// Show streets of this neighborhood (requires --region)
        #[arg(long, requires = "region")]
        neighborhood: Option<String>,
    },

    /// Probe collector reachability and drain whenever it comes back
    Watch {
        /// Seconds between reachability probes
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
    },
}

#[derive(clap::Args)]
struct SubmitArgs {
    /// Occurrence date (defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Occurrence time (defaults to now)
    #[arg(long)]
    time: Option<String>,

    /// Region name
    #[arg(long)]
    region: String,

    /// Neighborhood name
    #[arg(long)]
    neighborhood: String,

    /// Street name
    #[arg(long)]
    street: String,

    /// Reference point near the incident
    #[arg(long)]
    reference: Option<String>,

    /// Free-text description
    #[arg(long)]
    note: Option<String>,

    /// Path to a photo to attach
    #[arg(long)]
    photo: Option<PathBuf>,

    /// GPS latitude of the incident
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// GPS longitude of the incident
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Declare the device offline; queue without attempting delivery
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum QueueCommand {
    /// List pending reports
    List {
        /// Emit the raw records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the number of pending reports
    Count,

    /// Drop every pending report (administrative)
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let _log_guard =
        relato_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::debug!("relato starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    match args.command {
        Command::Submit(submit) => runtime.block_on(cmd_submit(&config, submit)),
        Command::Queue { command } => match command {
            QueueCommand::List { json } => cmd_queue_list(json),
            QueueCommand::Count => cmd_queue_count(),
            QueueCommand::Clear => cmd_queue_clear(),
        },
        Command::Sync => runtime.block_on(cmd_sync(&config)),
        Command::Status => cmd_status(&config),
        Command::Locations {
            region,
            neighborhood,
        } => cmd_locations(region.as_deref(), neighborhood.as_deref()),
        Command::Watch { interval_secs } => runtime.block_on(cmd_watch(&config, interval_secs)),
    }
}

/// Open the queue at its XDG path
fn open_store() -> Result<Arc<QueueStore>> {
    let path = Config::queue_path();
    let store = QueueStore::open(&path)
        .with_context(|| format!("failed to open queue at {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn cmd_submit(config: &Config, args: SubmitArgs) -> Result<()> {
    // The picker analog: when a catalog is installed, the chosen location
    // must exist in it. Without one, locations pass through free-form.
    let catalog_path = Config::catalog_path();
    if catalog_path.exists() {
        let catalog = LocationCatalog::load(&catalog_path)?;
        if !catalog.contains(&args.region, &args.neighborhood, &args.street) {
            bail!(
                "location not in catalog: {} / {} / {} (see 'relato locations')",
                args.region,
                args.neighborhood,
                args.street
            );
        }
    }

    let photo = match &args.photo {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("failed to read photo {}", path.display()))?,
        ),
        None => None,
    };

    let now = chrono::Local::now();
    let draft = ReportDraft {
        user_date: args
            .date
            .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
        user_time: args.time.unwrap_or_else(|| now.format("%H:%M").to_string()),
        region: args.region,
        neighborhood: args.neighborhood,
        street: args.street,
        reference: args.reference,
        note: args.note,
        photo,
    };

    let store = open_store()?;
    let engine = CollectorClient::from_config(&config.collector)?
        .map(|client| Arc::new(SyncEngine::new(store.clone(), Box::new(client))));

    let connectivity = ConnectivitySignal::new(!args.offline);
    let position = PositionFeed::new();
    if let (Some(latitude), Some(longitude)) = (args.latitude, args.longitude) {
        position.update(GpsFix {
            latitude,
            longitude,
        });
    }

    let coordinator = SubmissionCoordinator::new(
        store,
        engine,
        ImageTranscoder::new(&config.image),
        connectivity.subscribe(),
        position.subscribe(),
    );

    let outcome = coordinator
        .submit(draft)
        .await
        .context("report rejected")?;

    match &outcome {
        SubmissionOutcome::Delivered { id } => {
            println!("Report {} delivered to the collector.", short_id(id));
        }
        SubmissionOutcome::Pending { id } => {
            println!("Report {} queued.", short_id(id));
            if args.offline {
                println!("Device is offline; run 'relato sync' once connected.");
            } else if !config.collector.is_ready() {
                println!("No collector endpoint configured; the report waits locally.");
            } else {
                println!("Delivery failed; the report stays queued for the next sync.");
            }
        }
    }

    println!("{} report(s) pending.", coordinator.pending_count()?);
    Ok(())
}

fn cmd_queue_list(json: bool) -> Result<()> {
    let store = open_store()?;
    let records = store.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No pending reports.");
        return Ok(());
    }

    println!(
        "{:<10} {:<17} {:<42} {:<6}",
        "Id", "Created", "Location", "Photo"
    );
    println!("{:-<77}", "");

    for record in &records {
        println!(
            "{:<10} {:<17} {:<42} {:<6}",
            short_id(&record.id),
            record.created_at.format("%Y-%m-%d %H:%M"),
            format!(
                "{} / {} / {}",
                record.region, record.neighborhood, record.street
            ),
            if record.image_data.is_some() {
                "yes"
            } else {
                "no"
            }
        );
    }

    println!();
    println!("{} report(s) pending.", records.len());
    Ok(())
}

fn cmd_queue_count() -> Result<()> {
    let store = open_store()?;
    println!("{}", store.len()?);
    Ok(())
}

fn cmd_queue_clear() -> Result<()> {
    let store = open_store()?;
    let dropped = store.len()?;
    store.clear()?;
    println!("Dropped {} pending report(s).", dropped);
    Ok(())
}

async fn cmd_sync(config: &Config) -> Result<()> {
    let store = open_store()?;

    let Some(client) = CollectorClient::from_config(&config.collector)? else {
        println!("No collector endpoint configured. Set it in config.toml:");
        println!();
        println!("  [collector]");
        println!("  endpoint_url = \"https://reports.example.org/ingest\"");
        println!();
        println!("{} report(s) waiting locally.", store.len()?);
        return Ok(());
    };

    let engine = SyncEngine::new(store, Box::new(client));

    match engine.drain().await? {
        SyncOutcome::Empty => println!("Nothing to send."),
        SyncOutcome::Drained { delivered } => {
            println!("Delivered {} report(s). Queue is empty.", delivered);
        }
        SyncOutcome::Stopped {
            delivered,
            remaining,
        } => {
            println!(
                "Delivered {} report(s); stopped at a failure with {} still queued.",
                delivered, remaining
            );
            println!("Run 'relato sync' again once the collector is reachable.");
        }
    }

    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("relato status");
    println!("=============");
    println!();

    let collector = &config.collector;
    println!(
        "Collector:   {}",
        collector.endpoint_url.as_deref().unwrap_or("<not set>")
    );
    println!("Timeout:     {}s", collector.timeout_secs);
    if !collector.is_ready() {
        println!();
        println!("Collector is not configured; reports accumulate locally.");
        println!("Set collector.endpoint_url in {:?}", Config::config_path());
    }

    println!();
    println!("Image:       max width {}px", config.image.max_width);
    println!("Quality:     {:.2}", config.image.quality);

    let catalog_path = Config::catalog_path();
    println!();
    println!(
        "Catalog:     {} ({})",
        catalog_path.display(),
        if catalog_path.exists() {
            "installed"
        } else {
            "not installed"
        }
    );

    let queue_path = Config::queue_path();
    let store = open_store()?;
    println!("Queue:       {}", queue_path.display());
    println!("Pending:     {} report(s)", store.len()?);
    println!("Logs:        {}", Config::state_dir().display());

    Ok(())
}

fn cmd_locations(region: Option<&str>, neighborhood: Option<&str>) -> Result<()> {
    let catalog_path = Config::catalog_path();
    if !catalog_path.exists() {
        println!("No location catalog installed at {}", catalog_path.display());
        println!("Locations are accepted free-form until one is installed.");
        return Ok(());
    }

    let catalog = LocationCatalog::load(&catalog_path)?;

    match (region, neighborhood) {
        (None, _) => {
            println!("Regions:");
            for region in catalog.regions() {
                println!("  {}", region.name);
            }
        }
        (Some(region), None) => {
            let Some(neighborhoods) = catalog.neighborhoods(region) else {
                bail!("unknown region: {}", region);
            };
            println!("Neighborhoods of {}:", region);
            for neighborhood in neighborhoods {
                println!("  {}", neighborhood.name);
            }
        }
        (Some(region), Some(neighborhood)) => {
            let Some(streets) = catalog.streets(region, neighborhood) else {
                bail!("unknown neighborhood: {} / {}", region, neighborhood);
            };
            println!("Streets of {} / {}:", region, neighborhood);
            for street in streets {
                println!("  {}", street);
            }
        }
    }

    Ok(())
}

async fn cmd_watch(config: &Config, interval_secs: u64) -> Result<()> {
    let Some(client) = CollectorClient::from_config(&config.collector)? else {
        println!("No collector endpoint configured; nothing to watch.");
        println!("Set collector.endpoint_url in {:?}", Config::config_path());
        return Ok(());
    };

    let store = open_store()?;
    let probe = client.clone();
    let engine = Arc::new(SyncEngine::new(store.clone(), Box::new(client)));

    // The core never polls; this loop is the external connectivity source,
    // feeding probe results into the signal the drainer subscribes to.
    let signal = ConnectivitySignal::new(false);
    let drainer = tokio::spawn(drain_on_reconnect(engine, signal.subscribe()));

    println!(
        "Watching {} every {}s; {} report(s) pending. Ctrl-C to stop.",
        probe.endpoint_url(),
        interval_secs,
        store.len()?
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let online = probe.reachable().await;
                if online != signal.is_online() {
                    println!(
                        "Collector is {}.",
                        if online { "reachable" } else { "unreachable" }
                    );
                }
                signal.set_online(online);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Dropping the signal ends the drainer's subscription
    drop(signal);
    drainer.await.context("drain task failed")?;

    println!("Stopped. {} report(s) still pending.", store.len()?);
    Ok(())
}

/// First eight characters of a report id, enough to tell records apart
fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}
