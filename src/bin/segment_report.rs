use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hydroviz_segment_client::config::Config;
use hydroviz_segment_client::controller::{SegmentDataController, SegmentState};
use hydroviz_segment_client::stats_fetcher::StatsFetcher;

#[derive(Parser)]
#[command(name = "segment-report")]
#[command(about = "Fetch streamflow statistics for a stream segment or watershed", long_about = None)]
struct Cli {
    /// Native segment id to fetch statistics for
    #[arg(long, conflicts_with = "huc_id")]
    segment_id: Option<String>,

    /// HUC-8 watershed id; its outlet segment is resolved first
    #[arg(long)]
    huc_id: Option<String>,

    /// Use bundled fixture payloads instead of the network
    #[arg(long)]
    fixtures: bool,

    /// Use the earlier combined single-endpoint API variant
    #[arg(long, conflicts_with = "huc_id")]
    combined: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hydroviz_segment_client=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if cli.fixtures {
        config.static_fixtures = true;
    }
    info!("Using hydrology API at {}", config.api_base_url);

    if cli.combined {
        let segment_id = cli
            .segment_id
            .as_deref()
            .ok_or("--combined requires --segment-id")?;
        let fetcher = StatsFetcher::new(config.api_base_url.clone());
        let stats = fetcher.fetch_combined(segment_id).await?;
        println!("Statistics for segment {} (combined endpoint):", segment_id);
        print_keys("stats", &stats);
        return Ok(());
    }

    let controller = SegmentDataController::new(config);

    // Echo the slow-API advisory the way a UI would surface it.
    let mut rx = controller.subscribe();
    let advisory = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if rx.borrow().is_slow {
                eprintln!("(the hydrology API is responding slowly, still waiting...)");
            }
        }
    });

    match (&cli.segment_id, &cli.huc_id) {
        (Some(segment_id), _) => {
            controller.set_segment(segment_id.clone(), None);
            controller.fetch_statistics().await;
        }
        (None, Some(huc_id)) => {
            controller.set_huc(huc_id.clone());
            controller.resolve_outlet_from_huc().await;
        }
        (None, None) => {
            return Err("provide --segment-id or --huc-id".into());
        }
    }

    advisory.abort();
    print_state(&controller.state());
    Ok(())
}

fn print_state(state: &SegmentState) {
    if let Some(segment_id) = &state.segment_id {
        println!("Segment: {}", segment_id);
    }
    if let Some(huc_id) = &state.huc_id {
        println!("HUC:     {}", huc_id);
    }

    if state.has_failed {
        println!("Fetch failed; no data available.");
        return;
    }

    match (&state.statistics, &state.hydrograph) {
        (Some(stats), Some(hydrograph)) => {
            print_keys("statistics indices", stats);
            print_keys("hydrograph models", hydrograph);
        }
        _ => println!("No data returned."),
    }
}

fn print_keys(label: &str, value: &serde_json::Value) {
    match value.as_object() {
        Some(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            println!("{} ({}): {}", label, keys.len(), keys.join(", "));
        }
        None => println!("{}: <non-object payload>", label),
    }
}
