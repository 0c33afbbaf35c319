use std::path::PathBuf;

use clap::Args;
use jiff::Zoned;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use waymark_distance::{
    config::EngineConfig, distance_calculation_service::CalculationOptions,
    transportation_mode::TransportationMode,
};

use crate::{
    input::{read_interest_points, read_properties},
    report::{print_batch, print_cache_stats},
};

#[derive(Args)]
pub struct ComputeArgs {
    /// JSON array of interest points
    #[arg(short, long)]
    interest_points: PathBuf,

    /// JSON array of properties ({ property_id, coordinates })
    #[arg(short, long)]
    properties: PathBuf,

    /// Use this mode for every interest point instead of its default
    #[arg(short, long)]
    mode: Option<TransportationMode>,

    /// Predict the commute for next Friday at 09:00 local time
    #[arg(long)]
    friday_morning: bool,

    /// Overrides WAYMARK_MAX_CONCURRENT_REQUESTS
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Print the results as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Print cache statistics after the run
    #[arg(long)]
    cache_stats: bool,
}

pub async fn run(args: ComputeArgs) -> Result<(), anyhow::Error> {
    let interest_points = read_interest_points(&args.interest_points)?;
    let properties = read_properties(&args.properties)?;
    info!(
        "Computing distances for {} properties against {} interest points",
        properties.len(),
        interest_points.len()
    );

    let mut config = EngineConfig::from_env()?;
    if let Some(max_concurrent) = args.max_concurrent {
        config.max_concurrent_requests = max_concurrent;
    }
    let service = config.build_service()?;

    let mut options = if args.friday_morning {
        CalculationOptions::friday_morning(Zoned::now().date())?
    } else {
        CalculationOptions::default()
    };
    options.mode_override = args.mode;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for in-flight requests");
            on_interrupt.cancel();
        }
    });

    let batch = service
        .compute_for_batch_with(&properties, &interest_points, &options, &cancel)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        print_batch(&batch);
    }

    if args.cache_stats {
        print_cache_stats(&service.cache_stats());
    }

    Ok(())
}
