use std::path::PathBuf;

use clap::Args;
use laborcast_core::observation::completed_observations;
use laborcast_core::DeliveryPredictor;

use super::{load_config, read_records};

#[derive(Args)]
pub struct FunnelArgs {
    /// JSON file with contraction records ("-" for stdin)
    pub input: PathBuf,
    /// Config file to use instead of the user config
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Prints `null` when there is not enough data to fit the envelope.
pub fn run(args: FunnelArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_ref())?;
    let records = read_records(&args.input)?;

    let observations = completed_observations(&records);
    let analysis = DeliveryPredictor::with_config(config).analyze(&observations);
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
