use std::path::PathBuf;

use clap::Args;
use laborcast_core::{DeliveryPredictor, LaborSummary, Prediction};
use serde::Serialize;

use super::{load_config, read_records};

#[derive(Args)]
pub struct PredictArgs {
    /// JSON file with contraction records ("-" for stdin)
    pub input: PathBuf,
    /// Config file to use instead of the user config
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Include averages, trend and reasoning
    #[arg(long)]
    pub summary: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PredictOutput {
    #[serde(flatten)]
    prediction: Prediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<LaborSummary>,
}

pub fn run(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_ref())?;
    let records = read_records(&args.input)?;

    let prediction = DeliveryPredictor::with_config(config).predict_records(&records);
    let summary = if args.summary {
        LaborSummary::from_records(&records, &prediction)
    } else {
        None
    };

    if args.json {
        let output = PredictOutput { prediction, summary };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match prediction.time {
        Some(time) => println!(
            "Predicted delivery: {} (confidence: {})",
            time.format("%Y-%m-%d %H:%M UTC"),
            prediction.confidence
        ),
        None => println!("No prediction yet (confidence: {})", prediction.confidence),
    }
    if args.summary {
        match summary {
            Some(s) => {
                println!("Average duration: {:.0}s", s.avg_duration_secs);
                println!("Average rest: {:.0}s", s.avg_interval_secs);
                println!("Trend: {:?}", s.trend);
                println!("{}", s.reasoning);
            }
            None => println!("Not enough completed contractions for a summary"),
        }
    }
    Ok(())
}
