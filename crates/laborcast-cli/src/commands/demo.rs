use chrono::{DateTime, Duration, Utc};
use clap::Args;
use laborcast_core::{ContractionRecord, DeliveryPredictor, LaborSummary};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;

#[derive(Args)]
pub struct DemoArgs {
    /// Number of contractions to generate
    #[arg(long, default_value = "24")]
    pub count: usize,
    /// RNG seed for a reproducible session
    #[arg(long)]
    pub seed: Option<u64>,
    /// Start time of the first contraction (RFC 3339); defaults to a
    /// session ending now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// Print the prediction instead of the records
    #[arg(long)]
    pub predict: bool,
}

/// Generate a session that starts sparse and irregular, then settles into
/// shorter gaps and longer contractions.
pub fn generate_session(
    rng: &mut Mcg128Xsl64,
    count: usize,
    start: Option<DateTime<Utc>>,
) -> Vec<ContractionRecord> {
    let sparse = count / 3;
    let mut offsets = Vec::with_capacity(count);
    let mut durations = Vec::with_capacity(count);
    let mut offset = 0i64;

    for i in 0..count {
        let progress = i as f64 / count.max(1) as f64;
        let duration = 30.0 + 40.0 * progress + rng.gen_range(-5.0..5.0);
        offsets.push(offset);
        durations.push(duration.round() as i64);

        let gap = if i < sparse {
            rng.gen_range(600..1200)
        } else {
            let settled = (330.0 - 180.0 * progress).max(150.0);
            (settled + rng.gen_range(-20.0..20.0)).round() as i64
        };
        offset += gap;
    }

    let first = start.unwrap_or_else(|| {
        let last_offset = offsets.last().copied().unwrap_or(0);
        Utc::now() - Duration::seconds(last_offset)
    });
    offsets
        .iter()
        .zip(&durations)
        .map(|(&o, &d)| {
            let s = first + Duration::seconds(o);
            ContractionRecord::new(s, Some(s + Duration::seconds(d)))
        })
        .collect()
}

pub fn run(args: DemoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = match args.seed {
        Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
        None => Mcg128Xsl64::from_entropy(),
    };
    let records = generate_session(&mut rng, args.count, args.start);
    tracing::debug!(count = records.len(), seed = ?args.seed, "generated demo session");

    if !args.predict {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let prediction = DeliveryPredictor::new().predict_records(&records);
    match prediction.time {
        Some(time) => println!(
            "Predicted delivery: {} (confidence: {})",
            time.format("%Y-%m-%d %H:%M UTC"),
            prediction.confidence
        ),
        None => println!("No prediction yet (confidence: {})", prediction.confidence),
    }
    if let Some(summary) = LaborSummary::from_records(&records, &prediction) {
        println!("{}", summary.reasoning);
    }
    Ok(())
}
