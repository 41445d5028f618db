use clap::Parser;
use offer_core::{config::Config, AppCore, Outcome};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Score one customer against the configured datasets and print the table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Customer id, as it appears before the first '-' of the row key
    customer_id: String,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding train.csv and test.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Forest artifact (.json or .json.gz)
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(p) => Config::from_file(p)?,
        None => Config::default(),
    };
    if let Some(d) = args.data_dir {
        cfg.data_dir = d;
    }
    if let Some(m) = args.model {
        cfg.model_path = m;
    }

    let core = AppCore::load(cfg)?;
    match core.lookup(&args.customer_id)? {
        Outcome::NoData => println!("no data for customer {}", args.customer_id),
        Outcome::Found(p) => {
            print!("{}", p.table);
            println!(
                "\n{} sample(s), locate={}us predict={}us",
                p.n_samples(),
                p.locate_us,
                p.predict_us
            );
        }
    }
    Ok(())
}
