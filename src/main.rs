// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use diamond_price::{
    bootstrap, startup, ArtifactError, BootstrapReport, Clarity, Color, Config, Cut, DiamondInput,
    DiamondRecord, NumericField, PriceEstimator, Store,
};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Diamond Price Estimator
#[derive(Parser)]
#[command(name = "diamond-price")]
#[command(about = "Estimate diamond prices with a trained model and keep a history in SQLite")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database file [env: DIAMOND_DB_PATH]
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Seed CSV loaded when the database is first created [env: DIAMOND_SEED_PATH]
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Model artifact [env: DIAMOND_MODEL_PATH]
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Feature list artifact [env: DIAMOND_FEATURES_PATH]
    #[arg(long, global = true)]
    features: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal form (default)
    Ui,

    /// Create the database and load seed data if it is new
    Init,

    /// Estimate one diamond, store it, and show recent predictions
    Predict(PredictArgs),

    /// Show stored records
    History {
        /// Only the most recent N records
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Omitted attributes take the form defaults
#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    carat: Option<f64>,
    #[arg(long)]
    depth: Option<f64>,
    #[arg(long)]
    table: Option<f64>,
    #[arg(long)]
    x: Option<f64>,
    #[arg(long)]
    y: Option<f64>,
    #[arg(long)]
    z: Option<f64>,
    /// Fair, Good, "Very Good", Premium, Ideal
    #[arg(long)]
    cut: Option<Cut>,
    /// D through J
    #[arg(long)]
    color: Option<Color>,
    /// I1, SI2, SI1, VS2, VS1, VVS2, VVS1, IF
    #[arg(long)]
    clarity: Option<Clarity>,
}

impl PredictArgs {
    fn to_input(&self) -> Result<DiamondInput> {
        let mut input = DiamondInput::default();

        let numerics = [
            (NumericField::Carat, self.carat),
            (NumericField::Depth, self.depth),
            (NumericField::Table, self.table),
            (NumericField::X, self.x),
            (NumericField::Y, self.y),
            (NumericField::Z, self.z),
        ];
        for (field, value) in numerics {
            if let Some(value) = value {
                input.set_numeric(field, field.check(value)?);
            }
        }

        if let Some(cut) = self.cut {
            input.cut = cut;
        }
        if let Some(color) = self.color {
            input.color = color;
        }
        if let Some(clarity) = self.clarity {
            input.clarity = clarity;
        }

        Ok(input)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    if let Some(seed) = cli.seed.clone() {
        config.seed_path = seed;
    }
    if let Some(model) = cli.model.clone() {
        config.model_path = model;
    }
    if let Some(features) = cli.features.clone() {
        config.features_path = features;
    }

    match cli.command.unwrap_or(Commands::Ui) {
        Commands::Ui => {
            // The terminal belongs to the form, so logs go to a file
            init_tracing(cli.verbose, Some(config.log_path()))?;
            run_ui_mode(&config)?;
        }
        Commands::Init => {
            init_tracing(cli.verbose, None)?;
            run_init(&config)?;
        }
        Commands::Predict(args) => {
            init_tracing(cli.verbose, None)?;
            run_predict(&config, &args)?;
        }
        Commands::History { limit } => {
            init_tracing(cli.verbose, None)?;
            run_history(&config, limit)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

/// Load the model and open the store, or report why not and halt.
fn start_or_exit(config: &Config) -> (PriceEstimator, BootstrapReport) {
    match startup(config) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            if e.downcast_ref::<ArtifactError>().is_some() {
                eprintln!(
                    "   Model files ({} and {}) are required.",
                    config.model_path.display(),
                    config.features_path.display()
                );
                eprintln!("   Place them in the working directory or set DIAMOND_MODEL_PATH / DIAMOND_FEATURES_PATH.");
            }
            std::process::exit(1);
        }
    }
}

fn print_seed_notice(report: &BootstrapReport) {
    if let Some(notice) = report.seed.notice() {
        println!("ℹ️  {}", notice);
    }
}

fn run_init(config: &Config) -> Result<()> {
    println!("🗄️  Diamond store - {}", config.db_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let report = bootstrap(&config.db_path, &config.seed_path)?;
    println!("✓ Schema: {:?}", report.schema);
    print_seed_notice(&report);

    let count = Store::new(&config.db_path).count()?;
    println!("✓ Database contains {} diamonds", count);

    Ok(())
}

fn run_predict(config: &Config, args: &PredictArgs) -> Result<()> {
    let input = args.to_input()?;

    let (estimator, report) = start_or_exit(config);
    print_seed_notice(&report);

    let prediction = estimator.submit(input)?;

    println!("💎 Estimated Price: ${}", format_price(prediction.record.price));
    println!("✓ Prediction saved to database (id {})", prediction.record.id.unwrap_or_default());
    println!("\nRecent Diamond Predictions");
    print_records(&prediction.recent);

    Ok(())
}

fn run_history(config: &Config, limit: Option<usize>) -> Result<()> {
    let report = bootstrap(&config.db_path, &config.seed_path)?;
    print_seed_notice(&report);

    let store = Store::new(&config.db_path);
    let records = match limit {
        Some(limit) => store.load_recent(limit)?,
        None => store.load_all()?,
    };

    print_records(&records);

    Ok(())
}

fn print_records(records: &[DiamondRecord]) {
    if records.is_empty() {
        println!("No data in the database yet.");
        return;
    }

    println!(
        "{:>6} {:>6} {:<10} {:<5} {:<7} {:>6} {:>6} {:>11} {:>6} {:>6} {:>6}",
        "id", "carat", "cut", "color", "clarity", "depth", "table", "price", "x", "y", "z"
    );
    for record in records {
        let input = &record.input;
        println!(
            "{:>6} {:>6.2} {:<10} {:<5} {:<7} {:>6.1} {:>6.1} {:>11} {:>6.2} {:>6.2} {:>6.2}",
            record.id.unwrap_or_default(),
            input.carat,
            input.cut,
            input.color,
            input.clarity,
            input.depth,
            input.table,
            format_price(record.price),
            input.x,
            input.y,
            input.z,
        );
    }
}

/// `1234567.891` -> `1,234,567.89`
pub(crate) fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Diamond Price Predictor...\n");

    let (estimator, report) = start_or_exit(config);

    let recent = estimator.recent()?;
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(&estimator, recent, report.seed.notice());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: diamond-price predict --carat 0.5 --cut Ideal ...");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(0.0), "0.00");
        assert_eq!(format_price(326.0), "326.00");
        assert_eq!(format_price(1234.5), "1,234.50");
        assert_eq!(format_price(1234567.891), "1,234,567.89");
        assert_eq!(format_price(-45.999), "-46.00");
    }

    #[test]
    fn test_predict_args_fill_defaults_and_check_ranges() {
        let cli = Cli::parse_from([
            "diamond-price", "predict", "--carat", "1.2", "--cut", "Very Good", "--clarity", "VS1",
        ]);
        let Some(Commands::Predict(args)) = cli.command else {
            panic!("expected predict subcommand");
        };

        let input = args.to_input().unwrap();
        assert_eq!(input.carat, 1.2);
        assert_eq!(input.cut, Cut::VeryGood);
        assert_eq!(input.clarity, Clarity::VS1);
        assert_eq!(input.depth, 61.5);

        let cli = Cli::parse_from(["diamond-price", "predict", "--table", "80"]);
        let Some(Commands::Predict(args)) = cli.command else {
            panic!("expected predict subcommand");
        };
        assert!(args.to_input().is_err());
    }

    #[test]
    fn test_unknown_grade_fails_to_parse() {
        let result = Cli::try_parse_from(["diamond-price", "predict", "--color", "Z"]);

        assert!(result.is_err());
    }
}
