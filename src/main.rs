use clap::Parser;
use feature_toggle::{Context, Snapshot, Toggle, ToggleError};
use serde_json::Value;
use tracing::Level;

/// Evaluate a feature configuration file and print the results as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file: a feature map, or {"options", "context", "features"}
    config: std::path::PathBuf,
    /// Default evaluation context (JSON object)
    #[arg(long)]
    context: Option<String>,
    /// Fail on unknown feature names
    #[arg(long)]
    strict: bool,
    /// Only evaluate these features (repeatable)
    #[arg(long = "feature")]
    features: Vec<String>,
    /// Log evaluation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<Snapshot, ToggleError> {
    let text = std::fs::read_to_string(&args.config)?;
    let doc: Value = serde_json::from_str(&text)?;
    let mut toggle = Toggle::from_document(&doc)?;

    if let Some(raw) = args.context.as_ref() {
        let ctx: Value = serde_json::from_str(raw)?;
        toggle.set_context(Context::try_from(ctx)?);
    }
    if args.strict {
        toggle.set_strict(true);
    }

    if args.features.is_empty() {
        return toggle.export_results();
    }
    let mut out = Snapshot::new();
    for name in &args.features {
        let active = toggle.is_active(name)?;
        out.insert(name.clone(), active);
    }
    Ok(out)
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match run(&args) {
        Ok(results) => match serde_json::to_string_pretty(&results) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
