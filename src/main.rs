use clap::Parser;
use edison::core::config::{self, CliOverrides, EdisonConfig};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edison", about = "Section and route navigation driver")]
struct Args {
    /// Config file (defaults to ~/.edison/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Id of the element routes render into
    #[arg(long)]
    container: Option<String>,

    /// Directory holding rtpl_<id> template files
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Path to navigate to once routes start
    #[arg(short, long)]
    start: Option<String>,

    /// Turn off per-event debug tracing
    #[arg(short, long)]
    quiet: bool,

    /// Where to write the log
    #[arg(long, default_value = "edison.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to edison.log in current directory by default
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if args.quiet {
        LevelFilter::Info
    } else {
        LevelFilter::Debug
    };
    if let Ok(log_file) = File::create(&args.log_file) {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    let loaded = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let file_config = loaded.unwrap_or_else(|e| {
        log::warn!("{}, using defaults", e);
        eprintln!("edison: {e}, using defaults");
        EdisonConfig::default()
    });

    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            route_container: args.container,
            template_dir: args.templates,
            start_path: args.start,
            quiet: args.quiet,
        },
    );
    log::info!(
        "Edison starting up: container={:?}, {} section(s)",
        resolved.route_container,
        resolved.sections.len()
    );

    edison::shell::run(resolved).await
}
