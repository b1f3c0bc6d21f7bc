use clap::{Parser, Subcommand};
use simple_sitemap::{config, generate, output};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simple-sitemap")]
#[command(about = "Sitemap and sitemap index generator")]
#[command(long_about = "\
Sitemap and sitemap index generator

Reads page URLs as JSON Lines and writes sitemaps.org XML sitemaps, splitting
into numbered files when a file reaches its entry limit, plus a sitemap index
listing the files written.

Input (one JSON object per line):

  {\"loc\": \"https://example.com/\", \"priority\": 1.0}
  {\"loc\": \"https://example.com/about\", \"last_modified\": \"2024-03-01\"}
  {\"route\": \"posts/view\", \"params\": {\"id\": \"7\"}}

Output:

  sitemap/
  ├── sitemap.xml
  ├── sitemap-2.xml
  └── sitemap_index.xml

Run 'simple-sitemap gen-config' to generate a documented sitemap.toml.
Set RUST_LOG=debug for detailed logs.")]
#[command(version)]
struct Cli {
    /// Directory containing sitemap.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Output directory (overrides output_dir from the config)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write sitemaps from a JSON Lines entry list, then the index
    Build {
        /// JSON Lines file with one URL entry per line
        #[arg(long)]
        input: PathBuf,
    },
    /// Write the sitemap index over every sitemap file in the output directory
    Index,
    /// Print a stock sitemap.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging("warn");
    let cli = Cli::parse();

    match cli.command {
        Command::Build { input } => {
            let site_config = config::load_config(&cli.config_dir)?;
            let output_dir = resolve_output_dir(cli.output, &site_config);
            println!("==> Building sitemaps from {}", input.display());
            let report = generate::generate(&input, &site_config, &output_dir)?;
            output::print_generate_output(&report, &output_dir);
        }
        Command::Index => {
            let site_config = config::load_config(&cli.config_dir)?;
            let output_dir = resolve_output_dir(cli.output, &site_config);
            let (index_path, count) = generate::generate_index(&site_config, &output_dir)?;
            output::print_index_output(&index_path, count, &output_dir);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the tracing subscriber, honoring `RUST_LOG` over `default_filter`.
fn setup_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The `--output` flag wins over the configured directory.
fn resolve_output_dir(cli_output: Option<PathBuf>, site_config: &config::SitemapConfig) -> PathBuf {
    cli_output.unwrap_or_else(|| PathBuf::from(&site_config.output_dir))
}
