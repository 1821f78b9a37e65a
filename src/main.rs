use clap::{Parser, Subcommand};
use mdpages::parser::CmarkParser;
use mdpages::render::{LoggingReporter, SourceRenderer};
use mdpages::{config, convert, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mdpages")]
#[command(about = "Convert a tree of markdown files into generated page sources")]
#[command(long_about = "\
Convert a tree of markdown files into generated page sources

Every markdown file under the configured roots becomes one generated source
file holding a function that returns the page's HTML. Links between markdown
files are rewritten to the linked page's route.

Project structure:

  project/
  ├── mdpages.toml                 # Config (optional, see gen-config)
  ├── content/                     # Markdown root
  │   ├── index.md                 # → Index.rs, package pages, route /index
  │   └── guides/
  │       └── getting-started.md   # → guides/Getting_started.rs, package pages::guides
  └── target/generated/pages/      # Output directory

Each markdown file is parsed once per run, however many pages link to it.

Run 'mdpages gen-config' to generate a documented mdpages.toml.")]
#[command(version)]
struct Cli {
    /// Project directory holding mdpages.toml
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every markdown file into a generated page
    Convert {
        /// Print the run report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Parse every markdown file and report links that resolve to nothing
    Check,
    /// Print a stock mdpages.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Convert { json } => {
            let config = config::load_config(&cli.project)?;
            let parser = CmarkParser::new(config.features.clone());
            let report = convert::convert(
                &config,
                &cli.project,
                &parser,
                &SourceRenderer,
                &LoggingReporter,
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_convert_output(&report, &cli.project);
            }
        }
        Command::Check => {
            let config = config::load_config(&cli.project)?;
            let parser = CmarkParser::new(config.features.clone());
            let report = convert::check(&config, &cli.project, &parser)?;
            output::print_check_output(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "mdpages=warn",
        1 => "mdpages=info",
        2 => "mdpages=debug",
        _ => "mdpages=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
