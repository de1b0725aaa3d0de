use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listcraft_core::{RewriteMode, TemplateRewriter, read_first_worksheet};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod formatter;

#[derive(Parser)]
#[command(name = "listcraft-cli")]
#[command(about = "CLI tools for listing templates", long_about = None)]
#[command(version)]
struct Cli {
    /// Placeholder expected in template formulas
    #[arg(long, global = true, default_value = "ZDX")]
    sentinel: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the placeholder with a barcode prefix
    Rewrite {
        /// Path to the template workbook
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Barcode prefix to substitute
        #[arg(short, long)]
        prefix: String,

        /// Brand name for column C (listing templates only)
        #[arg(short, long)]
        brand: Option<String>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the formula cells a rewrite would look at
    Inspect {
        /// Path to the template workbook
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let rewriter = TemplateRewriter::with_sentinel(cli.sentinel);

    match cli.command {
        Command::Rewrite {
            file,
            prefix,
            brand,
            output,
            dry_run,
        } => {
            let template = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mode = match brand {
                Some(brand_name) => RewriteMode::ListingTemplate { brand_name },
                None => RewriteMode::StockUpdate,
            };
            debug!(file = %file.display(), mode = mode.name(), size = template.len(), "template read");

            if dry_run {
                let plan = rewriter
                    .plan(&template, &mode, &prefix)
                    .with_context(|| "Failed to plan rewrite")?;
                formatter::print_plan(&file, &mode, &plan);
                println!("\nOutput would be: {}", output.display());
            } else {
                println!("Rewriting '{}'...", file.display());
                let bytes = rewriter
                    .rewrite(&template, &mode, &prefix)
                    .with_context(|| "Failed to rewrite template")?;
                std::fs::write(&output, bytes)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                formatter::print_written(&output);
            }
        }
        Command::Inspect { file } => {
            let template = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let sheet = read_first_worksheet(&template)
                .with_context(|| format!("Failed to read worksheet of {}", file.display()))?;
            formatter::print_sheet(&file, &sheet, rewriter.sentinel());
        }
    }

    Ok(())
}
