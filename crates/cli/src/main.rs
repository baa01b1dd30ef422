mod echo;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use folio_core::{ConversionReport, ConvertConfig, Converter, FolioError, ValidationReport};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use echo::{
    print_banner, print_capped, print_error, print_field, print_heading, print_info, print_step, print_success,
    print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert an HTML documentation tree to Markdown with deduplicated images
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author = "Folio Contributors")]
#[command(version)]
#[command(about = "Convert HTML documentation trees to Markdown", long_about = None)]
struct Args {
    /// Root directory of the HTML documentation
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    /// Directory to write the Markdown tree to
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Canonical image directory (default: <OUTPUT>/../../static/img/<PROJECT>)
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,

    /// Project name used in image URLs (default: input directory name, lowercased)
    #[arg(short, long, value_name = "NAME")]
    project: Option<String>,

    /// Validate the generated tree and exit non-zero on errors
    #[arg(long)]
    validate: bool,

    /// Write into an existing, non-empty output directory
    #[arg(long)]
    force: bool,

    /// Include TOML frontmatter in every document
    #[arg(long)]
    frontmatter: bool,

    /// Do not copy non-HTML, non-image files
    #[arg(long)]
    no_assets: bool,

    /// Keep images in the canonical directory that this run did not use
    #[arg(long)]
    keep_unreferenced: bool,

    /// Print the conversion report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> ConvertConfig {
        let mut builder = ConvertConfig::builder()
            .input_dir(&self.input)
            .output_dir(&self.output)
            .frontmatter(self.frontmatter)
            .copy_assets(!self.no_assets)
            .remove_unreferenced(!self.keep_unreferenced)
            .overwrite(self.force);

        if let Some(dir) = &self.static_dir {
            builder = builder.static_dir(dir);
        }
        if let Some(project) = &self.project {
            builder = builder.project_name(project);
        }
        builder.build()
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_summary(report: &ConversionReport, max_reported: usize) {
    print_heading("Conversion Summary");
    print_field("Project", &report.project_name);
    print_field(
        "Documents",
        format!("{} of {} converted", report.documents_converted, report.documents_found),
    );
    if report.documents_failed > 0 {
        print_field("Failed", report.documents_failed.to_string().red());
    }
    print_field(
        "Images",
        format!(
            "{} references, {} unique, {} duplicates removed ({})",
            report.images.total_references,
            report.images.unique_images,
            report.images.duplicates_removed,
            report.images.ratio
        ),
    );
    print_field("Image links updated", report.images_rewritten);
    if report.unresolved_image_links > 0 {
        print_field("Unresolved image links", report.unresolved_image_links);
    }
    print_field("Assets copied", report.assets_copied);
    print_field("Stale images removed", report.images_removed);
    print_field("Empty directories removed", report.directories_removed);

    if !report.errors.is_empty() {
        eprintln!("\n{} {}", report.errors.len().to_string().red(), "errors:".red());
        print_capped(&report.errors, max_reported, print_error);
    }
    if !report.warnings.is_empty() {
        eprintln!("\n{} {}", report.warnings.len().to_string().yellow(), "warnings:".yellow());
        print_capped(&report.warnings, max_reported, print_warning);
    }
    eprintln!();
}

fn print_validation(validation: &ValidationReport, max_reported: usize) {
    print_heading("Validation Results");
    print_field("Files checked", validation.files_checked);

    if validation.errors.is_empty() {
        print_success("No errors found");
    } else {
        eprintln!("\n{} {}", validation.errors.len().to_string().red(), "errors:".red());
        print_capped(&validation.errors, max_reported, print_error);
    }
    if !validation.warnings.is_empty() {
        eprintln!("\n{} {}", validation.warnings.len().to_string().yellow(), "warnings:".yellow());
        print_capped(&validation.warnings, max_reported, print_warning);
    }
    eprintln!();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let total_steps = if args.validate { 2 } else { 1 };
    let config = args.to_config();
    let max_reported = config.max_reported;
    let converter = Converter::new(config);

    let layout = converter
        .layout()
        .with_context(|| format!("Cannot use input directory {}", args.input.display()))?;
    print_step(
        1,
        total_steps,
        &format!(
            "Converting {} into {}",
            layout.input_dir.display().bright_white(),
            layout.output_dir.display().bright_white()
        ),
    );
    tracing::debug!(?layout, "Resolved layout");
    if args.verbose {
        print_field("Project", &layout.project_name);
        print_field("Images", layout.static_dir.display());
    }

    let report = match converter.run() {
        Ok(report) => report,
        Err(FolioError::OutputExists(dir)) => {
            anyhow::bail!("Output directory {} is not empty (use --force to write into it)", dir.display())
        }
        Err(e) => return Err(e).context("Conversion failed"),
    };

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        print_summary(&report, max_reported);
    }
    print_success(&format!(
        "Converted {} documents into {}",
        report.documents_converted,
        layout.output_dir.display().bright_white()
    ));

    if args.validate {
        print_step(2, total_steps, "Validating output");
        let validation = converter.validate().context("Validation could not run")?;
        print_validation(&validation, max_reported);
        if !validation.passed() {
            anyhow::bail!("Validation failed with {} errors", validation.errors.len());
        }
        print_success("Validation passed");
    }

    Ok(())
}
