use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::info;
use store_report::fonts::{self, FontCatalog, FontResolver, DEFAULT_FONT_EXTENSIONS};
use store_report::store::SqliteStore;
use store_report::{CompletionFlag, ReportConfig, ReportJob, ReportTask};

/// Generates PDF reports from SQLite tables.
///
/// Fonts are scanned from `--fonts-dir`, the `fonts_dir` configuration entry,
/// the `STORE_REPORT_FONTS_DIR` environment variable or the platform font
/// directory, in that order.
#[derive(Parser)]
#[command(author, version, about = "PDF reports from embedded table stores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the report described by a JSON configuration file.
    #[command(name = "generate", aliases = ["gen", "run"])]
    Generate {
        /// Report configuration file.
        config: PathBuf,

        /// Directory relative paths in the configuration are resolved against
        /// (defaults to the configuration file's directory).
        #[arg(short, long)]
        project_dir: Option<PathBuf>,

        #[command(flatten)]
        fonts: FontArgs,
    },

    /// List the font families found in the font directory.
    #[command(name = "fonts")]
    Fonts {
        #[command(flatten)]
        fonts: FontArgs,
    },

    /// Show which font file a family/style request resolves to.
    #[command(name = "resolve")]
    Resolve {
        family: String,

        #[arg(short, long)]
        bold: bool,

        #[arg(short, long)]
        italic: bool,

        #[command(flatten)]
        fonts: FontArgs,
    },
}

#[derive(Args)]
struct FontArgs {
    /// Directory scanned recursively for font files.
    #[arg(long)]
    fonts_dir: Option<PathBuf>,

    /// Fail on unknown font families instead of substituting an installed one.
    #[arg(long)]
    strict_fonts: bool,
}

impl FontArgs {
    fn resolver(&self, configured: Option<PathBuf>) -> Result<FontResolver, Box<dyn Error>> {
        let directory = self
            .fonts_dir
            .clone()
            .or(configured)
            .or_else(fonts::default_font_directory)
            .ok_or("no font directory available; pass --fonts-dir")?;
        let catalog = FontCatalog::build(&directory, DEFAULT_FONT_EXTENSIONS);
        Ok(FontResolver::new(Arc::new(catalog)).with_null_if_not_found(self.strict_fonts))
    }
}

fn main() {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            config,
            project_dir,
            fonts,
        } => generate(&config, project_dir, &fonts),
        Commands::Fonts { fonts } => list_fonts(&fonts),
        Commands::Resolve {
            family,
            bold,
            italic,
            fonts,
        } => resolve(&family, bold, italic, &fonts),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn generate(
    config_path: &Path,
    project_dir: Option<PathBuf>,
    fonts: &FontArgs,
) -> Result<(), Box<dyn Error>> {
    let config = ReportConfig::load(config_path)?;
    let project_dir = project_dir
        .or_else(|| config_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let resolver = fonts.resolver(config.fonts_dir(&project_dir))?;
    let store_path = config.data_store_path(&project_dir)?;
    let job = ReportJob::new(config, resolver, project_dir);
    job.validate()?;
    let store = SqliteStore::open(store_path)?;

    let flag = CompletionFlag::new();
    let task = ReportTask::spawn(job, store, flag.clone())?;
    let summary = task.join()?;
    info!("Report created: {}", flag.is_set());
    println!(
        "Generated {} ({} rows, {} pages, {} bytes)",
        summary.output_path.display(),
        summary.rows,
        summary.pages,
        summary.bytes
    );
    Ok(())
}

fn list_fonts(fonts: &FontArgs) -> Result<(), Box<dyn Error>> {
    let resolver = fonts.resolver(None)?;
    for family in resolver.catalog().families() {
        let styles = family
            .styles()
            .map(|style| format!("{style:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{} [{}]", family.name(), styles);
    }
    Ok(())
}

fn resolve(family: &str, bold: bool, italic: bool, fonts: &FontArgs) -> Result<(), Box<dyn Error>> {
    let resolver = fonts.resolver(None)?;
    match resolver.resolve_typeface(family, bold, italic)? {
        Some(file) => println!("{file}"),
        None => println!("{family}: not installed"),
    }
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
