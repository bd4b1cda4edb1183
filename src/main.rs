use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use quiz_image_sync::app::ports::ImageCatalogPort;
use quiz_image_sync::app::sync_use_case::apply_with_index;
use quiz_image_sync::config::Config;
use quiz_image_sync::constants::{DEFAULT_CONFIG_PATH, ENV_PUSHGATEWAY_URL};
use quiz_image_sync::infra::http_client::CloudflareImagesClient;
use quiz_image_sync::infra::record_file_adapter::{write_atomically, JsonFileRecordStore};
use quiz_image_sync::observability::{self, metrics};
use quiz_image_sync::{
    CatalogFetcher, ImageIndex, OutcomeReport, SyncError, SyncResult, SyncUseCase,
};

#[derive(Parser)]
#[command(name = "quiz_image_sync")]
#[command(about = "Replace quiz image filenames with Cloudflare Images ids")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PagingArgs {
    /// Images requested per listing page
    #[arg(long)]
    page_size: Option<u32>,
    /// Stop listing after this many pages
    #[arg(long)]
    max_pages: Option<u32>,
}

#[derive(Args)]
struct FileArgs {
    /// Record collection to read
    #[arg(long)]
    input: Option<PathBuf>,
    /// Where to write the translated collection (must differ from input)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Also write the per-record outcome report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the catalog, translate every record, write the output file
    Sync {
        #[command(flatten)]
        paging: PagingArgs,
        #[command(flatten)]
        files: FileArgs,
    },
    /// Fetch the catalog only and print filename -> id lines
    Catalog {
        #[command(flatten)]
        paging: PagingArgs,
        /// Save the index as a JSON object for later `apply` runs
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Translate records with a previously dumped index, without network access
    Apply {
        /// JSON object of filename -> id, as written by `catalog --dump`
        #[arg(long)]
        mapping: PathBuf,
        #[command(flatten)]
        files: FileArgs,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Sync { .. } => "sync",
            Commands::Catalog { .. } => "catalog",
            Commands::Apply { .. } => "apply",
        }
    }
}

impl PagingArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(n) = self.page_size {
            config.cloudflare.page_size = n;
        }
        if let Some(n) = self.max_pages {
            config.cloudflare.max_pages = n;
        }
    }
}

impl FileArgs {
    /// Applies the path overrides and refuses a report path that would land on
    /// the input or output file.
    fn apply_to(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(p) = &self.input {
            config.files.input = p.clone();
        }
        if let Some(p) = &self.output {
            config.files.output = p.clone();
        }
        if let Some(report) = &self.report {
            config.files.check_artifact("report", report)?;
        }
        Ok(())
    }
}

fn print_report(result: &SyncResult) {
    let report = &result.report;
    println!("\n📊 Mapping results ({} records):", report.total());
    println!("   ✅ Translated: {}", report.translated);
    println!("   ❌ Not found: {}", report.not_found);
    println!("   ➖ Without image: {}", report.untouched);
    if let Some(catalog) = &result.catalog {
        println!("   📸 Catalog images: {}", catalog.distinct_filenames);
    }
    let missing = report.missing_filenames();
    if !missing.is_empty() {
        println!("\n⚠️  No image id for:");
        for filename in missing {
            println!("   - {}", filename);
        }
    }
    println!("\n📁 Output written to: {}", result.output_file);
}

async fn write_report(path: &Path, report: &OutcomeReport) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(report)?;
    write_atomically(path, body.as_bytes())
        .await
        .with_context(|| format!("writing report to {}", path.display()))?;
    println!("📝 Report written to: {}", path.display());
    Ok(())
}

fn record_store(config: &Config) -> anyhow::Result<Arc<JsonFileRecordStore>> {
    config.files.validate()?;
    Ok(Arc::new(JsonFileRecordStore::new(
        &config.files.input,
        &config.files.output,
    )?))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Sync { paging, files } => {
            paging.apply_to(&mut config);
            files.apply_to(&mut config)?;
            config.validate()?;

            println!("🚀 Syncing quiz images with Cloudflare Images");
            let catalog: Arc<dyn ImageCatalogPort> =
                Arc::new(CloudflareImagesClient::new(config.cloudflare.clone())?);
            let use_case = SyncUseCase::new(catalog, record_store(&config)?);

            let result = use_case
                .run(config.cloudflare.page_size, config.cloudflare.max_pages)
                .await?;
            print_report(&result);
            if let Some(path) = &files.report {
                write_report(path, &result.report).await?;
            }
        }
        Commands::Catalog { paging, dump } => {
            paging.apply_to(&mut config);
            config.cloudflare.validate()?;
            if let Some(path) = &dump {
                config.files.check_artifact("mapping dump", path)?;
            }

            println!("🔄 Fetching images from Cloudflare...");
            let client = CloudflareImagesClient::new(config.cloudflare.clone())?;
            let catalog = CatalogFetcher::new(Arc::new(client))
                .fetch_catalog(config.cloudflare.page_size, config.cloudflare.max_pages)
                .await?;

            for (filename, id) in catalog.index.iter() {
                println!("  {} -> {}", filename, id);
            }
            println!(
                "\n📸 Found {} images ({} entries over {} pages)",
                catalog.summary.distinct_filenames,
                catalog.summary.entries_received,
                catalog.summary.pages_fetched
            );
            if !catalog.summary.exhausted {
                println!("⚠️  Page limit reached; raise --max-pages to list the rest");
            }
            if let Some(path) = dump {
                let body = serde_json::to_string_pretty(&catalog.index)?;
                write_atomically(&path, body.as_bytes()).await?;
                println!("📁 Mapping saved to: {}", path.display());
            }
        }
        Commands::Apply { mapping, files } => {
            files.apply_to(&mut config)?;

            let text = tokio::fs::read_to_string(&mapping)
                .await
                .with_context(|| format!("reading mapping {}", mapping.display()))?;
            let index: ImageIndex = serde_json::from_str(&text)
                .with_context(|| format!("parsing mapping {}", mapping.display()))?;
            info!("Loaded {} mappings from {}", index.len(), mapping.display());

            let store = record_store(&config)?;
            let result = apply_with_index(store.as_ref(), &index).await?;
            print_report(&result);
            if let Some(path) = &files.report {
                write_report(path, &result.report).await?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let guard = observability::init_logging();

    let pushgateway = std::env::var(ENV_PUSHGATEWAY_URL).ok();
    if pushgateway.is_some() {
        if let Err(e) = metrics::init() {
            warn!("Metrics disabled: {:#}", e);
        }
    }

    let cli = Cli::parse();
    let command = cli.command.name();
    let result = run(cli).await;

    if let Some(base) = &pushgateway {
        if let Err(e) = metrics::push_to_gateway(base, command).await {
            warn!("Failed to push metrics: {:#}", e);
        }
    }

    if let Err(e) = result {
        let remote = e
            .downcast_ref::<SyncError>()
            .is_some_and(SyncError::is_remote);
        if remote {
            error!("❌ No catalog obtained, nothing was written: {:#}", e);
        } else {
            error!("❌ Run failed: {:#}", e);
        }
        drop(guard);
        std::process::exit(1);
    }
}
