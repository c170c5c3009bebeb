use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use iiif_pyramid::metadata::MetadataSource;
use iiif_pyramid::pipeline::{self, JobSpec};
use iiif_pyramid::{config, output};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "iiif-pyramid")]
#[command(about = "Generate IIIF tile pyramids and manifests from page scans")]
#[command(long_about = "\
Generate IIIF tile pyramids and manifests from page scans

Takes one object's folder of page images plus the collection's metadata
sheet, and writes a static IIIF level 0 image service per page plus a
Presentation 2.1 manifest for the object.

Input layout:

  Ms1990_025_metadata.csv            # sheet name carries the collection id
  scans/Ms1990_025/                  # collection
  └── box1/
      └── Ms1990_025_003/            # object id
          └── images/                # --input-folder
              ├── obj_001.tif        # page 1 (byte-wise sort order)
              ├── obj_002.tif
              └── finding-aid.pdf    # skipped

Output layout (under --output-dir):

  <root>/Ms1990_025/box1/
  ├── Ms1990_025_003/manifest.json
  ├── Ms1990_025_003/records.json
  └── tiles/Ms1990_025_003-1/info.json, full/..., x,y,w,h/...

Metadata sheet: header row with an `Identifier` column; `Title` and
`Description` are optional. Missing metadata never stops a run.

Run 'iiif-pyramid gen-config' to generate a documented config.toml.")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Metadata sheet: local CSV path or http(s) URL
    #[arg(short = 'm', long = "metadata-file", required = true)]
    metadata_file: Option<String>,

    /// Folder of page images for one object
    #[arg(short = 'i', long = "input-folder", required = true)]
    input_folder: Option<PathBuf>,

    /// Public base URL of the published tree (required unless set in config.toml)
    #[arg(short = 'b', long = "base-path", env = "IIIF_BASE_URL")]
    base_path: Option<String>,

    /// Leading folder of every output prefix and object key
    #[arg(short = 'r', long = "root-folder", required = true)]
    root_folder: Option<String>,

    /// Publish the output tree to S3
    #[arg(short = 'u', long = "upload-to-s3")]
    upload_to_s3: bool,

    /// Local output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// S3 bucket
    #[arg(long, env = "IIIF_S3_BUCKET")]
    bucket: Option<String>,

    /// S3 region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Custom S3 endpoint (MinIO etc.)
    #[arg(long, env = "IIIF_S3_ENDPOINT")]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    match run(cli.run) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the pipeline. Returns `Ok(false)` when any page failed to render.
fn run(args: RunArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(base) = args.base_path {
        config.base_url = base;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if args.upload_to_s3 {
        config.upload_to_s3 = true;
    }
    if let Some(bucket) = args.bucket {
        config.s3.bucket = bucket;
    }
    if let Some(region) = args.region {
        config.s3.region = region;
    }
    if let Some(endpoint) = args.endpoint {
        config.s3.endpoint = endpoint;
    }
    if let Err(e) = require_base_url(&config) {
        e.exit();
    }
    config.validate()?;

    // clap enforces these when no subcommand is given
    let (Some(metadata_file), Some(input_folder), Some(root_folder)) =
        (args.metadata_file, args.input_folder, args.root_folder)
    else {
        return Err("--metadata-file, --input-folder and --root-folder are required".into());
    };

    let job = JobSpec {
        metadata: MetadataSource::parse(&metadata_file),
        image_folder: input_folder,
        root_folder,
    };

    init_thread_pool(&config.processing);

    println!("==> Rendering {}", job.image_folder.display());
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::run(&job, &config, Some(tx));
    printer.join().ok();
    let summary = result?;

    println!();
    output::print_records(
        &summary.location,
        &summary.records,
        &summary.skipped_documents,
    );
    println!();
    output::print_summary(&summary);

    Ok(summary.is_success())
}

/// The base URL may come from `-b`, `IIIF_BASE_URL` or config.toml, so clap
/// cannot require it while parsing. Report a missing one with clap's usage.
fn require_base_url(config: &config::PipelineConfig) -> Result<(), clap::Error> {
    if config.base_url.trim().is_empty() {
        return Err(Cli::command().error(
            ErrorKind::MissingRequiredArgument,
            "the following required argument was not provided:\n  \
             --base-path <BASE_PATH> (or base_url in config.toml)",
        ));
    }
    Ok(())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iiif_pyramid=debug"
    } else {
        "iiif_pyramid=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
