use artwork_resize::artwork::ArtworkId;
use artwork_resize::config;
use artwork_resize::reader::{Artifact, ResizedArtwork};
use artwork_resize::store::{ArtworkStore, FileArtworkStore};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ARTWORK_RESIZE_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("ARTWORK_RESIZE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "artwork-resize")]
#[command(about = "Resize and re-encode cover artwork")]
#[command(long_about = "\
Resize and re-encode cover artwork

Images are scaled down to fit a SIZE x SIZE box and re-encoded in the
configured format. Flat or lossless sources stay lossless; photos get a
quality that grows with the requested size. When resizing cannot beat the
original, the original is written unchanged.

Config file (optional):

  [artwork]
  format = \"webp\"     # webp | jxl | avif | png | jpeg
  min_quality = 60
  max_quality = 90

Run 'artwork-resize gen-config' to print a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = "artwork.toml", global = true)]
    config: PathBuf,

    /// Log encoding decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that address a resized variant.
#[derive(clap::Args, Clone)]
struct RequestArgs {
    /// Source image
    source: PathBuf,

    /// Bounding box edge in pixels (0 keeps the original)
    #[arg(long)]
    size: u32,

    /// Pad to a square canvas
    #[arg(long)]
    square: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resize an image and write the result
    Resize {
        #[command(flatten)]
        request: RequestArgs,

        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the cache key of a resized variant
    Key(RequestArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    // One-shot process: nothing cancels it.
    let cancel = CancellationToken::new();

    match cli.command {
        Command::Resize { request, output } => {
            let artwork = open_artwork(&cli.config, &request, &cancel)?;
            let mut result = artwork.reader(&cancel)?;
            let resized = result.is_resized();
            match output {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)?;
                    io::copy(&mut result.stream, &mut file)?;
                    eprintln!("{} → {}", request.source.display(), path.display());
                }
                None => {
                    io::copy(&mut result.stream, &mut io::stdout().lock())?;
                }
            }
            eprintln!("Key: {}", artwork.key());
            eprintln!(
                "{}",
                if resized {
                    "Resized"
                } else {
                    "Original served unchanged"
                }
            );
        }
        Command::Key(request) => {
            let artwork = open_artwork(&cli.config, &request, &cancel)?;
            println!("{}", artwork.key());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Register the source file as a media-file artwork and build the facade.
fn open_artwork(
    config_path: &Path,
    request: &RequestArgs,
    cancel: &CancellationToken,
) -> Result<ResizedArtwork, Box<dyn std::error::Error>> {
    let config = config::load_config(config_path)?;
    let id = ArtworkId::media_file(
        request
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string()),
    );
    let store: Arc<dyn ArtworkStore> =
        Arc::new(FileArtworkStore::new().with(id.clone(), &request.source));
    Ok(ResizedArtwork::new(
        store,
        config.artwork,
        id,
        request.size,
        request.square,
        cancel,
    )?)
}
