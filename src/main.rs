use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::Rgb;
use maskedit::config::{vertex_endpoint, EditConfig};
use maskedit::drawing::{self, CoordinateTransform, Stroke};
use maskedit::edit::{
    CommandToken, CredentialSource, EditOrchestrator, EditOutcome, EditRequest, EditState,
    EnvToken, ReqwestTransport, StaticToken,
};
use maskedit::mask::{self, MaskBuffer};
use maskedit::output::{format_for, FileStore};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterize a stroke file into a mask at the original image's resolution
    Mask(MaskArgs),
    /// Render a translucent preview of a mask over an image
    Overlay(OverlayArgs),
    /// Send an image, optional mask and instruction to the remote edit model
    Edit(EditArgs),
}

#[derive(Args, Debug)]
struct MaskArgs {
    /// Original image (only its dimensions are read)
    #[arg(long)]
    image: PathBuf,

    /// JSON array of strokes in canvas-local display coordinates
    #[arg(long)]
    strokes: PathBuf,

    /// Width of the viewport the strokes were drawn in
    #[arg(long)]
    viewport_width: f32,

    /// Height of the viewport the strokes were drawn in
    #[arg(long)]
    viewport_height: f32,

    /// Write the complement (background) mask instead
    #[arg(long)]
    invert: bool,

    /// Output mask path
    #[arg(short, long, default_value = "mask.png")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct OverlayArgs {
    #[arg(long)]
    image: PathBuf,

    /// Grayscale mask; values >= 128 are masked
    #[arg(long)]
    mask: PathBuf,

    /// Tint color as RRGGBB hex
    #[arg(long, default_value = "ff0000")]
    color: String,

    /// Tint opacity, 0.0-1.0
    #[arg(long, default_value_t = 0.5)]
    alpha: f32,

    #[arg(short, long, default_value = "preview.png")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[arg(long)]
    image: PathBuf,

    /// Optional mask; without one the whole image is edited
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Edit instruction
    #[arg(long)]
    prompt: String,

    /// Directory for results
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Full `:predict` URL (overrides MASKEDIT_ENDPOINT and --project)
    #[arg(long)]
    endpoint: Option<String>,

    /// Google Cloud project, used to build the Vertex AI endpoint
    #[arg(long)]
    project: Option<String>,

    #[arg(long, default_value = "us-central1")]
    location: String,

    #[arg(long, default_value = "imagegeneration@006")]
    model: String,

    /// Bearer token; otherwise --token-env, otherwise `gcloud auth print-access-token`
    #[arg(long)]
    token: Option<String>,

    /// Environment variable holding the bearer token
    #[arg(long)]
    token_env: Option<String>,

    /// Total send attempts
    #[arg(long)]
    max_attempts: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Mask(args) => run_mask(args),
        Command::Overlay(args) => run_overlay(args),
        Command::Edit(args) => run_edit(args),
    }
}

fn run_mask(args: MaskArgs) -> Result<()> {
    let (width, height) = image::image_dimensions(&args.image)
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    tracing::info!("Original: {}x{}", width, height);

    let json = fs::read_to_string(&args.strokes)
        .with_context(|| format!("Failed to read {}", args.strokes.display()))?;
    let strokes: Vec<Stroke> = serde_json::from_str(&json).context("Failed to parse stroke file")?;

    let transform =
        CoordinateTransform::fit((width, height), (args.viewport_width, args.viewport_height))?;
    tracing::debug!("Transform: {:?}", transform);

    let Some(mut mask) = drawing::rasterize(width, height, &strokes, &transform) else {
        bail!("Stroke file contains no strokes; no mask written");
    };
    if args.invert {
        mask = mask::invert(&mask);
    }

    tracing::info!("Mask covers {} of {} pixels", mask.count_set(), width as u64 * height as u64);
    save_luma(&mask, &args.out)
}

fn run_overlay(args: OverlayArgs) -> Result<()> {
    let image = image::open(&args.image)
        .with_context(|| format!("Failed to open {}", args.image.display()))?
        .to_rgb8();
    let mask_image = image::open(&args.mask)
        .with_context(|| format!("Failed to open {}", args.mask.display()))?
        .to_luma8();

    let color = parse_hex_color(&args.color)?;
    let preview = mask::overlay(&image, &MaskBuffer::from_luma(&mask_image), color, args.alpha);

    preview
        .save_with_format(&args.out, format_for(&args.out))
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    tracing::info!("Preview written to {}", args.out.display());
    Ok(())
}

fn run_edit(args: EditArgs) -> Result<()> {
    let mut config = EditConfig::from_env();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    } else if let Some(project) = &args.project {
        config.endpoint = vertex_endpoint(project, &args.location, &args.model);
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts.max(1);
    }
    if config.endpoint.is_empty() {
        bail!("No endpoint configured: pass --endpoint or --project, or set MASKEDIT_ENDPOINT");
    }

    let image = fs::read(&args.image)
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let mask = match &args.mask {
        Some(path) => {
            let luma = image::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?
                .to_luma8();
            Some(MaskBuffer::from_luma(&luma))
        }
        None => None,
    };

    let credentials: Box<dyn CredentialSource> = match (args.token, args.token_env) {
        (Some(token), _) => Box::new(StaticToken(token)),
        (None, Some(var)) => Box::new(EnvToken::new(var)),
        (None, None) => Box::new(CommandToken::gcloud()),
    };
    let transport = ReqwestTransport::new(&config)?;
    let store = FileStore::new(&args.out_dir);

    let request = EditRequest::new(image, args.prompt)
        .with_mask(mask)
        .with_sample_count(config.sample_count);

    let report = EditOrchestrator::new(&config, credentials.as_ref(), &transport, &store, request)
        .on_transition(|state| {
            if let EditState::RetryWaiting { attempt, delay, .. } = state {
                tracing::info!("Attempt {} failed, next try in {:?}", attempt, delay);
            }
        })
        .run();

    match (report.outcome, report.stored) {
        (EditOutcome::Success(_), Some(stored)) => {
            println!("{}", stored.location.display());
            Ok(())
        }
        (EditOutcome::TerminalFailure(error), _) => {
            Err(error).with_context(|| format!("Edit failed after {} attempts", report.attempts))
        }
        (outcome, _) => bail!("Edit ended without a stored result: {:?}", outcome),
    }
}

fn save_luma(mask: &MaskBuffer, path: &Path) -> Result<()> {
    mask.to_luma()
        .save_with_format(path, format_for(path))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Mask written to {}", path.display());
    Ok(())
}

fn parse_hex_color(hex: &str) -> Result<Rgb<u8>> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("Color must be RRGGBB hex, got {:?}", hex);
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).with_context(|| format!("Invalid color {:?}", hex))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
