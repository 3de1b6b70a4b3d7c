//! Apex3D CLI - Text-to-3D point-cloud generation
//!
//! Command-line interface over the two-stage pipeline: a text prompt is
//! turned into an image by Gemini, and the image into a PLY point cloud by
//! the SAM3D reconstruction service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use apex_imagegen::{ImageGenClient, FALLBACK_MODEL, PRIMARY_MODEL};
use apex_pipeline::{PipelineController, Settings};
use apex_sam3d::Sam3dClient;
use apex_viewer::parse_point_cloud;

#[derive(Parser)]
#[command(name = "apex3d")]
#[command(
    author,
    version,
    about = "Generate 3D point clouds from text prompts via Gemini + SAM3D"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a point cloud from a text prompt
    Generate {
        /// Text description of the object to generate
        #[arg(required_unless_present = "image")]
        prompt: Option<String>,

        /// Output file path for the PLY point cloud
        #[arg(short, long, default_value = "model.ply")]
        output: PathBuf,

        /// Random seed for the reconstruction stage
        #[arg(short, long, default_value = "42")]
        seed: i64,

        /// Image generation model (falls back automatically when unavailable)
        #[arg(long, default_value = PRIMARY_MODEL)]
        model: String,

        /// Reconstruct from an existing image file, skipping generation
        #[arg(long, conflicts_with = "image_only")]
        image: Option<PathBuf>,

        /// Stop after image generation, skipping 3D reconstruction
        #[arg(long)]
        image_only: bool,

        /// Also write the intermediate generated image next to the output
        #[arg(long)]
        keep_intermediate: bool,

        /// Reconstruction service endpoint (overrides settings)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Check whether the reconstruction service is reachable
    Probe {
        /// Reconstruction service endpoint (overrides settings)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Show statistics about a PLY point-cloud file
    Info {
        /// Path to a .ply file
        file: PathBuf,
    },

    /// Show or update persisted configuration
    Settings {
        /// Set the reconstruction service endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Set the reconstruction service API key
        #[arg(long)]
        api_key: Option<String>,

        /// Set the image generation API key
        #[arg(long)]
        gemini_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            prompt,
            output,
            seed,
            model,
            image,
            image_only,
            keep_intermediate,
            endpoint,
        } => {
            if let Some(path) = image {
                convert_only(path, output, seed, endpoint).await
            } else {
                let prompt = prompt.context("a prompt is required without --image")?;
                generate(
                    prompt,
                    output,
                    seed,
                    model,
                    image_only,
                    keep_intermediate,
                    endpoint,
                )
                .await
            }
        }
        Commands::Probe { endpoint } => probe(endpoint).await,
        Commands::Info { file } => info(file),
        Commands::Settings {
            endpoint,
            api_key,
            gemini_key,
        } => settings(endpoint, api_key, gemini_key),
    }
}

fn load_settings() -> Settings {
    match Settings::default_path() {
        Some(path) => Settings::load_or_default(&path),
        None => Settings::default(),
    }
    .overlay_env()
}

fn spinner() -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Reconstruct from an existing image file, bypassing image generation
async fn convert_only(
    image: PathBuf,
    output: PathBuf,
    seed: i64,
    endpoint: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let endpoint = endpoint.unwrap_or(settings.sam3d_endpoint);
    let recon = Sam3dClient::new(endpoint).with_api_key(settings.sam3d_api_key);

    let bytes = std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;

    let progress = spinner();
    progress.set_message("Reconstructing 3D point cloud (this can take minutes)...");
    let result = match recon.convert(&bytes, seed).await {
        Ok(result) => result,
        Err(e) => {
            progress.finish_with_message(format!("Reconstruction failed: {}", e));
            std::process::exit(1);
        }
    };

    std::fs::write(&output, &result.bytes)
        .with_context(|| format!("writing {}", output.display()))?;
    progress.finish_with_message(format!(
        "Generated {} bytes → {}",
        result.len(),
        output.display()
    ));
    print_cloud_stats(&result.bytes);
    Ok(())
}

async fn generate(
    prompt: String,
    output: PathBuf,
    seed: i64,
    model: String,
    image_only: bool,
    keep_intermediate: bool,
    endpoint: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let endpoint = endpoint.unwrap_or(settings.sam3d_endpoint);

    if settings.gemini_api_key.is_empty() {
        eprintln!("Error: no Gemini API key configured.");
        eprintln!("Set one with `apex3d settings --gemini-key <KEY>` or GEMINI_API_KEY.");
        std::process::exit(1);
    }

    let imagegen = ImageGenClient::new(&settings.gemini_api_key);
    let recon = Sam3dClient::new(&endpoint).with_api_key(&settings.sam3d_api_key);
    let mut controller = PipelineController::new(Arc::new(imagegen), Arc::new(recon))
        .with_models(model, FALLBACK_MODEL);

    let progress = spinner();

    // Mirror the synthetic pipeline progress onto the spinner
    let mut percent = controller.progress();
    let mirror = {
        let progress = progress.clone();
        tokio::spawn(async move {
            while percent.changed().await.is_ok() {
                let value = *percent.borrow();
                if value > 0 && value < 100 {
                    progress.set_message(format!("{}%", value));
                }
            }
        })
    };

    progress.set_message(format!("Generating image for \"{}\"...", truncate(&prompt, 40)));
    if let Err(e) = controller.generate(&prompt).await {
        progress.finish_with_message(format!("Image generation failed: {}", e));
        if controller.credentials_invalidated() {
            eprintln!("The configured Gemini API key appears to be invalid or revoked.");
        }
        std::process::exit(1);
    }

    let image = controller.image().context("image missing after generation")?;
    if image_only || keep_intermediate {
        let image_path = output.with_file_name(image.suggested_filename());
        std::fs::write(&image_path, &image.bytes)
            .with_context(|| format!("writing {}", image_path.display()))?;
        progress.println(format!("Wrote intermediate image → {}", image_path.display()));
    }
    if image_only {
        progress.finish_with_message("Done (image only)");
        mirror.abort();
        return Ok(());
    }

    progress.set_message("Reconstructing 3D point cloud (this can take minutes)...");
    if let Err(e) = controller.convert(seed).await {
        progress.finish_with_message(format!("Reconstruction failed: {}", e));
        std::process::exit(1);
    }
    mirror.abort();

    let result = controller.result().context("result missing after conversion")?;
    std::fs::write(&output, &result.bytes)
        .with_context(|| format!("writing {}", output.display()))?;
    progress.finish_with_message(format!(
        "Generated {} bytes → {}",
        result.len(),
        output.display()
    ));

    print_cloud_stats(&result.bytes);
    Ok(())
}

/// Statistics are a convenience; the written file stands on its own even
/// when the parser cannot read it
fn print_cloud_stats(bytes: &[u8]) {
    match parse_point_cloud(bytes) {
        Ok(cloud) => {
            println!();
            println!("Statistics:");
            println!("  Points:      {}", cloud.len());
            println!("  Extent:      {:.3}", cloud.extent());
            println!("  Center:      {:.3}", cloud.center());
        }
        Err(e) => {
            eprintln!("Note: could not parse the result as a point cloud: {}", e);
        }
    }
}

async fn probe(endpoint: Option<String>) -> Result<()> {
    let settings = load_settings();
    let endpoint = endpoint.unwrap_or(settings.sam3d_endpoint);
    let client = Sam3dClient::new(&endpoint).with_api_key(&settings.sam3d_api_key);

    let progress = spinner();
    progress.set_message(format!("Probing {}...", client.endpoint()));

    if client.test_connection().await {
        progress.finish_with_message(format!("{} is reachable", client.endpoint()));
        Ok(())
    } else {
        progress.finish_with_message(format!("{} is not responding", client.endpoint()));
        std::process::exit(1);
    }
}

fn info(file: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let cloud = parse_point_cloud(&bytes)?;

    println!("{}:", file.display());
    println!("  Points:      {}", cloud.len());
    if let Some((min, max)) = cloud.bounds() {
        println!("  Bounds min:  {:.3}", min);
        println!("  Bounds max:  {:.3}", max);
    }
    println!("  Extent:      {:.3}", cloud.extent());
    println!("  File size:   {} bytes", bytes.len());
    Ok(())
}

fn settings(
    endpoint: Option<String>,
    api_key: Option<String>,
    gemini_key: Option<String>,
) -> Result<()> {
    let path = Settings::default_path().context("no platform config directory available")?;
    let mut settings = Settings::load_or_default(&path);

    let updating = endpoint.is_some() || api_key.is_some() || gemini_key.is_some();
    if let Some(value) = endpoint {
        settings.sam3d_endpoint = value;
    }
    if let Some(value) = api_key {
        settings.sam3d_api_key = value;
    }
    if let Some(value) = gemini_key {
        settings.gemini_api_key = value;
    }

    if updating {
        settings.save(&path)?;
        println!("Saved {}", path.display());
    }

    println!("Endpoint:    {}", settings.sam3d_endpoint);
    println!("SAM3D key:   {}", mask(&settings.sam3d_api_key));
    println!("Gemini key:  {}", mask(&settings.gemini_api_key));
    Ok(())
}

fn mask(key: &str) -> String {
    // Count and slice by characters; keys are user input and may not be ASCII
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        "(not set)".to_string()
    } else if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}
