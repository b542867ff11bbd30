use anyhow::Context;
use clap::{Parser, Subcommand};
use image::ImageReader;
use std::path::{Path, PathBuf};

use radai::annotation::encode::save_image;
use radai::{aggregate_and_annotate, parse_response, Annotation, Config, InferenceClient, LabelFont, ParsedResponse};

#[derive(Parser)]
#[command(name = "radai")]
#[command(about = "Detect kidney stones in ultrasound images")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, value_name = "FILE", env = "RADAI_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send an image to the hosted model and annotate the result
    Predict {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Model name from the config's [models] table, or a model URL
        #[arg(short, long)]
        model: Option<String>,

        /// API key for the inference endpoint
        #[arg(long, env = "RADAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Where to write the annotated image
        #[arg(short, long, default_value = "annotated_image.jpg")]
        out: PathBuf,

        /// Print the raw JSON response
        #[arg(long)]
        print_json: bool,
    },

    /// Annotate an image from a saved inference response
    Annotate {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// JSON response previously returned by the endpoint
        #[arg(short, long, value_name = "JSON")]
        detections: PathBuf,

        /// Font used for labels (falls back to a built-in font)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Where to write the annotated image
        #[arg(short, long, default_value = "annotated_image.jpg")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Predict {
            image_path,
            model,
            api_key,
            out,
            print_json,
        } => {
            if let Some(api_key) = api_key {
                config.api_key = Some(api_key);
            }

            let bytes = std::fs::read(&image_path)
                .with_context(|| format!("Failed to read {}", image_path.display()))?;
            let img = image::load_from_memory(&bytes)
                .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
            log::info!("Image loaded: {}x{}", img.width(), img.height());

            let client = InferenceClient::from_config(&config, model.as_deref())?;
            let file_name = image_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image.jpg");
            let response = client.predict(&bytes, file_name)?;

            if print_json {
                println!("{}", response.raw);
            }

            let font = LabelFont::load(config.annotation.font_path.as_deref(), config.annotation.font_size);
            let annotation = aggregate_and_annotate(img, &response.parsed.detections, &font);
            report(&response.parsed, &annotation, args.verbose);
            write_output(&annotation, &out)?;
        }

        Command::Annotate {
            image_path,
            detections,
            font,
            out,
        } => {
            log::info!("Loading image: {:?}", image_path);
            let img = ImageReader::open(&image_path)?
                .decode()
                .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
            log::info!("Image loaded: {}x{}", img.width(), img.height());

            let json = std::fs::read_to_string(&detections)
                .with_context(|| format!("Failed to read {}", detections.display()))?;
            let parsed = parse_response(&json)?;

            let font_path = font.or_else(|| config.annotation.font_path.clone());
            let font = LabelFont::load(font_path.as_deref(), config.annotation.font_size);
            let annotation = aggregate_and_annotate(img, &parsed.detections, &font);
            report(&parsed, &annotation, args.verbose);
            write_output(&annotation, &out)?;
        }
    }

    Ok(())
}

fn report(parsed: &ParsedResponse, annotation: &Annotation, verbose: bool) {
    println!("\n=== Kidney Stone Detection Results ===");
    println!("Detections received: {}", parsed.detections.len());
    println!("Detections drawn: {}", annotation.drawn);

    if verbose && !parsed.detections.is_empty() {
        println!("\nDetections:");
        for detection in &parsed.detections {
            let b = &detection.bounding_box;
            println!(
                "  {} at ({:.0}, {:.0})-({:.0}, {:.0})",
                detection.label(),
                b.x1,
                b.y1,
                b.x2,
                b.y2
            );
        }
    }

    let skipped = parsed.rejected.len() + annotation.skipped.len();
    if skipped > 0 {
        println!("Skipped {} malformed detection(s)", skipped);
    }

    println!("\nResult: {}", annotation.verdict);
}

fn write_output(annotation: &Annotation, out: &Path) -> anyhow::Result<()> {
    save_image(&annotation.image, out)?;
    println!("Annotated image saved to {}", out.display());
    Ok(())
}
