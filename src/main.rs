// this_file: src/main.rs
//! Cardpress CLI - postcard compositing and fulfillment tool

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cardpress::{
    logging, pipeline, Address, Dpi, EncodedImage, FulfillmentClient, Message, PhysicalSize,
    Preferences,
};
use clap::{Parser, Subcommand};
use log::info;
use serde::Deserialize;

/// Cardpress - compose print-ready postcards and submit them
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = logging::default_level())]
    log_level: String,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "log_level")]
    quiet: bool,

    /// Preference file supplying default size, density, and font
    #[arg(long, global = true, default_value = "cardpress-prefs.json")]
    prefs: Utf8PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose the photo side of a card into a PNG
    Front {
        /// Photo file (PNG, JPEG, or SVG)
        #[arg(short, long)]
        photo: Utf8PathBuf,

        /// Card size as WxH inches, e.g. 6x4
        #[arg(short, long)]
        size: Option<String>,

        /// Print density in dots per inch
        #[arg(short, long)]
        dpi: Option<u32>,

        /// Output file for the composed panel
        #[arg(short, long, default_value = "front.png")]
        output: Utf8PathBuf,
    },

    /// Compose the message side of a card into a PNG
    Back {
        /// Message text; newlines break lines
        #[arg(short, long, required_unless_present = "message_file")]
        message: Option<String>,

        /// Read the message from a file instead
        #[arg(long, conflicts_with = "message")]
        message_file: Option<Utf8PathBuf>,

        /// Font family for the message
        #[arg(long)]
        font: Option<String>,

        /// Font size in hundredths of an inch
        #[arg(long)]
        font_size: Option<f64>,

        /// Card size as WxH inches, e.g. 6x4
        #[arg(short, long)]
        size: Option<String>,

        /// Print density in dots per inch
        #[arg(short, long)]
        dpi: Option<u32>,

        /// Output file for the composed panel
        #[arg(short, long, default_value = "back.png")]
        output: Utf8PathBuf,
    },

    /// Compose both panels and submit an order for fulfillment
    Order {
        /// Order description file (JSON)
        #[arg(short, long)]
        order: Utf8PathBuf,

        /// Fulfillment API key (falls back to LOB_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Override the fulfillment endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Validate an order description without submitting it
    Validate {
        /// Order description file (JSON)
        #[arg(short, long)]
        input: Utf8PathBuf,
    },

    /// Show version information
    Version,
}

/// On-disk order description consumed by `order` and `validate`
#[derive(Debug, Deserialize)]
struct OrderSpec {
    to: Address,
    from: Address,
    message: Message,
    /// Photo file path, resolved against the working directory
    photo: Utf8PathBuf,
    /// Card size label, e.g. "6x4"; preferences apply when absent
    size: Option<String>,
    /// Print density; preferences apply when absent
    dpi: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging using project logger
    let log_level = if cli.quiet { "error".to_string() } else { cli.log_level.clone() };
    logging::init_logging(&log_level, cli.quiet, true);

    let prefs = Preferences::load(cli.prefs.as_std_path());

    match cli.command {
        Commands::Front {
            photo,
            size,
            dpi,
            output,
        } => {
            let size = resolve_size(size, None, &prefs)?;
            let dpi = resolve_dpi(dpi, None, &prefs)?;
            let payload = read_photo(&photo)?;
            let front = pipeline::render_front(payload, size, dpi).await?;
            std::fs::write(&output, &front.bytes)
                .with_context(|| format!("unable to write {}", output))?;
            println!("✓ Front panel written to {} ({} bytes)", output, front.bytes.len());
        }
        Commands::Back {
            message,
            message_file,
            font,
            font_size,
            size,
            dpi,
            output,
        } => {
            let content = match (message, message_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("unable to read message file {}", path))?,
                (None, None) => bail!("provide --message or --message-file"),
            };
            let font = font.unwrap_or_else(|| prefs.get("font", "Georgia".to_string()));
            let font_size = font_size.unwrap_or_else(|| prefs.get("font_size", 16.0));
            let message = Message::new(content, font, font_size)?;
            let size = resolve_size(size, None, &prefs)?;
            let dpi = resolve_dpi(dpi, None, &prefs)?;
            let back = pipeline::render_back(message, size, dpi).await?;
            std::fs::write(&output, &back.bytes)
                .with_context(|| format!("unable to write {}", output))?;
            println!("✓ Back panel written to {} ({} bytes)", output, back.bytes.len());
        }
        Commands::Order {
            order,
            api_key,
            endpoint,
        } => {
            submit_from_spec(&order, api_key, endpoint, &prefs).await?;
        }
        Commands::Validate { input } => {
            validate_spec(&input, &prefs)?;
        }
        Commands::Version => {
            println!("cardpress version {}", cardpress::VERSION);
            println!("Postcard compositing and fulfillment pipeline");
        }
    }

    Ok(())
}

/// Load an order description from disk
fn load_spec(path: &Utf8Path) -> Result<OrderSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read order file {}", path))?;
    let spec: OrderSpec =
        serde_json::from_str(&text).with_context(|| format!("unable to parse {}", path))?;
    Ok(spec)
}

/// Compose and submit the order described by a spec file
async fn submit_from_spec(
    path: &Utf8Path,
    api_key: Option<String>,
    endpoint: Option<String>,
    prefs: &Preferences,
) -> Result<()> {
    let spec = load_spec(path)?;
    let size = resolve_size(None, spec.size.clone(), prefs)?;
    let dpi = resolve_dpi(None, spec.dpi, prefs)?;
    let photo = read_photo(&spec.photo)?;

    let api_key = api_key
        .or_else(|| std::env::var("LOB_API_KEY").ok())
        .context("no API key: pass --api-key or set LOB_API_KEY")?;
    let client = match endpoint {
        Some(endpoint) => FulfillmentClient::with_endpoint(endpoint, api_key)?,
        None => FulfillmentClient::new(api_key)?,
    };

    info!("submitting {} order from {}", size, path);
    let result = pipeline::submit_order(
        &client,
        photo,
        spec.message,
        spec.to,
        spec.from,
        size,
        dpi,
    )
    .await?;

    let status = result.status();
    let body = result.into_body().await?;
    if status.is_success() {
        println!("✓ Order accepted: {}", status);
        println!("{}", body);
        Ok(())
    } else {
        println!("✗ Fulfillment returned {}", status);
        println!("{}", body);
        bail!("fulfillment rejected the order with status {}", status)
    }
}

/// Validate an order description and report its contents
fn validate_spec(path: &Utf8Path, prefs: &Preferences) -> Result<()> {
    let checked = load_spec(path).and_then(|spec| {
        spec.to.validate()?;
        spec.from.validate()?;
        spec.message.validate()?;
        let size = resolve_size(None, spec.size.clone(), prefs)?;
        let dpi = resolve_dpi(None, spec.dpi, prefs)?;
        if !spec.photo.exists() {
            bail!("photo file {} does not exist", spec.photo);
        }
        Ok((spec, size, dpi))
    });

    match checked {
        Ok((spec, size, dpi)) => {
            println!("✓ Valid order description");
            println!("  To: {}", spec.to.name);
            println!("  From: {}", spec.from.name);
            println!("  Photo: {}", spec.photo);
            println!("  Size: {} at {} dpi", size, dpi);
            Ok(())
        }
        Err(e) => {
            println!("✗ Invalid order description: {:#}", e);
            Err(e)
        }
    }
}

/// Pick the card size from flag, spec, then preferences
fn resolve_size(
    flag: Option<String>,
    spec: Option<String>,
    prefs: &Preferences,
) -> Result<PhysicalSize> {
    let label = flag
        .or(spec)
        .unwrap_or_else(|| prefs.get("size", "6x4".to_string()));
    Ok(label.parse::<PhysicalSize>()?)
}

/// Pick the print density from flag, spec, then preferences
fn resolve_dpi(flag: Option<u32>, spec: Option<u32>, prefs: &Preferences) -> Result<Dpi> {
    let value = flag.or(spec).unwrap_or_else(|| prefs.get("dpi", 300u32));
    Ok(Dpi::new(value)?)
}

/// Read a photo file into an encoded payload
fn read_photo(path: &Utf8Path) -> Result<EncodedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("unable to read photo {}", path))?;
    let media_type = match path.extension().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    };
    Ok(EncodedImage::new(bytes, media_type))
}
