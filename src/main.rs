use anyhow::Result;
use clap::Parser;
use pet_classifier::{config::Config, web::serve, ClassifyPipeline, ImageSource, ModelHost};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pet-classifier")]
#[command(about = "Cat/dog image classification service powered by ONNX Runtime")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:5000")]
    bind: String,

    /// Serialized model artifact (ONNX)
    #[arg(long, default_value = "models/efficientnetb0_cats_dogs_classifier.onnx")]
    model_path: PathBuf,

    /// Directory where uploaded images are stored
    #[arg(long, default_value = "static/uploads")]
    upload_dir: PathBuf,

    /// Delete stored uploads after this many seconds (0 keeps them forever)
    #[arg(long, default_value_t = 86_400)]
    upload_retention: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Classify a single image file, print the result and exit
    #[arg(long, value_name = "IMAGE")]
    predict: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level))
        )
        .with_target(false)
        .init();

    let mut config = Config::new(&args.bind, args.model_path, args.upload_dir, args.dev)?;
    config.server_config.upload_retention = (args.upload_retention > 0).then_some(args.upload_retention);

    if let Some(image_path) = args.predict {
        tracing::info!("Model path exists: {}", config.model_path.exists());

        let host = ModelHost::load(&config);
        let pair = ClassifyPipeline::predict(&host, &ImageSource::from_path(&image_path));
        println!("{}: {} ({})", image_path.display(), pair.label, pair.confidence);

        if pair.is_error() {
            anyhow::bail!("prediction failed for {}", image_path.display());
        }
        return Ok(());
    }

    tracing::info!("Starting pet classifier service...");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Model path: {}", config.model_path.display());
    tracing::info!("Upload directory: {}", config.upload_dir.display());

    serve(config).await?;

    Ok(())
}
