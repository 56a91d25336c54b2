use anyhow::Result;
use clap::Parser;
use digit_serve::{config::Config, web::serve};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "digit-serve")]
#[command(about = "Handwritten digit recognition over HTTP")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: String,

    /// ONNX model path
    #[arg(long, default_value = "models/mnist.onnx")]
    model: String,

    /// Directory for temporary uploads
    #[arg(long, default_value = "uploads")]
    upload_dir: String,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::new(args.bind, args.model, args.upload_dir, args.workers, args.dev)?;

    // 初始化日志系统，开发模式默认输出debug日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter(&args.log_level))),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting digit recognition service...");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Model path: {}", config.model_path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))?;

    Ok(())
}
