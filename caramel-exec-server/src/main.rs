use caramel_exec::{CodeExecutionService, DockerRuntime, ExecConfig};
use caramel_exec_server::{create_app, run_server};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CARAMEL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "CARAMEL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "CARAMEL_PORT", default_value = "5000")]
    port: u16,

    /// Directory for per-request workspaces
    #[arg(long, env = "CARAMEL_SCRATCH_ROOT")]
    scratch_root: Option<PathBuf>,

    /// Execution deadline in seconds
    #[arg(long, env = "CARAMEL_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// Maximum number of concurrent executions
    #[arg(short, long, env = "CARAMEL_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExecConfig::load(path)?,
        None => ExecConfig::default(),
    };
    if let Some(scratch_root) = args.scratch_root {
        config = config.with_scratch_root(scratch_root);
    }
    if let Some(deadline_secs) = args.deadline_secs {
        config = config.with_deadline_secs(deadline_secs);
    }
    if let Some(max_concurrent) = args.max_concurrent {
        config = config.with_max_concurrent(max_concurrent);
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let runtime = DockerRuntime::connect()?;
    let service = CodeExecutionService::new(config, Arc::new(runtime)).await?;

    let app = create_app(service);
    run_server(app, addr).await?;

    Ok(())
}
