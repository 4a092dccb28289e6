use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use ecsmesh::check;
use ecsmesh::config::Config;
use ecsmesh::reconcile::Reconciler;
use ecsmesh_cache::ShardedCache;
use ecsmesh_core::{MeshError, Result};
use ecsmesh_discovery::{instance_local_ip, AwsInventory};
use ecsmesh_server::{shutdown, XdsServer};

#[derive(Debug, Parser)]
#[command(name = "ecsmesh", about = "ECS-to-Envoy sidecar control plane")]
struct Args {
    /// Operating mode.
    #[arg(value_enum, default_value = "serve")]
    mode: Mode,

    /// Debug logging (includes per-request tracing).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Verbose logging (per-cycle diffs and inventory calls).
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Mode {
    /// Run the reconciler and the xDS server.
    Serve,
    /// Alias of serve, kept for compatibility with older deployments.
    Poll,
    /// One-shot: dump the discovered endpoints and exit.
    AwsCheck,
    /// One-shot: verify the xDS port can be bound and exit.
    EnvoyCheck,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.debug, args.verbose);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };

    let result = match args.mode {
        Mode::Serve | Mode::Poll => serve(config).await,
        Mode::AwsCheck => aws_check(config).await,
        Mode::EnvoyCheck => check::envoy_check(&config).await,
    };

    if let Err(error) = result {
        error!(%error, "exiting");
        std::process::exit(1);
    }
}

/// The long-running mode: xDS server in the background, reconciler in the
/// foreground, both stopped by the same signal.
async fn serve(config: Config) -> Result<()> {
    let local_ip = instance_local_ip().await?;
    let inventory = AwsInventory::from_env().await;
    let cache = Arc::new(ShardedCache::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.envoy.admin_port));
    let server = XdsServer::new(Arc::clone(&cache));
    let mut server_task = tokio::spawn(server.serve(addr, shutdown::wait_for_signal()));

    let reconciler = Reconciler::new(inventory, config, local_ip, cache);

    tokio::select! {
        served = &mut server_task => match served {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(MeshError::Config(format!("xDS server failed: {error}"))),
            Err(error) => Err(MeshError::Config(format!("xDS server task aborted: {error}"))),
        },
        result = reconciler.run(shutdown::wait_for_signal()) => {
            let _ = server_task.await;
            result
        }
    }
}

async fn aws_check(config: Config) -> Result<()> {
    let inventory = AwsInventory::from_env().await;
    // Off-instance use is fine for a dump; ingress filtering just matches
    // nothing.
    let local_ip = match instance_local_ip().await {
        Ok(ip) => ip,
        Err(error) => {
            error!(%error, "no instance metadata; ingress matching disabled");
            "(unknown)".to_string()
        }
    };
    check::aws_check(&inventory, &config, &local_ip).await
}

fn init_tracing(debug: bool, verbose: bool) {
    let default_level = if debug {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
