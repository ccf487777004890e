use anyhow::anyhow;
use anyhow::Result;
use clap::Parser;
use model_operator::config::Cli;
use model_operator::config::Commands;
use model_operator::config::ControllerArgs;
use model_operator::controller;
use model_operator::kube_client;
use tokio_util::sync::CancellationToken;
use utils::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_controller(*args).await,
        Commands::Crd => {
            print!("{}", model_operator::crd_yaml()?);
            Ok(())
        }
    }
}

async fn run_controller(args: ControllerArgs) -> Result<()> {
    let _guard = logging::init(args.log_file.as_deref())?;

    tracing::info!("Starting model-operator {}", &**version::VERSION);

    let client = kube_client::init_kube_client(args.kubeconfig.clone())
        .await
        .map_err(|report| anyhow!("{report:?}"))?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                signal_token.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {e}"),
        }
    });

    controller::run(client, &args, cancel).await;

    tracing::info!("model-operator stopped");
    Ok(())
}
