use anyhow::Result;
use clap::Parser;
use pocket::Cli;
use pocket_api::{ApiError, AuthError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    let result = rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        pocket::run(cli, cancel).await
    });

    if let Err(e) = &result {
        let hint = e.chain().find_map(|cause| {
            cause
                .downcast_ref::<AuthError>()
                .map(AuthError::user_message)
                .or_else(|| cause.downcast_ref::<ApiError>().map(ApiError::user_message))
        });
        if let Some(hint) = hint {
            eprintln!("{hint}");
        }
    }

    result
}
