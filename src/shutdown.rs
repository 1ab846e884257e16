use std::{future::Future, io};

/// shutdown_signal
///
/// Resolves on Ctrl-C or, on Unix, SIGTERM. A listener that cannot be installed
/// never resolves, so the server keeps running on the remaining one.
pub async fn shutdown_signal() {
    let ctrl_c = wait_for(tokio::signal::ctrl_c(), "Ctrl-C");

    #[cfg(unix)]
    let terminate = wait_for(
        async {
            let mut signal =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
            signal.recv().await;
            Ok::<(), io::Error>(())
        },
        "SIGTERM",
    );

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Completes when `signal` fires; pends forever when it fails.
async fn wait_for<F>(signal: F, name: &str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}
