use std::sync::Arc;
use tracing::{error, info, warn};

use webtty_core::WebttyError;
use webtty_gateway::{EchoBackend, Server, ShutdownSignals};

pub(super) async fn cmd_serve(config: &webtty_config::WebttyConfig) -> webtty_core::Result<()> {
    println!("webtty v{}", env!("CARGO_PKG_VERSION"));
    println!("   http://{}", config.server.listen_addr());
    if config.server.auth_token.is_some() {
        println!("   auth token: required");
    }
    println!();

    // The loader validated before logging was up; repeat so warnings are seen.
    if let Ok(warnings) = config.validate() {
        for warning in &warnings {
            warn!("{warning}");
        }
    }

    let server = Server::new(config, Arc::new(EchoBackend))?;
    let signals = ShutdownSignals::default();
    spawn_signal_listeners(signals.clone());

    match server.run(signals).await {
        Ok(()) => {
            info!("shutdown complete");
            Ok(())
        }
        // A forced stop the operator asked for is not a failure.
        Err(WebttyError::Canceled) => {
            info!("stopped");
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!(error = %e, "shutdown did not complete cleanly");
            Err(e)
        }
        Err(e) => {
            error!(error = %e, "gateway failed");
            Err(e)
        }
    }
}

/// First interrupt asks for a graceful stop; a second one forces it.
/// SIGTERM (how supervisors stop us) also maps to the graceful path.
fn spawn_signal_listeners(signals: ShutdownSignals) {
    #[cfg(unix)]
    {
        let signals = signals.clone();
        tokio::spawn(async move {
            let Ok(mut term) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            else {
                return;
            };
            term.recv().await;
            info!("received SIGTERM, shutting down gracefully");
            signals.graceful.cancel();
        });
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("interrupt received, shutting down gracefully (interrupt again to force)");
        signals.graceful.cancel();

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("second interrupt, forcing shutdown");
        signals.immediate.cancel();
    });
}
