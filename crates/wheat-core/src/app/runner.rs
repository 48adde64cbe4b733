//! Runner - drive a job until it finishes or shutdown is requested.
//!
//! On shutdown the runner cancels its token and then waits for the job to
//! unwind at its next await point, so a half-done batch is dropped rather
//! than committed.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::app::enrich_job::EnrichSummary;
use crate::domain::EnrichError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(EnrichSummary),
    /// Stopped by a shutdown signal; earlier batches remain saved.
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct Runner {
    cancel: CancellationToken,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token the job must observe.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Await `job`, cancelling it when `shutdown` resolves first.
    pub async fn run<J, S>(&self, job: J, shutdown: S) -> Result<RunOutcome, EnrichError>
    where
        J: Future<Output = Result<EnrichSummary, EnrichError>>,
        S: Future<Output = ()>,
    {
        tokio::pin!(job);
        tokio::pin!(shutdown);

        let result = tokio::select! {
            result = &mut job => result,
            () = &mut shutdown => {
                tracing::info!("Shutdown requested; cancelling enrichment");
                self.cancel.cancel();
                job.await
            }
        };

        match result {
            Ok(summary) => Ok(RunOutcome::Completed(summary)),
            Err(EnrichError::Cancelled) => {
                tracing::info!("Enrichment cancelled; committed batches were kept");
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM.
///
/// A signal handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping");
        }
    }
}
