//! Daemon assembly and event loop.
//!
//! Wires the receiver task to the routing loop over an mpsc channel and
//! manages shutdown ordering: stop the producer first, drain whatever
//! is left in the channel, then flush the router's ring buffers and
//! close the output files.
//!
//! The router is owned by the event loop task, so every message is
//! routed sequentially: one message is written to its full target set
//! before the next is processed.

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pmlogd_core::RoutingConfig;
use pmlogd_router::LogRouter;

use crate::receiver::{ReceiverConfig, SyslogReceiver};

/// Capacity of the receiver-to-router channel.
const MESSAGE_CHANNEL_CAPACITY: usize = 1024;

/// The assembled daemon.
pub struct Daemon {
    router: LogRouter,
    receiver_config: ReceiverConfig,
}

impl Daemon {
    /// Build the daemon from a loaded routing configuration.
    pub fn new(config: RoutingConfig, receiver_config: ReceiverConfig) -> Result<Self> {
        let router = LogRouter::new(config).context("failed to build log router")?;
        Ok(Self {
            router,
            receiver_config,
        })
    }

    /// Run until SIGTERM/SIGINT, then drain and shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver cannot bind its socket or the
    /// signal handlers cannot be installed; both are fatal startup
    /// conditions with a non-zero exit.
    pub async fn run(mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let mut receiver =
            SyslogReceiver::new(self.receiver_config.clone(), tx, cancel.clone());

        let socket = receiver.bind().await.with_context(|| {
            format!(
                "failed to bind syslog receiver to {}",
                self.receiver_config.bind_addr
            )
        })?;
        let receiver_task = tokio::spawn(async move { receiver.run(socket).await });

        let mut sigterm =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

        tracing::info!("pmlogd-daemon running");

        loop {
            tokio::select! {
                maybe_msg = rx.recv() => {
                    match maybe_msg {
                        Some(msg) => self.router.submit(msg),
                        None => {
                            tracing::warn!("receiver channel closed, shutting down");
                            break;
                        }
                    }
                }
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    tracing::info!("SIGINT received, shutting down");
                    break;
                }
            }
        }

        // stop the producer, then drain what it already sent
        cancel.cancel();
        let _ = receiver_task.await;
        while let Ok(msg) = rx.try_recv() {
            self.router.submit(msg);
        }

        // flush ring buffers and close all outputs
        self.router.shutdown();
        tracing::info!(
            submitted = self.router.submitted_count(),
            written = self.router.written_count(),
            write_errors = self.router.write_error_count(),
            "router drained and outputs closed"
        );
        Ok(())
    }
}
