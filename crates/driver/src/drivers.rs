//! The `drivers` module contains implementations of the [Driver] trait.

use crate::{handlers, Driver, DriverConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Defines a new [Driver] implementation.
#[macro_export]
macro_rules! define_driver {
    ($name:ident, $inner:expr) => {
        #[doc = concat!("Variant of the [Driver] trait: [", stringify!($name), "]")]
        pub struct $name {
            /// The configuration for all of the drivers.
            pub config: Arc<DriverConfig>,
        }

        #[async_trait]
        impl Driver for $name {
            async fn start_loop(self) -> Result<()> {
                #[allow(clippy::redundant_closure_call)]
                $inner(self).await
            }
        }

        impl $name {
            #[doc = concat!("Creates a new instance of the [", stringify!($name), "] driver.")]
            pub fn new(config: Arc<DriverConfig>) -> Self {
                Self { config }
            }
        }
    };
}

define_driver!(
    TxDispatchDriver,
    (|self: TxDispatchDriver| {
        async move {
            tracing::info!(target: "tx-dispatch-driver", "Starting transaction dispatch driver...");
            let mut locked_receive_ch = self.config.tx_receiver.lock().await;
            tracing::info!(target: "tx-dispatch-driver", "Locked receive channel mutex successfully. Beginning tx dispatch loop.");

            while self.config.is_running() {
                let call = match tokio::time::timeout(self.config.poll_interval, locked_receive_ch.recv()).await {
                    Ok(Some(call)) => call,
                    Ok(None) => break,
                    Err(_) => continue,
                };
                tracing::debug!(target: "tx-dispatch-driver", "Transaction request received in dispatch driver: {:?}", call.tx);
                match self.config.devnet.lock().await.apply(&call) {
                    Ok(()) => {
                        tracing::info!(target: "tx-dispatch-driver", "Transaction from {:?} applied successfully.", call.from);
                    }
                    Err(e) => {
                        // Soft failure, log the error and continue.
                        tracing::error!(target: "tx-dispatch-driver", "Error sending transaction: {}", e);
                    }
                }
            }

            Ok(())
        }
    })
);

define_driver!(
    OutputProposalDriver,
    (|self: OutputProposalDriver| {
        async move {
            tracing::info!(target: "output-proposal-driver", "Polling OutputProposed events...");
            let mut interval = tokio::time::interval(self.config.poll_interval);
            let mut cursor = 0;

            while self.config.is_running() {
                interval.tick().await;
                for output_proposed in handlers::poll_output_proposals(&self.config, &mut cursor).await {
                    tracing::debug!(target: "output-proposal-driver", "OutputProposed event received");
                    if let Err(e) = handlers::output_proposed(Arc::clone(&self.config), &output_proposed).await {
                        tracing::error!(target: "output-proposal-driver", "Error handling OutputProposed event: {}", e);
                    }
                }
            }

            Ok(())
        }
    })
);

define_driver!(
    DisputeFactoryDriver,
    (|self: DisputeFactoryDriver| {
        async move {
            tracing::info!(target: "dispute-factory-driver", "Polling DisputeGameCreated events...");
            let mut interval = tokio::time::interval(self.config.poll_interval);
            let mut cursor = 0;

            while self.config.is_running() {
                interval.tick().await;
                for dispute_game_created in handlers::poll_created_games(&self.config, &mut cursor).await {
                    tracing::debug!(target: "dispute-factory-driver", "DisputeGameCreated event received");
                    if let Err(e) = handlers::dispute_game_created(Arc::clone(&self.config), &dispute_game_created).await {
                        tracing::error!(target: "dispute-factory-driver", "Error handling DisputeGameCreated event: {}", e);
                    }
                }
            }

            Ok(())
        }
    })
);

define_driver!(
    FaultGameDriver,
    (|self: FaultGameDriver| {
        async move {
            tracing::info!(target: "fault-game-driver", "Starting fault game driver...");
            let mut interval = tokio::time::interval(self.config.poll_interval);

            while self.config.is_running() {
                interval.tick().await;
                let games = self.config.state.lock().await.active_games();
                for game in games {
                    if let Err(e) = handlers::advance_game(Arc::clone(&self.config), game).await {
                        tracing::error!(target: "fault-game-driver", "Error advancing game {:?}: {}", game, e);
                    }
                }
            }

            Ok(())
        }
    })
);
