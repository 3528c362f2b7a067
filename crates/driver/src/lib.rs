//! The driver crate runs the dispute game agents.
//!
//! A [Devnet] hosts the output oracle, the block oracle and the dispute game factory on an
//! in-memory L1. Each agent is a [DriverConfig] plus a set of [Driver] loops sharing it:
//!
//! - [OutputProposalDriver] challenges output proposals that contradict the agent's trusted
//!   outputs by creating a game.
//! - [DisputeFactoryDriver] starts tracking every alphabet game the factory creates.
//! - [FaultGameDriver] plays the tracked games with the agent's solver and resolves them once
//!   their clocks run out.
//! - [TxDispatchDriver] applies the calls the other drivers prepare.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

mod config;
pub use config::{DriverConfig, DEFAULT_POLL_INTERVAL};

pub mod devnet;
pub use devnet::{Devnet, DevnetConfig, DevnetError, L1Chain};

mod drivers;
pub use drivers::{DisputeFactoryDriver, FaultGameDriver, OutputProposalDriver, TxDispatchDriver};

pub mod handlers;

mod state;
pub use state::{GameSummary, GlobalState, TrackedGame};

mod types;
pub use types::{PreparedCall, Transaction};

/// The [Driver] trait defines the interface for all driver loops that are ran by an agent.
#[async_trait]
pub trait Driver {
    /// Runs the driver loop until the agent shuts down.
    async fn start_loop(self) -> Result<()>;
}

/// Runs every driver of an agent until [DriverConfig::shutdown] is called.
pub async fn run_agent(config: Arc<DriverConfig>) -> Result<()> {
    tracing::info!(target: "op-dispute-driver", "Starting drivers for {:?}", config.actor);
    tokio::try_join!(
        TxDispatchDriver::new(Arc::clone(&config)).start_loop(),
        OutputProposalDriver::new(Arc::clone(&config)).start_loop(),
        DisputeFactoryDriver::new(Arc::clone(&config)).start_loop(),
        FaultGameDriver::new(config).start_loop(),
    )
    .map(|_| ())
}
