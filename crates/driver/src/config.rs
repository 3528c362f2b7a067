//! The `config` module contains the [DriverConfig].

use crate::{devnet::Devnet, state::GlobalState, types::PreparedCall};
use ethers::types::{Address, H256};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{mpsc, Mutex};

/// The default interval at which the polling drivers look for new logs.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The [DriverConfig] struct contains the configuration of one agent, shared by all of its
/// [Driver](crate::Driver) implementations.
#[derive(Debug)]
pub struct DriverConfig {
    /// The devnet the agent indexes logs from and sends transactions to.
    pub devnet: Arc<Mutex<Devnet>>,
    /// The account the agent sends transactions from.
    pub actor: Address,
    /// The agent's execution trace. Its length is `2^max_depth`.
    pub trace: Arc<[u8]>,
    /// The letter preceding the first letter of the trace.
    pub prestate: u8,
    /// The output roots the agent trusts, by L2 block number. Proposals contradicting one of
    /// these are challenged.
    pub trusted_outputs: HashMap<u64, H256>,
    /// The interval at which the polling drivers look for new logs.
    pub poll_interval: Duration,
    /// The sending handle of the MPSC channel used to send transactions.
    pub tx_sender: mpsc::Sender<PreparedCall>,
    /// The receiving handle of the MPSC channel used to send transactions.
    pub tx_receiver: Mutex<mpsc::Receiver<PreparedCall>>,
    /// The games the agent plays.
    pub state: Mutex<GlobalState>,
    /// Cleared to stop the driver loops.
    running: AtomicBool,
}

impl DriverConfig {
    /// Creates a new [DriverConfig] with the given configuration.
    pub fn new(devnet: Arc<Mutex<Devnet>>, actor: Address, trace: Arc<[u8]>, prestate: u8) -> Self {
        // Create a new MPSC channel for sending transactions from the drivers.
        let (tx_sender, tx_receiver) = mpsc::channel(128);

        Self {
            devnet,
            actor,
            trace,
            prestate,
            trusted_outputs: HashMap::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            tx_sender,
            tx_receiver: Mutex::new(tx_receiver),
            state: Mutex::new(GlobalState::default()),
            running: AtomicBool::new(true),
        }
    }

    /// Returns false once [DriverConfig::shutdown] was called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops the driver loops after their current iteration.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Sets the output roots the agent trusts.
    pub fn with_trusted_outputs(self, trusted_outputs: HashMap<u64, H256>) -> Self {
        Self {
            trusted_outputs,
            ..self
        }
    }

    /// Sets the polling interval.
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }
}
