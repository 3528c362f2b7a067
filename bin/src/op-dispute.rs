use anyhow::{anyhow, ensure, Result};
use clap::{ArgAction, Parser};
use ethers::{
    abi::{self, Token},
    types::{Address, H256, U256},
    utils::keccak256,
};
use op_dispute_driver::{run_agent, Devnet, DevnetConfig, DriverConfig, GameSummary};
use op_dispute_primitives::GameType;
use op_dispute_solvers::fault::{AlphabetGame, FaultGame};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::Level;

const HONEST_ACTOR: Address = Address::repeat_byte(0xAA);
const DISHONEST_ACTOR: Address = Address::repeat_byte(0xDD);

/// Arguments for the `op-dispute` binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count, env = "VERBOSITY")]
    v: u8,

    /// The trace played by the honest agent.
    #[arg(
        long,
        default_value = "abcdefghijklmnop",
        help = "The trace played by the honest agent.",
        env = "OP_DISPUTE_HONEST_TRACE"
    )]
    honest_trace: String,

    /// The trace played by the dishonest agent.
    #[arg(
        long,
        default_value = "abcdefghijklmnoz",
        help = "The trace played by the dishonest agent.",
        env = "OP_DISPUTE_DISHONEST_TRACE"
    )]
    dishonest_trace: String,

    /// The maximum depth of the game tree. Both traces must hold `2^max_depth` letters.
    #[arg(long, default_value_t = 4, help = "The maximum depth of the game tree.")]
    max_depth: u64,

    /// The chess clock of the game, in seconds.
    #[arg(long, default_value_t = 600, help = "The chess clock of the game, in seconds.")]
    game_duration: u64,

    /// The L1 block time, in seconds.
    #[arg(long, default_value_t = 12, help = "The L1 block time, in seconds.")]
    block_time: u64,

    /// Let the dishonest agent create the game instead of proposing a bad output.
    #[arg(long, help = "Let the dishonest agent create the game with its own root claim.")]
    dishonest_root: bool,

    /// The number of L1 blocks to mine before giving up on the game.
    #[arg(long, default_value_t = 500, help = "The number of L1 blocks to mine before giving up.")]
    max_blocks: u64,

    /// The interval at which the agents poll the devnet, in milliseconds.
    #[arg(long, default_value_t = 20, help = "The agents' polling interval, in milliseconds.")]
    poll_interval: u64,

    /// Print the game summaries as JSON.
    #[arg(long, help = "Print the game summaries as JSON.")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command arguments
    let args = Args::parse();

    // Initialize the tracing subscriber
    init_tracing_subscriber(args.v)?;

    let trace_len = trace_len(args.max_depth)?;
    ensure!(
        args.honest_trace.len() == trace_len && args.dishonest_trace.len() == trace_len,
        "Both traces must hold {} letters",
        trace_len
    );

    let devnet_config = DevnetConfig {
        block_time: args.block_time,
        max_game_depth: args.max_depth,
        game_duration: args.game_duration,
        ..Default::default()
    };
    let l2_block_number = devnet_config.submission_interval;
    let proposer = devnet_config.proposer;
    let prestate = devnet_config.prestate;
    let devnet = Arc::new(Mutex::new(Devnet::new(devnet_config)?));
    tracing::info!(target: "op-dispute-cli", "Devnet deployed successfully.");

    let honest_output = H256::from(keccak256(args.honest_trace.as_bytes()));
    let dishonest_output = H256::from(keccak256(args.dishonest_trace.as_bytes()));
    let poll_interval = Duration::from_millis(args.poll_interval);

    let honest = Arc::new(
        DriverConfig::new(
            Arc::clone(&devnet),
            HONEST_ACTOR,
            Arc::from(args.honest_trace.as_bytes()),
            prestate,
        )
        .with_trusted_outputs(HashMap::from([(l2_block_number, honest_output)]))
        .with_poll_interval(poll_interval),
    );
    let dishonest = Arc::new(
        DriverConfig::new(
            Arc::clone(&devnet),
            DISHONEST_ACTOR,
            Arc::from(args.dishonest_trace.as_bytes()),
            prestate,
        )
        .with_poll_interval(poll_interval),
    );

    {
        let mut devnet = devnet.lock().await;
        if args.dishonest_root {
            // The output is honest, but the dishonest agent disputes it with its own root claim.
            devnet.propose_l2_output(proposer, honest_output, l2_block_number)?;
            devnet.mine();
            let root_claim = AlphabetGame::new(
                Address::zero(),
                0,
                Arc::clone(&dishonest.trace),
                prestate,
                args.max_depth,
            )
            .claim_at(1)?;
            let bond = devnet.factory().init_bonds(GameType::ALPHABET);
            devnet.create_game(
                DISHONEST_ACTOR,
                bond,
                GameType::ALPHABET,
                root_claim,
                abi::encode(&[Token::Uint(U256::from(l2_block_number))]).into(),
            )?;
        } else {
            // The honest agent challenges the dishonest output by creating the game.
            devnet.propose_l2_output(proposer, dishonest_output, l2_block_number)?;
        }
        devnet.mine();
    }

    let agents = [Arc::clone(&honest), Arc::clone(&dishonest)];
    let handles = agents
        .iter()
        .map(|agent| tokio::spawn(run_agent(Arc::clone(agent))))
        .collect::<Vec<_>>();
    tracing::info!(target: "op-dispute-cli", "Agents started, mining blocks...");

    let mut resolved = false;
    for _ in 0..args.max_blocks {
        tokio::time::sleep(poll_interval * 4).await;
        let mut devnet = devnet.lock().await;
        devnet.mine();

        let factory = devnet.factory();
        resolved = factory.game_count() > 0
            && (0..factory.game_count())
                .filter_map(|index| factory.game_at_index(index))
                .filter_map(|id| factory.game(id.proxy))
                .all(|game| game.status().is_resolved());
        if resolved {
            break;
        }
    }

    for agent in agents.iter() {
        agent.shutdown();
    }
    for handle in handles {
        handle.await??;
    }

    let devnet = devnet.lock().await;
    let factory = devnet.factory();
    let summaries = (0..factory.game_count())
        .filter_map(|index| factory.game_at_index(index))
        .filter_map(|id| factory.game(id.proxy))
        .map(GameSummary::from)
        .collect::<Vec<_>>();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in summaries.iter() {
            println!(
                "Game {:?} over L2 block #{}: {} ({} claims, {} countered)",
                summary.address,
                summary.l2_block_number,
                summary.status,
                summary.claims,
                summary.countered
            );
        }
    }

    ensure!(resolved, "Games did not resolve within {} blocks", args.max_blocks);
    Ok(())
}

/// Returns the number of leaves of a game tree of depth `max_depth`.
fn trace_len(max_depth: u64) -> Result<usize> {
    u32::try_from(max_depth)
        .ok()
        .and_then(|depth| 1usize.checked_shl(depth))
        .ok_or(anyhow!("Max depth {} is too large", max_depth))
}

/// Initializes the tracing subscriber
///
/// # Arguments
/// * `verbosity_level` - The verbosity level (0-4)
///
/// # Returns
/// * `Result<()>` - Ok if successful, Err otherwise.
fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(match verbosity_level {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
