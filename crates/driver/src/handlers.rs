//! The `handlers` module contains the per-event logic the drivers run.

use crate::{
    devnet::{DISPUTE_GAME_FACTORY, OUTPUT_ORACLE},
    state::TrackedGame,
    types::{PreparedCall, Transaction},
    DriverConfig,
};
use anyhow::{anyhow, Result};
use ethers::{
    abi::{self, Token},
    types::{Address, Log, U256},
};
use op_dispute_contracts::events::{event_topic, DISPUTE_GAME_CREATED, OUTPUT_PROPOSED};
use op_dispute_primitives::GameType;
use op_dispute_solvers::fault::{AlphabetGame, FaultGame, Response};
use std::sync::Arc;

/// Returns the logs emitted by `address` with the event `signature` since `cursor`, and advances
/// the cursor past every log seen.
pub async fn poll_logs(
    config: &DriverConfig,
    cursor: &mut usize,
    address: Address,
    signature: &str,
) -> Vec<Log> {
    let logs = config.devnet.lock().await.logs_from(*cursor);
    *cursor += logs.len();

    let topic = event_topic(signature);
    logs.into_iter()
        .filter(|log| log.address == address && log.topics.first() == Some(&topic))
        .collect()
}

/// Returns the new `OutputProposed` logs of the output oracle.
pub async fn poll_output_proposals(config: &DriverConfig, cursor: &mut usize) -> Vec<Log> {
    poll_logs(config, cursor, OUTPUT_ORACLE, OUTPUT_PROPOSED).await
}

/// Returns the new `DisputeGameCreated` logs of the factory.
pub async fn poll_created_games(config: &DriverConfig, cursor: &mut usize) -> Vec<Log> {
    poll_logs(config, cursor, DISPUTE_GAME_FACTORY, DISPUTE_GAME_CREATED).await
}

/// Handles the `OutputProposed` event emitted by the output oracle. The proposed root is compared
/// against the agent's trusted output for the block; on a mismatch the agent creates an alphabet
/// game rooted at its own claim, unless it already did or the game exists.
pub async fn output_proposed(config: Arc<DriverConfig>, output_proposed: &Log) -> Result<()> {
    let proposed_root = *output_proposed.topics.get(1).ok_or(anyhow!(
        "Critical failure: Output Root topic not present in `OutputProposed` event."
    ))?;
    // Convert the H256 representing the l2 block number into a u64.
    let proposed_block = output_proposed
        .topics
        .get(3)
        .ok_or(anyhow!(
            "Critical failure: L2 Block Number topic not present in `OutputProposed` event."
        ))?
        .to_low_u64_be();

    let Some(trusted_root) = config.trusted_outputs.get(&proposed_block) else {
        tracing::debug!(target: "output-proposal-driver", "No trusted output for L2 block #{}, skipping.", proposed_block);
        return Ok(());
    };
    if *trusted_root == proposed_root {
        tracing::debug!(target: "output-proposal-driver", "Output proposed on L1 for L2 block #{} matches the trusted output.", proposed_block);
        return Ok(());
    }
    tracing::warn!(target: "output-proposal-driver", "Output proposed for L2 block #{} does not match the trusted output. L1: {:?}, trusted: {:?}", proposed_block, proposed_root, trusted_root);

    let extra_data = abi::encode(&[Token::Uint(U256::from(proposed_block))]);
    let (root_claim, bond, exists) = {
        let devnet = config.devnet.lock().await;
        let solver = AlphabetGame::new(
            Address::zero(),
            0,
            Arc::clone(&config.trace),
            config.prestate,
            devnet.config().max_game_depth,
        );
        let root_claim = solver.claim_at(1)?;
        let factory = devnet.factory();
        (
            root_claim,
            factory.init_bonds(GameType::ALPHABET),
            factory
                .games(GameType::ALPHABET, root_claim, &extra_data)
                .is_some(),
        )
    };

    // If a challenge was already sent or the game exists, the `DisputeFactoryDriver` picks the
    // game up from the creation log.
    let mut state = config.state.lock().await;
    if exists || !state.pending_challenges.insert(proposed_block) {
        tracing::debug!(target: "output-proposal-driver", "Challenge for L2 block #{} already submitted.", proposed_block);
        return Ok(());
    }
    drop(state);

    tracing::info!(target: "output-proposal-driver", "Challenging output at L2 block #{} with root claim {:?}", proposed_block, root_claim);
    config
        .tx_sender
        .send(
            PreparedCall::new(
                config.actor,
                Transaction::CreateGame {
                    game_type: GameType::ALPHABET,
                    root_claim,
                    extra_data: extra_data.into(),
                },
            )
            .with_value(bond),
        )
        .await?;
    Ok(())
}

/// Handles the `DisputeGameCreated` event emitted by the factory. Alphabet games are tracked so
/// that the `FaultGameDriver` plays them.
pub async fn dispute_game_created(config: Arc<DriverConfig>, dispute_game_created: &Log) -> Result<()> {
    // The address of the created dispute game proxy.
    let game_addr = Address::from_slice(
        &dispute_game_created.topics.get(1).ok_or(anyhow!(
            "Critical failure: `disputeProxy` field not present in `DisputeGameCreated` event."
        ))?[12..],
    );
    // A [GameType] will always be a u8, so we can safely index the last byte in the topic.
    let game_type = GameType(
        dispute_game_created.topics.get(2).ok_or(anyhow!(
            "Critical failure: `gameType` field not present in `DisputeGameCreated` event."
        ))?[31],
    );

    if game_type != GameType::ALPHABET {
        tracing::error!(target: "dispute-factory-driver", "DisputeGameCreated event contained an unsupported game type: {}", game_type);
        return Ok(());
    }

    let solver = {
        let devnet = config.devnet.lock().await;
        let game = devnet.game(game_addr)?;
        AlphabetGame::new(
            game_addr,
            game.created_at(),
            Arc::clone(&config.trace),
            config.prestate,
            game.config().max_game_depth,
        )
    };

    let mut state = config.state.lock().await;
    if !state.games.contains_key(&game_addr) {
        tracing::info!(target: "dispute-factory-driver", "Tracking alphabet game {:?}", game_addr);
        state.games.insert(game_addr, TrackedGame::new(solver));
    }
    Ok(())
}

/// Syncs the claim tree of a tracked game, responds to every claim not seen before and asks for
/// resolution once every clock has run out.
pub async fn advance_game(config: Arc<DriverConfig>, game_addr: Address) -> Result<()> {
    let (claims, status, now, half_duration) = {
        let devnet = config.devnet.lock().await;
        let game = devnet.game(game_addr)?;
        (
            game.claims().to_vec(),
            game.status(),
            devnet.timestamp(),
            game.config().game_duration / 2,
        )
    };

    let mut calls = Vec::new();
    {
        let mut state = config.state.lock().await;
        let tracked = state
            .games
            .get_mut(&game_addr)
            .ok_or(anyhow!("Game {:?} is not tracked", game_addr))?;
        tracked.status = status;
        if status.is_resolved() {
            tracing::info!(target: "fault-game-driver", "Game {:?} resolved: {}", game_addr, status);
            return Ok(());
        }

        tracked.solver.sync(claims);
        let claims = &tracked.solver.state;
        for index in 0..claims.len() {
            if tracked.responded.contains(&index) {
                continue;
            }

            let tx = match tracked.solver.respond(index)? {
                Response::DoNothing => None,
                Response::Move(is_attack, claim) => Some(Transaction::Move {
                    game: game_addr,
                    parent_index: index,
                    claim,
                    is_attack,
                }),
                Response::Step(is_attack, state_data, proof) => Some(Transaction::Step {
                    game: game_addr,
                    claim_index: index,
                    is_attack,
                    state_data,
                    proof,
                }),
            };
            if let Some(tx) = tx {
                tracing::debug!(target: "fault-game-driver", "Responding to claim {} in game {:?}", index, game_addr);
                calls.push(PreparedCall::new(config.actor, tx));
            }
            tracked.responded.insert(index);
        }

        let expired = claims
            .iter()
            .all(|claim| claim.clock.elapsed_at(now) >= half_duration);
        if expired && !tracked.resolution_requested {
            tracing::info!(target: "fault-game-driver", "Clocks expired in game {:?}, resolving.", game_addr);
            tracked.resolution_requested = true;
            calls.push(PreparedCall::new(
                config.actor,
                Transaction::ResolveClaim {
                    game: game_addr,
                    claim_index: 0,
                },
            ));
        }
    }

    for call in calls {
        config.tx_sender.send(call).await?;
    }
    Ok(())
}
