//! The alphabet module contains an implementation of the [FaultGame] trait for the
//! alphabet fault dispute game.

use super::{Claim, ClaimData, FaultGame, Position, Response};
use anyhow::{anyhow, Result};
use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, U256},
    utils::keccak256,
};
use std::sync::Arc;

/// A struct containing information and the world state of an alphabet fault dispute game, as
/// seen by one participant.
#[derive(Debug, Clone)]
pub struct AlphabetGame {
    /// The address of the dispute game contract.
    pub address: Address,
    /// The UNIX timestamp of the game's creation.
    pub created_at: u64,
    /// The current state of the game DAG.
    pub state: Vec<ClaimData>,
    /// Our full execution trace. Its length is `2^max_depth`.
    pub trace: Arc<[u8]>,
    /// The letter preceding the first letter of the trace.
    pub prestate: u8,
    /// The maximum depth of the game tree.
    pub max_depth: u64,
}

impl AlphabetGame {
    /// Creates a new [AlphabetGame] with an empty claim tree.
    pub fn new(
        address: Address,
        created_at: u64,
        trace: Arc<[u8]>,
        prestate: u8,
        max_depth: u64,
    ) -> Self {
        Self {
            address,
            created_at,
            state: Vec::new(),
            trace,
            prestate,
            max_depth,
        }
    }

    /// Returns the state data at `trace_index`: `abi.encode(traceIndex, letter)`.
    pub fn state_data(&self, trace_index: u128) -> Result<Bytes> {
        let letter = self
            .trace
            .get(trace_index as usize)
            .copied()
            .ok_or(anyhow!("Invalid trace index {trace_index}"))?;
        Ok(abi::encode(&[
            Token::Uint(U256::from(trace_index)),
            Token::Uint(U256::from(letter)),
        ])
        .into())
    }

    /// Returns the state data of the absolute prestate: `abi.encode(prestate)`.
    pub fn prestate_data(&self) -> Bytes {
        abi::encode(&[Token::Uint(U256::from(self.prestate))]).into()
    }

    /// Returns true if our trace agrees with the root claim, in which case we play the even
    /// depths of the tree.
    pub fn defending_root(&self) -> Result<bool> {
        let root = self.claim_data(0)?;
        Ok(self.claim_at(root.position)? == root.claim)
    }
}

impl FaultGame<u8> for AlphabetGame {
    fn respond(&self, parent_index: usize) -> Result<Response> {
        let parent = self.claim_data(parent_index)?;

        // Claims at our own depths were made by us, or by someone on our side.
        let defending_root = self.defending_root()?;
        if (parent.position.depth() % 2 == 0) == defending_root {
            return Ok(Response::DoNothing);
        }

        // Attack the claims we disagree with, defend the ones we agree with. The root can only
        // be reached here when we disagree with it.
        let is_attack = self.claim_at(parent.position)? != parent.claim;
        let move_pos = parent.position.make_move(is_attack);

        // If we are past the maximum depth, perform a step.
        // Otherwise, make a move.
        if move_pos.depth() > self.max_depth {
            let trace_index = parent.position.trace_index(self.max_depth);
            let pre_state = if !is_attack {
                self.state_data(trace_index)?
            } else if move_pos.index_at_depth() == 0 {
                self.prestate_data()
            } else {
                self.state_data(trace_index - 1)?
            };

            tracing::debug!(target: "alphabet-solver", "{} step against claim {} at trace index {}", if is_attack { "Attack" } else { "Defense" }, parent_index, trace_index);
            Ok(Response::Step(is_attack, pre_state, Bytes::default()))
        } else {
            Ok(Response::Move(is_attack, self.claim_at(move_pos)?))
        }
    }

    fn claim_data(&self, index: usize) -> Result<&ClaimData> {
        self.state
            .get(index)
            .ok_or(anyhow!("Invalid claim index {index}"))
    }

    fn state_at(&self, position: u128) -> Result<u8> {
        self.trace
            .get(position.trace_index(self.max_depth) as usize)
            .copied()
            .ok_or(anyhow!("Invalid trace index"))
    }

    fn claim_at(&self, position: u128) -> Result<Claim> {
        let state_data = self.state_data(position.trace_index(self.max_depth))?;
        Ok(Claim::from(keccak256(state_data)))
    }

    fn sync(&mut self, claims: Vec<ClaimData>) {
        self.state = claims;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use op_dispute_contracts::AlphabetVm;
    use op_dispute_primitives::{Clock, ROOT_PARENT_INDEX};

    const HONEST: &[u8; 16] = b"abcdefghijklmnop";
    const DISHONEST: &[u8; 16] = b"abcdefghijklmnoz";

    fn game(trace: &[u8]) -> AlphabetGame {
        AlphabetGame::new(Address::zero(), 0, Arc::from(trace), b'a' - 1, 4)
    }

    fn claim(parent_index: u32, position: u128, claim: Claim) -> ClaimData {
        ClaimData {
            parent_index,
            countered: false,
            claim,
            position,
            clock: Clock::default(),
        }
    }

    #[test]
    fn claims_match_the_alphabet_vm() {
        let honest = game(HONEST);
        assert_eq!(honest.claim_at(1).unwrap(), AlphabetVm::claim(15, b'p'));
        assert_eq!(honest.claim_at(2).unwrap(), AlphabetVm::claim(7, b'h'));
        assert_eq!(honest.claim_at(16).unwrap(), AlphabetVm::claim(0, b'a'));
        assert_eq!(honest.state_at(30).unwrap(), b'o');
        assert_eq!(
            honest.prestate_data().to_vec(),
            AlphabetVm::prestate_data(b'a' - 1)
        );
    }

    #[test]
    fn attacks_a_dishonest_root() {
        let mut honest = game(HONEST);
        let dishonest = game(DISHONEST);
        honest.sync(vec![claim(ROOT_PARENT_INDEX, 1, dishonest.claim_at(1).unwrap())]);

        assert!(!honest.defending_root().unwrap());
        assert_eq!(
            honest.respond(0).unwrap(),
            Response::Move(true, AlphabetVm::claim(7, b'h'))
        );
    }

    #[test]
    fn ignores_claims_on_our_side() {
        let mut honest = game(HONEST);
        honest.sync(vec![claim(ROOT_PARENT_INDEX, 1, honest.claim_at(1).unwrap())]);

        assert!(honest.defending_root().unwrap());
        assert_eq!(honest.respond(0).unwrap(), Response::DoNothing);
    }

    #[test]
    fn defends_claims_we_agree_with() {
        let mut honest = game(HONEST);
        let dishonest = game(DISHONEST);
        let root = honest.claim_at(1).unwrap();
        let attack = dishonest.claim_at(2).unwrap();
        honest.sync(vec![claim(ROOT_PARENT_INDEX, 1, root), claim(0, 2, attack)]);

        // The dishonest trace agrees with ours up to trace index 14.
        assert_eq!(
            honest.respond(1).unwrap(),
            Response::Move(false, AlphabetVm::claim(11, b'l'))
        );
    }

    #[test]
    fn steps_at_max_depth() {
        let mut honest = game(HONEST);
        let dishonest = game(DISHONEST);

        // A dishonest root defended down to trace index 14.
        honest.sync(vec![
            claim(ROOT_PARENT_INDEX, 1, dishonest.claim_at(1).unwrap()),
            claim(0, 2, honest.claim_at(2).unwrap()),
            claim(1, 6, dishonest.claim_at(6).unwrap()),
            claim(2, 14, honest.claim_at(14).unwrap()),
            claim(3, 30, dishonest.claim_at(30).unwrap()),
        ]);
        assert_eq!(
            honest.respond(4).unwrap(),
            Response::Step(false, honest.state_data(14).unwrap(), Bytes::default())
        );

        // A wrong claim at the leftmost leaf is attacked from the absolute prestate.
        honest.sync(vec![
            claim(ROOT_PARENT_INDEX, 1, dishonest.claim_at(1).unwrap()),
            claim(0, 2, honest.claim_at(2).unwrap()),
            claim(1, 4, dishonest.claim_at(4).unwrap()),
            claim(2, 8, honest.claim_at(8).unwrap()),
            claim(3, 16, AlphabetVm::claim(0, b'z')),
        ]);
        assert_eq!(
            honest.respond(4).unwrap(),
            Response::Step(true, honest.prestate_data(), Bytes::default())
        );
    }

    #[test]
    fn responses_serialize() {
        let json = serde_json::to_string(&Response::DoNothing).unwrap();
        assert_eq!(json, "\"doNothing\"");
    }
}
