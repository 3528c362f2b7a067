//! The `types` module contains the calls that drivers prepare and the dispatch driver submits.

use ethers::types::{Address, Bytes, H256, U256};
use op_dispute_primitives::{Claim, GameType};
use serde::Serialize;

/// A [Transaction] is a state-mutating call against one of the devnet contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transaction {
    /// Propose an output root to the output oracle.
    #[serde(rename_all = "camelCase")]
    ProposeOutput {
        /// The proposed output root.
        output_root: H256,
        /// The L2 block the output commits to.
        l2_block_number: u64,
    },
    /// Create a dispute game through the factory.
    #[serde(rename_all = "camelCase")]
    CreateGame {
        /// The type of the game.
        game_type: GameType,
        /// The root claim of the game.
        root_claim: Claim,
        /// The extra data of the game.
        extra_data: Bytes,
    },
    /// Attack or defend a claim.
    #[serde(rename_all = "camelCase")]
    Move {
        /// The game proxy.
        game: Address,
        /// The index of the challenged claim.
        parent_index: usize,
        /// The new claim.
        claim: Claim,
        /// Whether the move is an attack.
        is_attack: bool,
    },
    /// Step against a leaf claim.
    #[serde(rename_all = "camelCase")]
    Step {
        /// The game proxy.
        game: Address,
        /// The index of the claim being stepped against.
        claim_index: usize,
        /// Whether the step is an attack.
        is_attack: bool,
        /// The pre-state preimage.
        state_data: Bytes,
        /// The VM proof.
        proof: Bytes,
    },
    /// Resolve the subgame rooted at a claim.
    #[serde(rename_all = "camelCase")]
    ResolveClaim {
        /// The game proxy.
        game: Address,
        /// The index of the claim.
        claim_index: usize,
    },
}

/// The [PreparedCall] type is a [Transaction] signed off by the account sending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCall {
    /// The sender.
    pub from: Address,
    /// The value attached to the call.
    pub value: U256,
    /// The call itself.
    pub tx: Transaction,
}

impl PreparedCall {
    /// Prepares a call with no value attached.
    pub fn new(from: Address, tx: Transaction) -> Self {
        Self {
            from,
            value: U256::zero(),
            tx,
        }
    }

    /// Attaches `value` to the call.
    pub fn with_value(self, value: U256) -> Self {
        Self { value, ..self }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn calls_serialize_with_tagged_camel_case_transactions() {
        let from = Address::repeat_byte(0xAA);
        let game = Address::repeat_byte(0x77);
        let call = PreparedCall::new(
            from,
            Transaction::ResolveClaim {
                game,
                claim_index: 3,
            },
        );

        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["from"], serde_json::to_value(from).unwrap());
        assert_eq!(
            value["tx"],
            json!({
                "type": "resolveClaim",
                "game": serde_json::to_value(game).unwrap(),
                "claimIndex": 3,
            })
        );

        let value = serde_json::to_value(Transaction::ProposeOutput {
            output_root: H256::zero(),
            l2_block_number: 100,
        })
        .unwrap();
        assert_eq!(value["type"], "proposeOutput");
        assert_eq!(value["l2BlockNumber"], 100);
    }
}
