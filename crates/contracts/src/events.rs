//! The `events` module contains the [Event]s emitted by the contracts and their rendering into
//! [Log]s that off-chain watchers filter by topic.

use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, Log, H256, U256},
    utils::keccak256,
};
use op_dispute_primitives::{Claim, GameStatus, GameType};

/// `DisputeGameCreated(address indexed disputeProxy, uint8 indexed gameType, bytes32 indexed rootClaim)`
pub const DISPUTE_GAME_CREATED: &str = "DisputeGameCreated(address,uint8,bytes32)";
/// `ImplementationSet(address indexed impl, uint8 indexed gameType)`
pub const IMPLEMENTATION_SET: &str = "ImplementationSet(address,uint8)";
/// `InitBondUpdated(uint8 indexed gameType, uint256 indexed newBond)`
pub const INIT_BOND_UPDATED: &str = "InitBondUpdated(uint8,uint256)";
/// `OwnershipTransferred(address indexed previousOwner, address indexed newOwner)`
pub const OWNERSHIP_TRANSFERRED: &str = "OwnershipTransferred(address,address)";
/// `Move(uint256 indexed parentIndex, bytes32 indexed claim, address indexed claimant)`
pub const MOVE: &str = "Move(uint256,bytes32,address)";
/// `Resolved(uint8 indexed status)`
pub const RESOLVED: &str = "Resolved(uint8)";
/// `OutputProposed(bytes32 indexed outputRoot, uint256 indexed l1Timestamp, uint256 indexed l2BlockNumber)`
pub const OUTPUT_PROPOSED: &str = "OutputProposed(bytes32,uint256,uint256)";
/// `OutputDeleted(bytes32 indexed outputRoot, uint256 indexed l1Timestamp, uint256 indexed l2BlockNumber)`
pub const OUTPUT_DELETED: &str = "OutputDeleted(bytes32,uint256,uint256)";
/// `Checkpoint(uint256 indexed blockNumber, bytes32 indexed blockHash, uint256 childTimestamp)`
pub const CHECKPOINT: &str = "Checkpoint(uint256,bytes32,uint256)";

/// Computes the first topic of a log from its event signature.
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

/// An event emitted by one of the contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new dispute game was created by the factory.
    DisputeGameCreated {
        /// The address of the game proxy.
        dispute_proxy: Address,
        /// The type of the game.
        game_type: GameType,
        /// The root claim of the game.
        root_claim: Claim,
    },
    /// The implementation of a game type was set.
    ImplementationSet {
        /// The implementation address.
        implementation: Address,
        /// The game type.
        game_type: GameType,
    },
    /// The creation bond of a game type was updated.
    InitBondUpdated {
        /// The game type.
        game_type: GameType,
        /// The new bond.
        bond: U256,
    },
    /// Ownership of a contract changed hands.
    OwnershipTransferred {
        /// The previous owner.
        previous_owner: Address,
        /// The new owner.
        new_owner: Address,
    },
    /// A claim was added to a fault dispute game.
    Move {
        /// The index of the claim that was moved against.
        parent_index: u64,
        /// The new claim.
        claim: Claim,
        /// The account that made the claim.
        claimant: Address,
    },
    /// A fault dispute game was resolved.
    Resolved {
        /// The terminal status of the game.
        status: GameStatus,
    },
    /// An output was proposed to the output oracle.
    OutputProposed {
        /// The proposed output root.
        output_root: H256,
        /// The L1 timestamp of the proposal.
        l1_timestamp: u64,
        /// The L2 block number of the output.
        l2_block_number: u64,
    },
    /// An output was deleted from the output oracle.
    OutputDeleted {
        /// The deleted output root.
        output_root: H256,
        /// The L1 timestamp of the deleted proposal.
        l1_timestamp: u64,
        /// The L2 block number of the deleted output.
        l2_block_number: u64,
    },
    /// A block hash was checkpointed in the block oracle.
    Checkpoint {
        /// The checkpointed block number.
        block_number: u64,
        /// The checkpointed block hash.
        block_hash: H256,
        /// The timestamp recorded for the block.
        timestamp: u64,
    },
}

impl Event {
    /// Returns the canonical signature of the event.
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::DisputeGameCreated { .. } => DISPUTE_GAME_CREATED,
            Self::ImplementationSet { .. } => IMPLEMENTATION_SET,
            Self::InitBondUpdated { .. } => INIT_BOND_UPDATED,
            Self::OwnershipTransferred { .. } => OWNERSHIP_TRANSFERRED,
            Self::Move { .. } => MOVE,
            Self::Resolved { .. } => RESOLVED,
            Self::OutputProposed { .. } => OUTPUT_PROPOSED,
            Self::OutputDeleted { .. } => OUTPUT_DELETED,
            Self::Checkpoint { .. } => CHECKPOINT,
        }
    }

    /// Renders the event as a [Log] emitted by `address`. Indexed fields become topics, the rest
    /// is ABI-encoded into the data field.
    pub fn to_log(&self, address: Address) -> Log {
        let (indexed, data): (Vec<H256>, Vec<Token>) = match *self {
            Self::DisputeGameCreated {
                dispute_proxy,
                game_type,
                root_claim,
            } => (
                vec![address_topic(dispute_proxy), uint_topic(game_type.0), root_claim],
                vec![],
            ),
            Self::ImplementationSet {
                implementation,
                game_type,
            } => (
                vec![address_topic(implementation), uint_topic(game_type.0)],
                vec![],
            ),
            Self::InitBondUpdated { game_type, bond } => {
                (vec![uint_topic(game_type.0), uint_topic(bond)], vec![])
            }
            Self::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => (
                vec![address_topic(previous_owner), address_topic(new_owner)],
                vec![],
            ),
            Self::Move {
                parent_index,
                claim,
                claimant,
            } => (
                vec![uint_topic(parent_index), claim, address_topic(claimant)],
                vec![],
            ),
            Self::Resolved { status } => (vec![uint_topic(status as u8)], vec![]),
            Self::OutputProposed {
                output_root,
                l1_timestamp,
                l2_block_number,
            }
            | Self::OutputDeleted {
                output_root,
                l1_timestamp,
                l2_block_number,
            } => (
                vec![
                    output_root,
                    uint_topic(l1_timestamp),
                    uint_topic(l2_block_number),
                ],
                vec![],
            ),
            Self::Checkpoint {
                block_number,
                block_hash,
                timestamp,
            } => (
                vec![uint_topic(block_number), block_hash],
                vec![Token::Uint(U256::from(timestamp))],
            ),
        };

        let mut topics = Vec::with_capacity(indexed.len() + 1);
        topics.push(event_topic(self.signature()));
        topics.extend(indexed);

        Log {
            address,
            topics,
            data: Bytes::from(abi::encode(&data)),
            ..Default::default()
        }
    }
}

/// Left-pads an address into a topic.
fn address_topic(address: Address) -> H256 {
    H256::from(address)
}

/// Encodes an unsigned integer as a big-endian topic.
fn uint_topic(value: impl Into<U256>) -> H256 {
    let mut topic = [0u8; 32];
    value.into().to_big_endian(&mut topic);
    H256::from(topic)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn game_created_log_layout() {
        let proxy = Address::repeat_byte(0x11);
        let log = Event::DisputeGameCreated {
            dispute_proxy: proxy,
            game_type: GameType(1),
            root_claim: H256::repeat_byte(0xAA),
        }
        .to_log(Address::repeat_byte(0xFA));

        assert_eq!(log.address, Address::repeat_byte(0xFA));
        assert_eq!(log.topics.len(), 4);
        assert_eq!(log.topics[0], event_topic(DISPUTE_GAME_CREATED));
        assert_eq!(Address::from_slice(&log.topics[1][12..]), proxy);
        assert_eq!(log.topics[2][31], 1);
        assert_eq!(log.topics[3], H256::repeat_byte(0xAA));
        assert!(log.data.is_empty());
    }

    #[test]
    fn output_proposed_log_carries_block_number_in_last_topic() {
        let log = Event::OutputProposed {
            output_root: H256::repeat_byte(0x01),
            l1_timestamp: 1_000,
            l2_block_number: 100,
        }
        .to_log(Address::zero());

        assert_eq!(log.topics[0], event_topic(OUTPUT_PROPOSED));
        assert_eq!(log.topics[2].to_low_u64_be(), 1_000);
        assert_eq!(log.topics[3].to_low_u64_be(), 100);
    }

    #[test]
    fn checkpoint_log_encodes_timestamp_as_data() {
        let log = Event::Checkpoint {
            block_number: 9,
            block_hash: H256::repeat_byte(0x09),
            timestamp: 42,
        }
        .to_log(Address::zero());

        assert_eq!(log.topics.len(), 3);
        assert_eq!(U256::from_big_endian(&log.data), U256::from(42));
    }
}
