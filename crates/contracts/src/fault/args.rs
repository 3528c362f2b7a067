use super::FaultGameError;
use ethers::{
    abi::{self, ParamType, Token},
    types::{Address, Bytes, H256, U256},
};
use op_dispute_primitives::{Claim, GameType};

/// The arguments a game proxy is created with. They are fixed for the lifetime of the game and
/// travel from the factory to the proxy ABI-encoded as
/// `(uint8 gameType, bytes32 rootClaim, address creator, bytes extraData, bytes32 parentHash)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmutableArgs {
    /// The type of the game.
    pub game_type: GameType,
    /// The claim the game disputes.
    pub root_claim: Claim,
    /// The account that created the game.
    pub creator: Address,
    /// Opaque extra data; for fault games, the big-endian L2 block number.
    pub extra_data: Bytes,
    /// The hash of the L1 block preceding the creation block.
    pub parent_block_hash: H256,
}

impl ImmutableArgs {
    const PARAMS: [ParamType; 5] = [
        ParamType::Uint(8),
        ParamType::FixedBytes(32),
        ParamType::Address,
        ParamType::Bytes,
        ParamType::FixedBytes(32),
    ];

    /// ABI-encodes the arguments.
    pub fn abi_encode(&self) -> Vec<u8> {
        abi::encode(&[
            Token::Uint(U256::from(self.game_type.0)),
            Token::FixedBytes(self.root_claim.as_bytes().to_vec()),
            Token::Address(self.creator),
            Token::Bytes(self.extra_data.to_vec()),
            Token::FixedBytes(self.parent_block_hash.as_bytes().to_vec()),
        ])
    }

    /// Decodes arguments produced by [ImmutableArgs::abi_encode].
    pub fn abi_decode(data: &[u8]) -> Result<Self, FaultGameError> {
        let tokens = abi::decode(&Self::PARAMS, data)
            .map_err(|e| FaultGameError::InvalidImmutableArgs(e.to_string()))?;

        let [game_type, root_claim, creator, extra_data, parent_block_hash]: [Token; 5] = tokens
            .try_into()
            .map_err(|_| FaultGameError::InvalidImmutableArgs("unexpected arity".to_string()))?;

        let game_type = game_type
            .into_uint()
            .filter(|t| t.bits() <= 8)
            .ok_or_else(|| invalid("gameType"))?;
        let creator = creator.into_address().ok_or_else(|| invalid("creator"))?;
        let extra_data = extra_data.into_bytes().ok_or_else(|| invalid("extraData"))?;

        Ok(Self {
            game_type: GameType(game_type.low_u32() as u8),
            root_claim: word(root_claim).ok_or_else(|| invalid("rootClaim"))?,
            creator,
            extra_data: Bytes::from(extra_data),
            parent_block_hash: word(parent_block_hash).ok_or_else(|| invalid("parentHash"))?,
        })
    }
}

fn invalid(field: &str) -> FaultGameError {
    FaultGameError::InvalidImmutableArgs(format!("unexpected token for `{field}`"))
}

fn word(token: Token) -> Option<H256> {
    token
        .into_fixed_bytes()
        .filter(|b| b.len() == 32)
        .map(|b| H256::from_slice(&b))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_what_the_factory_encodes() {
        let args = ImmutableArgs {
            game_type: GameType::ALPHABET,
            root_claim: H256::repeat_byte(0xAA),
            creator: Address::repeat_byte(0x11),
            extra_data: Bytes::from(vec![0x00, 0x64]),
            parent_block_hash: H256::repeat_byte(0x22),
        };
        assert_eq!(ImmutableArgs::abi_decode(&args.abi_encode()).unwrap(), args);
    }

    #[test]
    fn rejects_truncated_args() {
        assert!(matches!(
            ImmutableArgs::abi_decode(&[0u8; 40]),
            Err(FaultGameError::InvalidImmutableArgs(_))
        ));
    }
}
