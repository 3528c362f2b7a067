//! The `preimage` module contains the [MemoryPreimageOracle] and the preimage key derivation.

use crate::{traits::PreimageOracle, ErrorKind};
use ethers::{
    types::{Address, H256},
    utils::keccak256,
};
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};
use thiserror::Error;

/// The type byte of local preimage keys.
pub const LOCAL_KEY_TYPE: u8 = 1;
/// The type byte of global keccak256 preimage keys.
pub const KECCAK256_KEY_TYPE: u8 = 2;

/// An error returned by a [PreimageOracle].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreimageOracleError {
    /// The part offset lies beyond the length-prefixed preimage, or the local word is larger
    /// than 32 bytes. Validation.
    #[error("Part offset {offset} out of bounds for a preimage of {size} bytes")]
    PartOffsetOob {
        /// The requested offset.
        offset: u64,
        /// The size of the preimage.
        size: u64,
    },
    /// No part is stored at the given key and offset. External.
    #[error("Missing preimage for key {key:?} at offset {offset}")]
    MissingPreimage {
        /// The preimage key.
        key: H256,
        /// The requested offset.
        offset: u64,
    },
}

impl PreimageOracleError {
    /// Returns the taxonomy kind of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PartOffsetOob { .. } => ErrorKind::Validation,
            Self::MissingPreimage { .. } => ErrorKind::External,
        }
    }
}

/// Derives the key of a local preimage, binding `ident` to the `caller` that loaded it and the
/// `local_context` it was loaded for.
///
/// The key is `keccak256(localKey(ident) ++ pad32(caller) ++ local_context)` with the high-order
/// byte replaced by [LOCAL_KEY_TYPE].
pub fn localize_ident(ident: u64, caller: Address, local_context: H256) -> H256 {
    let mut preimage = [0u8; 96];
    preimage[0] = LOCAL_KEY_TYPE;
    preimage[24..32].copy_from_slice(&ident.to_be_bytes());
    preimage[44..64].copy_from_slice(caller.as_bytes());
    preimage[64..].copy_from_slice(local_context.as_bytes());

    let mut key = keccak256(preimage);
    key[0] = LOCAL_KEY_TYPE;
    H256::from(key)
}

/// Derives the global key of a keccak256 preimage.
pub fn keccak256_key(preimage: &[u8]) -> H256 {
    let mut key = keccak256(preimage);
    key[0] = KECCAK256_KEY_TYPE;
    H256::from(key)
}

/// Slices the 32-byte part at `offset` out of the length-prefixed preimage.
fn part_at(size: u64, data: &[u8], offset: u64) -> Result<H256, PreimageOracleError> {
    if offset >= size + 8 {
        return Err(PreimageOracleError::PartOffsetOob { offset, size });
    }

    let mut prefixed = Vec::with_capacity(8 + data.len() + 32);
    prefixed.extend_from_slice(&size.to_be_bytes());
    prefixed.extend_from_slice(data);
    prefixed.resize(8 + data.len() + 32, 0);

    let start = offset as usize;
    Ok(H256::from_slice(&prefixed[start..start + 32]))
}

#[derive(Debug, Default)]
struct PreimageStore {
    lengths: HashMap<H256, u64>,
    parts: HashMap<(H256, u64), H256>,
}

impl PreimageStore {
    fn insert(&mut self, key: H256, size: u64, offset: u64, part: H256) {
        self.lengths.insert(key, size);
        self.parts.insert((key, offset), part);
    }
}

/// An in-memory [PreimageOracle].
#[derive(Debug, Default)]
pub struct MemoryPreimageOracle {
    store: RwLock<PreimageStore>,
}

impl MemoryPreimageOracle {
    /// Creates an empty [MemoryPreimageOracle].
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the part of a global keccak256 preimage at `part_offset`.
    pub fn load_keccak256_preimage_part(
        &self,
        part_offset: u64,
        preimage: &[u8],
    ) -> Result<H256, PreimageOracleError> {
        let key = keccak256_key(preimage);
        let size = preimage.len() as u64;
        let part = part_at(size, preimage, part_offset)?;

        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, size, part_offset, part);
        Ok(key)
    }

    /// Returns the length of the preimage stored under `key`, if any part of it is known.
    pub fn preimage_length(&self, key: H256) -> Option<u64> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lengths
            .get(&key)
            .copied()
    }
}

impl PreimageOracle for MemoryPreimageOracle {
    fn load_local_data(
        &self,
        caller: Address,
        ident: u64,
        local_context: H256,
        word: H256,
        size: u64,
        part_offset: u64,
    ) -> Result<H256, PreimageOracleError> {
        if size > 32 {
            return Err(PreimageOracleError::PartOffsetOob {
                offset: part_offset,
                size,
            });
        }

        let key = localize_ident(ident, caller, local_context);
        let part = part_at(size, word.as_bytes(), part_offset)?;

        tracing::trace!(target: "preimage-oracle", "Loaded local data ident {} under key {:?}", ident, key);
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, size, part_offset, part);
        Ok(key)
    }

    fn read_preimage(&self, key: H256, offset: u64) -> Result<(H256, u64), PreimageOracleError> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let part = store
            .parts
            .get(&(key, offset))
            .copied()
            .ok_or(PreimageOracleError::MissingPreimage { key, offset })?;
        let length = store.lengths.get(&key).copied().unwrap_or_default();

        let data_len = if offset + 32 >= length + 8 {
            (length + 8).saturating_sub(offset)
        } else {
            32
        };
        Ok((part, data_len))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_keys_are_namespaced_by_caller_and_context() {
        let context = H256::repeat_byte(0x01);
        let a = localize_ident(1, Address::repeat_byte(0xAA), context);
        let b = localize_ident(1, Address::repeat_byte(0xBB), context);
        let c = localize_ident(1, Address::repeat_byte(0xAA), H256::repeat_byte(0x02));
        let d = localize_ident(2, Address::repeat_byte(0xAA), context);

        assert_eq!(a[0], LOCAL_KEY_TYPE);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn local_data_is_length_prefixed() {
        let oracle = MemoryPreimageOracle::new();
        let word = H256::repeat_byte(0x42);
        let key = oracle
            .load_local_data(Address::zero(), 2, H256::zero(), word, 32, 0)
            .unwrap();

        let (part, len) = oracle.read_preimage(key, 0).unwrap();
        assert_eq!(len, 32);
        assert_eq!(&part[..8], &32u64.to_be_bytes());
        assert_eq!(&part[8..], &[0x42; 24]);

        let key = oracle
            .load_local_data(Address::zero(), 2, H256::zero(), word, 32, 8)
            .unwrap();
        assert_eq!(oracle.read_preimage(key, 8).unwrap(), (word, 32));
        assert_eq!(oracle.preimage_length(key), Some(32));
    }

    #[test]
    fn local_data_rejects_out_of_bounds_offsets() {
        let oracle = MemoryPreimageOracle::new();
        let err = oracle
            .load_local_data(Address::zero(), 1, H256::zero(), H256::zero(), 32, 40)
            .unwrap_err();
        assert_eq!(err, PreimageOracleError::PartOffsetOob { offset: 40, size: 32 });

        let err = oracle
            .load_local_data(Address::zero(), 1, H256::zero(), H256::zero(), 33, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn keccak_parts_report_trailing_length() {
        let oracle = MemoryPreimageOracle::new();
        let preimage = b"hello world";
        let key = oracle.load_keccak256_preimage_part(16, preimage).unwrap();

        assert_eq!(key[0], KECCAK256_KEY_TYPE);
        let (part, len) = oracle.read_preimage(key, 16).unwrap();
        assert_eq!(len, 3);
        assert_eq!(&part[..3], b"rld");
        assert!(matches!(
            oracle.read_preimage(key, 0),
            Err(PreimageOracleError::MissingPreimage { offset: 0, .. })
        ));
    }
}
