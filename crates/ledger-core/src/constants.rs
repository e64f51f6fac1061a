pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_INDEX: u64 = 1;
pub const GENESIS_PROOF: u64 = 1;
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// Leading `'0'` hex characters a proof digest must start with.
pub const POW_TARGET_DIFFICULTY: usize = 4;
