pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Fractional digits used when an amount enters a digest.
pub const AMOUNT_DECIMALS: usize = 6;
pub const GENESIS_PREVIOUS_HASH: &str = "prokofiev";
pub const GENESIS_PROOF: u64 = 10;
/// A trial hash is accepted once its hex form starts with this prefix.
pub const POW_TARGET_PREFIX: &str = "0000";
