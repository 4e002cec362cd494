//! Integer sequence hashing used to fingerprint structural paths.

use crc32fast::Hasher;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u32 = 0;

/// Hash a slice of small integers.
///
/// The empty sequence hashes to `seed`. Every element is fed to a CRC32
/// initialised with the seed, so the result depends on both the values and
/// the length of the sequence.
pub fn hash_int_array(values: &[u32], seed: u32) -> u32 {
    hash_ints(values.iter().copied(), seed)
}

/// Same as [`hash_int_array`], over any iterator of integers.
pub fn hash_ints<I>(values: I, seed: u32) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let mut values = values.into_iter().peekable();
    if values.peek().is_none() {
        return seed;
    }

    let mut hasher = Hasher::new_with_initial(seed);
    for value in values {
        hasher.update(&value.to_le_bytes());
    }
    hasher.finalize()
}
