//! Hash partitioning of identifiers into pages

/// Hash identifier bytes to a u64
pub fn key_hash_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

/// Page owning `hash` when the collection is split into `total` pages
///
/// `total` must be at least 1.
pub fn page_of(hash: u64, total: u64) -> u64 {
    hash % total
}
