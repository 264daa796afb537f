use crate::cache::Block;

/// A generic trait for implementing new replacement policies. Can be used to parameterise a Cache.
///
/// Recency is tracked with a logical clock kept in each block's `last_access_time`: a block
/// installed on a miss is stamped with one more than the newest time in its set. Policies decide
/// what a hit does to that clock, and which block a miss evicts
pub trait ReplacementPolicy {
    /// Updates the policy when a resident block is accessed
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    ///
    /// # Arguments
    ///
    /// * `set`: The blocks of the set which was hit
    /// * `way`: The index of the hit block within the set
    ///
    /// returns: ()
    fn update_on_hit(&mut self, _set: &mut [Block], _way: usize) {}

    /// Used by the cache to pick the block to replace when a new block needs added to a set
    ///
    /// The default prefers the first invalid block, and otherwise evicts the block with the
    /// oldest `last_access_time`, taking the lowest index on ties
    ///
    /// # Arguments
    ///
    /// * `set`: The blocks of the set, never empty
    ///
    /// returns: usize, the index of the victim within the set
    fn choose_victim(&mut self, set: &[Block]) -> usize {
        if let Some(empty) = set.iter().position(|block| !block.valid) {
            return empty;
        }
        let mut min_index = 0;
        let mut min_value = u64::MAX;
        for (index, block) in set.iter().enumerate() {
            // Strictly less, so the first of several equally old blocks wins
            if block.last_access_time < min_value {
                min_value = block.last_access_time;
                min_index = index;
            }
        }
        min_index
    }
}

/// The next value of a set's logical clock
pub(crate) fn next_access_time(set: &[Block]) -> u64 {
    set.iter().map(|block| block.last_access_time).max().unwrap_or(0) + 1
}

/// Least Recently Used replacement policy
///
/// A hit moves the block to the front of the clock, so eviction always takes the block that has
/// gone longest without being touched
#[derive(Debug, Default, Copy, Clone)]
pub struct LeastRecentlyUsed;

impl ReplacementPolicy for LeastRecentlyUsed {
    fn update_on_hit(&mut self, set: &mut [Block], way: usize) {
        let time = next_access_time(set);
        set[way].last_access_time = time;
    }
}

/// First In First Out replacement policy
///
/// Hits leave the clock untouched, so blocks are evicted in the order they were installed
#[derive(Debug, Default, Copy, Clone)]
pub struct FirstInFirstOut;

impl ReplacementPolicy for FirstInFirstOut {}
