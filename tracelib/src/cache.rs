use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SimulationError};
use crate::replacement_policies::{next_access_time, FirstInFirstOut, LeastRecentlyUsed, ReplacementPolicy};

/// Whether an access reads or writes memory. Only used to split the miss count
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    /// The single character used for this kind in trace files
    pub fn as_char(self) -> char {
        match self {
            AccessKind::Read => 'R',
            AccessKind::Write => 'W',
        }
    }
}

impl FromStr for AccessKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "read" => Ok(AccessKind::Read),
            "w" | "write" => Ok(AccessKind::Write),
            _ => Err(SimulationError::UnknownAccessKind(s.to_string())),
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}

/// Anything which can receive the accesses generated by a program: a cache, or something
/// observing the accesses on their way to one
pub trait AccessSink {
    /// Performs a single access
    ///
    /// # Arguments
    ///
    /// * `address`: The byte address of the access
    /// * `size`: The size of the access in bytes
    /// * `kind`: Read or write
    ///
    /// returns: Result<bool, SimulationError>, true on a cache hit
    fn access(&mut self, address: u64, size: u64, kind: AccessKind) -> Result<bool>;
}

impl<S: AccessSink + ?Sized> AccessSink for &mut S {
    fn access(&mut self, address: u64, size: u64, kind: AccessKind) -> Result<bool> {
        (**self).access(address, size, kind)
    }
}

/// One entry of the occupancy table
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Block {
    pub valid: bool,
    /// The block aligned address of the memory held by this block
    pub tag: u64,
    /// Logical time of the last install (or hit, depending on the policy)
    pub last_access_time: u64,
}

/// Access counters. Invariants: `misses <= accesses` and `read_misses + write_misses == misses`
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub accesses: u64,
    pub misses: u64,
    pub read_misses: u64,
    pub write_misses: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.accesses - self.misses
    }
}

/// A set-associative cache, parameterised by a replacement policy
///
/// An address is split into a block offset (the low `log2(block_size)` bits) and a set index (the
/// next `ceil(log2(num_sets))` bits, reduced modulo `num_sets`). The block aligned address is used
/// as the tag. Accesses which would span two blocks are rejected rather than split
///
/// The occupancy table is stored flat, with the blocks of each set contiguous, so a lookup only
/// ever scans one slice
#[derive(Debug)]
pub struct Cache<R: ReplacementPolicy = LeastRecentlyUsed> {
    num_sets: u64,
    blocks_per_set: u64,
    block_size: u64,
    offset_bits: u32,
    offset_mask: u64,
    set_mask: u64,
    blocks: Vec<Block>,
    replacement_policy: R,
    stats: CacheStats,
}

impl Cache {
    /// Creates a least recently used cache
    ///
    /// # Arguments
    ///
    /// * `num_sets`: The number of sets, positive
    /// * `blocks_per_set`: The associativity, positive
    /// * `block_size`: The block size in bytes, a power of two
    ///
    /// returns: Result<Cache<LeastRecentlyUsed>, SimulationError>
    pub fn new(num_sets: u64, blocks_per_set: u64, block_size: u64) -> Result<Self> {
        Self::with_policy(num_sets, blocks_per_set, block_size, LeastRecentlyUsed)
    }
}

impl<R: ReplacementPolicy> Cache<R> {
    pub fn with_policy(num_sets: u64, blocks_per_set: u64, block_size: u64, policy: R) -> Result<Self> {
        if num_sets == 0 || blocks_per_set == 0 {
            return Err(SimulationError::InvalidGeometry(format!(
                "a cache needs at least one set and one block per set, got {num_sets} sets of {blocks_per_set}"
            )));
        }
        if !block_size.is_power_of_two() {
            return Err(SimulationError::InvalidGeometry(format!("block size {block_size} is not a power of two")));
        }
        let block_count = num_sets.checked_mul(blocks_per_set)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| SimulationError::InvalidGeometry(format!("{num_sets} sets of {blocks_per_set} blocks is too large")))?;
        let offset_bits = block_size.trailing_zeros();
        // ceil(log2), a set count which isn't a power of two gets enough bits and relies on the modulo
        let set_bits = num_sets.checked_next_power_of_two()
            .ok_or_else(|| SimulationError::InvalidGeometry(format!("{num_sets} sets is too large")))?
            .trailing_zeros();
        if !num_sets.is_power_of_two() {
            warn!("{num_sets} sets is not a power of two, set indices are reduced modulo the set count");
        }
        debug!("Creating cache: {num_sets} sets of {blocks_per_set} blocks of {block_size} bytes");
        Ok(Self {
            num_sets,
            blocks_per_set,
            block_size,
            offset_bits,
            offset_mask: block_size - 1,
            set_mask: ((1u64 << set_bits) - 1) << offset_bits,
            blocks: vec![Block::default(); block_count],
            replacement_policy: policy,
            stats: CacheStats::default(),
        })
    }

    /// Splits an address into its set index and its offset within the block
    pub fn decompose(&self, address: u64) -> (usize, u64) {
        let set = ((address & self.set_mask) >> self.offset_bits) % self.num_sets;
        (set as usize, address & self.offset_mask)
    }

    fn set_range(&self, set: usize) -> Range<usize> {
        let lower = set * self.blocks_per_set as usize;
        lower..lower + self.blocks_per_set as usize
    }

    /// The blocks of one set, for inspection
    pub fn set(&self, set: usize) -> &[Block] {
        &self.blocks[self.set_range(set)]
    }

    /// Whether the block holding `address` is currently resident
    pub fn contains(&self, address: u64) -> bool {
        let (set, offset) = self.decompose(address);
        let tag = address - offset;
        self.set(set).iter().any(|block| block.valid && block.tag == tag)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Clears the counters, keeping the cache contents
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Gets the number of blocks never filled. Useful for analysing cache performance or debugging
    pub fn invalid_block_count(&self) -> usize {
        self.blocks.iter().filter(|block| !block.valid).count()
    }

    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    pub fn blocks_per_set(&self) -> u64 {
        self.blocks_per_set
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }
}

impl<R: ReplacementPolicy> AccessSink for Cache<R> {
    fn access(&mut self, address: u64, size: u64, kind: AccessKind) -> Result<bool> {
        self.stats.accesses += 1;
        let (set_index, offset) = self.decompose(address);
        if offset.saturating_add(size) > self.block_size {
            return Err(SimulationError::SpanningAccess { address, size, block_size: self.block_size });
        }
        let tag = address - offset;
        let range = self.set_range(set_index);
        let set = &mut self.blocks[range];
        if let Some(way) = set.iter().position(|block| block.valid && block.tag == tag) {
            self.replacement_policy.update_on_hit(set, way);
            trace!("{kind} {address:#x}: hit in set {set_index}, way {way}");
            return Ok(true);
        }
        self.stats.misses += 1;
        match kind {
            AccessKind::Read => self.stats.read_misses += 1,
            AccessKind::Write => self.stats.write_misses += 1,
        }
        let victim = self.replacement_policy.choose_victim(set);
        let last_access_time = next_access_time(set);
        trace!("{kind} {address:#x}: miss in set {set_index}, replacing way {victim}");
        set[victim] = Block { valid: true, tag, last_access_time };
        Ok(false)
    }
}

impl<R: ReplacementPolicy> fmt::Display for Cache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache: {} sets of {} blocks of size {} and miss rate {}/{}",
            self.num_sets, self.blocks_per_set, self.block_size, self.stats.misses, self.stats.accesses
        )
    }
}

/// Enum for the caches a configuration can produce
///
/// Explicitly branching on each implementation keeps the concrete types visible to the compiler,
/// so the policy calls are inlined rather than going through a trait object on every access
#[derive(Debug)]
pub enum GenericCache {
    LeastRecentlyUsed(Cache<LeastRecentlyUsed>),
    FirstInFirstOut(Cache<FirstInFirstOut>),
}

impl From<Cache<LeastRecentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastRecentlyUsed>) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<Cache<FirstInFirstOut>> for GenericCache {
    fn from(value: Cache<FirstInFirstOut>) -> Self {
        Self::FirstInFirstOut(value)
    }
}

impl GenericCache {
    pub fn stats(&self) -> CacheStats {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.stats(),
            GenericCache::FirstInFirstOut(c) => c.stats(),
        }
    }

    pub fn reset_stats(&mut self) {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.reset_stats(),
            GenericCache::FirstInFirstOut(c) => c.reset_stats(),
        }
    }

    pub fn contains(&self, address: u64) -> bool {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.contains(address),
            GenericCache::FirstInFirstOut(c) => c.contains(address),
        }
    }

    pub fn invalid_block_count(&self) -> usize {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.invalid_block_count(),
            GenericCache::FirstInFirstOut(c) => c.invalid_block_count(),
        }
    }
}

impl AccessSink for GenericCache {
    fn access(&mut self, address: u64, size: u64, kind: AccessKind) -> Result<bool> {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.access(address, size, kind),
            GenericCache::FirstInFirstOut(c) => c.access(address, size, kind),
        }
    }
}

impl fmt::Display for GenericCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericCache::LeastRecentlyUsed(c) => fmt::Display::fmt(c, f),
            GenericCache::FirstInFirstOut(c) => fmt::Display::fmt(c, f),
        }
    }
}
