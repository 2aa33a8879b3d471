use std::{fmt, iter, ops::Range};

use serde::Serialize;
use tracing::trace;

use crate::{
    error::{ConfigError, Error, Result},
    replace::{lru::LruOrder, AccessResult},
};

/// Width of a simulated address.
pub const ADDR_BITS: u32 = u64::BITS;

/// Cache shape, fixed for one simulation run.
///
/// `set_bits` (s) and `block_bits` (b) carve an address into
/// `tag | set index | block offset`; `ways` (E) is the number of lines per
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub set_bits: u32,
    pub block_bits: u32,
    pub ways: usize,
}

impl Geometry {
    pub fn new(set_bits: u32, block_bits: u32, ways: usize) -> Result<Self, ConfigError> {
        if set_bits == 0 {
            return Err(ConfigError::NotPositive { flag: "-s" });
        }
        if ways == 0 {
            return Err(ConfigError::NotPositive { flag: "-E" });
        }
        if block_bits == 0 {
            return Err(ConfigError::NotPositive { flag: "-b" });
        }
        if set_bits.saturating_add(block_bits) > ADDR_BITS {
            return Err(ConfigError::AddressTooNarrow {
                s: set_bits,
                b: block_bits,
                width: ADDR_BITS,
            });
        }
        Ok(Geometry {
            set_bits,
            block_bits,
            ways,
        })
    }

    /// S = 2^s
    pub fn n_sets(&self) -> u64 {
        1 << self.set_bits
    }

    /// B = 2^b
    pub fn block_size(&self) -> u64 {
        1 << self.block_bits
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s={} E={} b={} ({} sets, {} lines/set, {}-byte blocks)",
            self.set_bits,
            self.ways,
            self.block_bits,
            self.n_sets(),
            self.ways,
            self.block_size()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: u64,
    pub set: usize,
    pub tag: u64,
}

#[derive(Debug)]
struct BitSection {
    shift: u32,
    mask: u64,
}

impl BitSection {
    fn apply(&self, num: u64) -> u64 {
        // A tag section may start at bit 64, leaving nothing to extract.
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }
}

/// Hit/miss/eviction counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Stats {
    pub fn record(&mut self, result: AccessResult) {
        match result {
            AccessResult::Hit => self.hits += 1,
            AccessResult::Miss => self.misses += 1,
            AccessResult::MissEvict => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            total => self.misses as f64 / total as f64,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Line {
    pub valid: bool,
    pub tag: u64,
}

impl Line {
    fn holds(&self, tag: u64) -> bool {
        self.valid && self.tag == tag
    }

    fn apply(&mut self, tag: u64) {
        self.valid = true;
        self.tag = tag;
    }
}

/// Tag-only model of a set-associative LRU cache.
///
/// Lines are stored flat, `n_ways` per set; each set keeps its own recency
/// order over the ways it has filled. Storage is released when the cache is
/// dropped.
#[derive(Debug)]
pub struct Cache {
    geometry: Geometry,
    lines: Vec<Line>,
    set_data: Vec<LruOrder>,
    n_ways: usize,
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
    stats: Stats,
}

impl Cache {
    pub fn new(geometry: Geometry) -> Result<Self> {
        let alloc_err = || Error::Allocation {
            sets: geometry.n_sets(),
            ways: geometry.ways,
        };

        let n_ways = geometry.ways;
        let n_sets = usize::try_from(geometry.n_sets()).map_err(|_| alloc_err())?;
        let n_lines = n_sets.checked_mul(n_ways).ok_or_else(alloc_err)?;

        let mut lines = Vec::new();
        lines.try_reserve_exact(n_lines).map_err(|_| alloc_err())?;
        lines.extend(iter::repeat(Line::default()).take(n_lines));

        let mut set_data = Vec::new();
        set_data.try_reserve_exact(n_sets).map_err(|_| alloc_err())?;
        for _ in 0..n_sets {
            set_data.push(LruOrder::with_capacity(n_ways).map_err(|_| alloc_err())?);
        }

        let offset_sec = BitSection {
            shift: 0,
            mask: geometry.block_size() - 1,
        };
        let set_sec = BitSection {
            shift: geometry.block_bits,
            mask: geometry.n_sets() - 1,
        };
        let tag_sec = BitSection {
            shift: geometry.block_bits + geometry.set_bits,
            mask: u64::MAX,
        };

        Ok(Cache {
            geometry,
            lines,
            set_data,
            n_ways,
            offset_sec,
            set_sec,
            tag_sec,
            stats: Stats::default(),
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn split_addr(&self, addr: u64) -> Addr {
        Addr {
            offset: self.offset_sec.apply(addr),
            // below n_sets, which fit in usize when the cache was built
            set: self.set_sec.apply(addr) as usize,
            tag: self.tag_sec.apply(addr),
        }
    }

    fn get_set(&self, set: usize) -> Range<usize> {
        set * self.n_ways..(set + 1) * self.n_ways
    }

    /// Looks `addr` up, updating recency and counters.
    pub fn access(&mut self, addr: u64) -> AccessResult {
        let Addr { set, tag, .. } = self.split_addr(addr);
        let set_range = self.get_set(set);
        let set_slice = &mut self.lines[set_range];
        let lru = &mut self.set_data[set];

        let result = if let Some(hit_way) = set_slice.iter().position(|l| l.holds(tag)) {
            lru.touch(hit_way);
            AccessResult::Hit
        } else if let Some(vacant_way) = set_slice.iter().position(|l| !l.valid) {
            set_slice[vacant_way].apply(tag);
            lru.insert(vacant_way);
            AccessResult::Miss
        } else {
            let victim_way = lru.evict().expect("full set has an LRU way");
            set_slice[victim_way].apply(tag);
            lru.insert(victim_way);
            AccessResult::MissEvict
        };

        trace!(addr, set, tag, %result, "access");
        self.stats.record(result);
        result
    }

    /// Checks residency without touching recency or counters.
    pub fn contains(&self, addr: u64) -> bool {
        let Addr { set, tag, .. } = self.split_addr(addr);
        self.lines[self.get_set(set)].iter().any(|l| l.holds(tag))
    }

    /// Tags held by `set`, most recently used first.
    pub fn resident_tags(&self, set: usize) -> Vec<u64> {
        let base = set * self.n_ways;
        self.set_data[set]
            .iter()
            .map(|way| self.lines[base + way].tag)
            .collect()
    }

    pub fn occupied(&self, set: usize) -> usize {
        self.set_data[set].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::AccessResult::*;

    fn cache(s: u32, b: u32, e: usize) -> Cache {
        Cache::new(Geometry::new(s, b, e).unwrap()).unwrap()
    }

    #[test]
    fn geometry_rejects_zero_fields() {
        assert!(matches!(
            Geometry::new(0, 4, 1),
            Err(ConfigError::NotPositive { flag: "-s" })
        ));
        assert!(matches!(
            Geometry::new(4, 4, 0),
            Err(ConfigError::NotPositive { flag: "-E" })
        ));
        assert!(matches!(
            Geometry::new(4, 0, 1),
            Err(ConfigError::NotPositive { flag: "-b" })
        ));
    }

    #[test]
    fn geometry_must_fit_in_address() {
        assert!(Geometry::new(32, 32, 1).is_ok());
        assert!(matches!(
            Geometry::new(33, 32, 1),
            Err(ConfigError::AddressTooNarrow { .. })
        ));
    }

    #[test]
    fn split_addr_fields() {
        let c = cache(4, 4, 1);
        let a = c.split_addr(0x1234_5678);
        assert_eq!(a.offset, 0x8);
        assert_eq!(a.set, 0x7);
        assert_eq!(a.tag, 0x12_3456);
    }

    #[test]
    fn split_addr_with_full_width_geometry() {
        let c = cache(2, 62, 1);
        let a = c.split_addr(u64::MAX);
        assert_eq!(a.tag, 0);
        assert_eq!(a.set, 0b11);
        assert_eq!(a.offset, (1 << 62) - 1);
    }

    #[test]
    fn new_cache_is_empty() {
        let c = cache(3, 2, 4);
        for set in 0..8 {
            assert_eq!(c.occupied(set), 0);
        }
        assert_eq!(c.stats(), Stats::default());
    }

    #[test]
    fn huge_geometry_is_an_allocation_error() {
        let g = Geometry::new(62, 1, usize::MAX).unwrap();
        assert!(matches!(Cache::new(g), Err(Error::Allocation { .. })));
    }

    #[test]
    fn direct_mapped_misses_evict_only_when_occupied() {
        let mut c = cache(1, 1, 1);
        assert_eq!(c.access(0x10), Miss);
        assert_eq!(c.access(0x20), MissEvict);
        assert_eq!(c.access(0x30), MissEvict);
        // set 1 is still empty
        assert_eq!(c.access(0x12), Miss);
        assert_eq!(
            c.stats(),
            Stats {
                hits: 0,
                misses: 4,
                evictions: 2
            }
        );
    }

    #[test]
    fn offset_bits_do_not_matter() {
        let mut c = cache(2, 4, 1);
        assert_eq!(c.access(0x40), Miss);
        assert_eq!(c.access(0x4f), Hit);
        assert_eq!(c.access(0x47), Hit);
    }

    #[test]
    fn hit_promotes_to_mru() {
        // s=1 b=1: tags are addr >> 2, set 0 when bit 1 is clear
        let mut c = cache(1, 1, 3);
        c.access(0x10);
        c.access(0x20);
        c.access(0x30);
        assert_eq!(c.resident_tags(0), vec![12, 8, 4]);
        assert_eq!(c.access(0x10), Hit);
        assert_eq!(c.resident_tags(0), vec![4, 12, 8]);
        // 0x20 is now LRU
        assert_eq!(c.access(0x40), MissEvict);
        assert_eq!(c.resident_tags(0), vec![16, 4, 12]);
        assert!(!c.contains(0x20));
    }

    #[test]
    fn lru_evicts_first_of_e_plus_one() {
        for e in 1..=6usize {
            let mut c = cache(2, 3, e);
            // same set (0), distinct tags
            let addrs: Vec<u64> = (1..=e as u64 + 1).map(|t| t << 5).collect();
            for &a in &addrs {
                c.access(a);
            }
            assert!(!c.contains(addrs[0]), "E={e}");
            for &a in &addrs[1..] {
                assert!(c.contains(a), "E={e}");
            }
            assert_eq!(c.access(addrs[0]), MissEvict, "E={e}");
        }
    }

    #[test]
    fn tags_in_a_set_stay_distinct() {
        let mut c = cache(1, 1, 4);
        for &a in &[0x10, 0x20, 0x10, 0x30, 0x20, 0x50, 0x60, 0x10, 0x70] {
            c.access(a);
            let mut tags = c.resident_tags(0);
            assert!(tags.len() <= 4);
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(tags.len(), c.occupied(0));
        }
    }

    #[test]
    fn set_index_wraps_high_addresses() {
        let mut c = cache(1, 1, 1);
        assert_eq!(c.split_addr(u64::MAX).set, 1);
        assert_eq!(c.access(u64::MAX), Miss);
        assert_eq!(c.access(u64::MAX - 1), Hit);
    }

    #[test]
    fn miss_rate_handles_no_accesses() {
        assert_eq!(Stats::default().miss_rate(), 0.0);
        let s = Stats {
            hits: 3,
            misses: 1,
            evictions: 0,
        };
        assert_eq!(s.miss_rate(), 0.25);
    }
}
