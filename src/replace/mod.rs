pub mod lru;

use std::fmt;

/// What a single cache access did to the addressed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
    MissEvict,
}

impl AccessResult {
    pub fn is_hit(self) -> bool {
        matches!(self, AccessResult::Hit)
    }

    pub fn evicted(self) -> bool {
        matches!(self, AccessResult::MissEvict)
    }
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessResult::Hit => "hit",
            AccessResult::Miss => "miss",
            AccessResult::MissEvict => "miss eviction",
        })
    }
}
