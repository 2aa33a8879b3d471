//! Differential check against a timestamp-based LRU model.

use csim::{AccessResult, Cache, Geometry};

/// Straightforward LRU: every line remembers when it was last used.
struct Reference {
    s: u32,
    b: u32,
    ways: usize,
    sets: Vec<Vec<(u64, u64)>>,
    clock: u64,
}

impl Reference {
    fn new(s: u32, b: u32, ways: usize) -> Self {
        Reference {
            s,
            b,
            ways,
            sets: vec![Vec::new(); 1 << s],
            clock: 0,
        }
    }

    fn access(&mut self, addr: u64) -> AccessResult {
        self.clock += 1;
        let set = ((addr >> self.b) & ((1 << self.s) - 1)) as usize;
        let tag = addr >> (self.s + self.b);
        let lines = &mut self.sets[set];
        if let Some(line) = lines.iter_mut().find(|(t, _)| *t == tag) {
            line.1 = self.clock;
            return AccessResult::Hit;
        }
        if lines.len() < self.ways {
            lines.push((tag, self.clock));
            return AccessResult::Miss;
        }
        let victim = lines
            .iter_mut()
            .min_by_key(|(_, used)| *used)
            .unwrap();
        *victim = (tag, self.clock);
        AccessResult::MissEvict
    }
}

#[test]
fn matches_reference_on_random_traces() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_cafe);
    for round in 0..200 {
        let s = rng.u32(1..=4);
        let b = rng.u32(1..=5);
        let ways = rng.usize(1..=6);
        let mut cache = Cache::new(Geometry::new(s, b, ways).unwrap()).unwrap();
        let mut reference = Reference::new(s, b, ways);

        // Small address space so sets actually fill up and thrash.
        let span = 1u64 << (s + b + 3);
        for step in 0..500 {
            let addr = rng.u64(0..span);
            assert_eq!(
                cache.access(addr),
                reference.access(addr),
                "round {round} step {step}: s={s} b={b} E={ways} addr={addr:#x}"
            );
        }
    }
}

#[test]
fn repeated_access_never_misses_twice() {
    let mut rng = fastrand::Rng::with_seed(7);
    let mut cache = Cache::new(Geometry::new(3, 2, 2).unwrap()).unwrap();
    for _ in 0..1000 {
        let addr = rng.u64(0..1 << 10);
        cache.access(addr);
        assert_eq!(cache.access(addr), AccessResult::Hit);
    }
}

#[test]
fn full_associativity_in_one_set() {
    // s=1 with every address in set 0: behaves like a fully associative
    // cache of E lines
    let ways = 8;
    let mut cache = Cache::new(Geometry::new(1, 1, ways).unwrap()).unwrap();
    let addr = |t: u64| t << 2;
    for t in 0..ways as u64 {
        assert_eq!(cache.access(addr(t)), AccessResult::Miss);
    }
    for t in 0..ways as u64 {
        assert_eq!(cache.access(addr(t)), AccessResult::Hit);
    }
    assert_eq!(cache.access(addr(100)), AccessResult::MissEvict);
    assert!(!cache.contains(addr(0)));
    assert_eq!(cache.occupied(0), ways);
    assert_eq!(cache.occupied(1), 0);
}
