use std::collections::{TryReserveError, VecDeque};

/// Recency order of the occupied ways in one set. The front is the most
/// recently used way, the back is the LRU victim.
#[derive(Debug, Default)]
pub struct LruOrder {
    ru_order: VecDeque<usize>,
}

impl LruOrder {
    pub fn with_capacity(n_ways: usize) -> Result<Self, TryReserveError> {
        let mut ru_order = VecDeque::new();
        ru_order.try_reserve_exact(n_ways)?;
        Ok(LruOrder { ru_order })
    }

    /// Promotes an occupied way to MRU, keeping everything else in order.
    pub fn touch(&mut self, way: usize) {
        let idx = self.ru_order.iter().position(|&w| w == way);
        debug_assert!(idx.is_some(), "way {way} is not occupied");
        if let Some(idx) = idx {
            self.ru_order.remove(idx);
            self.ru_order.push_front(way);
        }
    }

    /// Records a freshly filled way as MRU.
    pub fn insert(&mut self, way: usize) {
        debug_assert!(!self.ru_order.contains(&way));
        self.ru_order.push_front(way);
    }

    /// Removes and returns the LRU way.
    pub fn evict(&mut self) -> Option<usize> {
        self.ru_order.pop_back()
    }

    pub fn len(&self) -> usize {
        self.ru_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ru_order.is_empty()
    }

    /// Ways from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ru_order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(lru: &LruOrder) -> Vec<usize> {
        lru.iter().collect()
    }

    #[test]
    fn insert_goes_to_front() {
        let mut lru = LruOrder::with_capacity(4).unwrap();
        lru.insert(0);
        lru.insert(1);
        lru.insert(2);
        assert_eq!(order(&lru), vec![2, 1, 0]);
        assert_eq!(lru.len(), 3);
    }

    #[test]
    fn touch_promotes_without_reordering_others() {
        let mut lru = LruOrder::with_capacity(4).unwrap();
        for way in 0..4 {
            lru.insert(way);
        }
        // 3 2 1 0
        lru.touch(1);
        assert_eq!(order(&lru), vec![1, 3, 2, 0]);
        lru.touch(1);
        assert_eq!(order(&lru), vec![1, 3, 2, 0]);
        lru.touch(0);
        assert_eq!(order(&lru), vec![0, 1, 3, 2]);
    }

    #[test]
    fn evict_takes_the_tail() {
        let mut lru = LruOrder::with_capacity(3).unwrap();
        assert_eq!(lru.evict(), None);
        lru.insert(0);
        lru.insert(1);
        lru.insert(2);
        lru.touch(0);
        assert_eq!(lru.evict(), Some(1));
        assert_eq!(lru.evict(), Some(2));
        assert_eq!(lru.evict(), Some(0));
        assert!(lru.is_empty());
    }
}
