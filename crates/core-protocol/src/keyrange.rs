//! Accept/reject key ranges over the 64-bit key value space (type bits,
//! block bits, argument bits, modifier flags packed by the caller).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub min: u64,
    pub max: u64,
}

impl KeyRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, key: u64) -> bool {
        key >= self.min && key <= self.max
    }
}

/// A client's key interest: permits a key only if some accept range
/// contains it and no reject range does.
#[derive(Debug, Default, Clone)]
pub struct KeyRangeSet {
    accept: Vec<KeyRange>,
    reject: Vec<KeyRange>,
}

impl KeyRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, range: KeyRange) {
        self.accept.push(range);
    }

    pub fn reject(&mut self, range: KeyRange) {
        self.reject.push(range);
    }

    pub fn permits(&self, key: u64) -> bool {
        self.accept.iter().any(|r| r.contains(key)) && !self.reject.iter().any(|r| r.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_outside_every_accept_range_is_not_permitted() {
        let mut set = KeyRangeSet::new();
        set.accept(KeyRange::new(0, 10));
        assert!(!set.permits(20));
    }

    #[test]
    fn reject_range_wins_over_overlapping_accept_range() {
        let mut set = KeyRangeSet::new();
        set.accept(KeyRange::new(0, 100));
        set.reject(KeyRange::new(40, 60));
        assert!(set.permits(10));
        assert!(!set.permits(50));
    }
}
