//! Storage behind a holder: one permanent slot plus a keyed period map.
use crate::periods::Period;
use crate::store::{ExtraParams, ParamValue};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A published array. Never mutated once stored.
pub type Array = Arc<Vec<f64>>;

/// Cache key of a periodic entry.
pub type CacheKey = (Period, ExtraParams);

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    permanent: Option<Array>,
    values: BTreeMap<CacheKey, Array>,
}

/// Size of a ledger's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    pub arrays: usize,
    pub cells: usize,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn permanent(&self) -> Option<&Array> {
        self.permanent.as_ref()
    }

    pub fn set_permanent(&mut self, array: Array) -> &Array {
        self.permanent.insert(array)
    }

    pub fn get(&self, period: &Period, extra_params: &[ParamValue]) -> Option<&Array> {
        self.values.get(&(*period, ExtraParams::from(extra_params)))
    }

    /// Replaces the entry wholesale and returns what is now stored.
    pub fn insert(&mut self, period: Period, extra_params: &[ParamValue], array: Array) -> &Array {
        match self.values.entry((period, ExtraParams::from(extra_params))) {
            Entry::Occupied(mut slot) => {
                slot.insert(array);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(array),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.values.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CacheKey, &Array)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.permanent.is_none() && self.values.is_empty()
    }

    pub fn usage(&self) -> MemoryUsage {
        let mut usage = MemoryUsage::default();
        for array in self.permanent.iter().chain(self.values.values()) {
            usage.arrays += 1;
            usage.cells += array.len();
        }
        usage
    }

    pub fn clear(&mut self) {
        self.permanent = None;
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_keyed_by_period_and_params() {
        let mut ledger = Ledger::new();
        let period = Period::year(2021).unwrap();
        ledger.insert(period, &[], Arc::new(vec![1.0]));
        ledger.insert(period, &[ParamValue::Int(2)], Arc::new(vec![2.0]));

        assert_eq!(ledger.get(&period, &[]).unwrap().as_slice(), &[1.0]);
        assert_eq!(ledger.get(&period, &[ParamValue::Int(2)]).unwrap().as_slice(), &[2.0]);
        assert!(ledger.get(&period, &[ParamValue::Int(3)]).is_none());
        assert_eq!(ledger.usage(), MemoryUsage { arrays: 2, cells: 2 });
    }

    #[test]
    fn test_clone_shares_arrays_but_not_the_map() {
        let mut ledger = Ledger::new();
        let period = Period::year(2021).unwrap();
        ledger.insert(period, &[], Arc::new(vec![1.0]));

        let mut copy = ledger.clone();
        assert!(Arc::ptr_eq(copy.get(&period, &[]).unwrap(), ledger.get(&period, &[]).unwrap()));

        copy.insert(period, &[], Arc::new(vec![9.0]));
        assert_eq!(ledger.get(&period, &[]).unwrap().as_slice(), &[1.0]);

        copy.clear();
        assert!(copy.is_empty());
        assert!(!ledger.is_empty());
    }
}
