//! Bounded sample history with absolute indexing.
//!
//! `len()` counts every sample ever pushed, so baseline window markers stay
//! valid indices for the whole session. Only the newest `capacity` values are
//! retained; older values are pruned from the front the same way a live plot
//! trace drops its oldest points.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History {
    values: VecDeque<f64>,
    capacity: usize,
    total: usize,
}

impl History {
    /// History retaining at most `capacity` values (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.total += 1;
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Number of samples pushed over the lifetime of the history.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of values currently held.
    pub fn retained(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Absolute index of the oldest retained value.
    pub fn first_index(&self) -> usize {
        self.total - self.values.len()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Value at absolute index `index`, if still retained.
    pub fn get(&self, index: usize) -> Option<f64> {
        index
            .checked_sub(self.first_index())
            .and_then(|i| self.values.get(i).copied())
    }

    /// Retained values in the absolute range `[start, end)`.
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = f64> + '_ {
        let first = self.first_index();
        let lo = start.max(first).min(self.total) - first;
        let hi = end.max(start).min(self.total).max(first) - first;
        self.values.range(lo..hi.max(lo)).copied()
    }

    /// The newest `n` retained values, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied()
    }

    /// Retained values paired with their absolute index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        let first = self.first_index();
        self.values.iter().enumerate().map(move |(i, v)| (first + i, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, n: usize) -> History {
        let mut h = History::with_capacity(capacity);
        for i in 0..n {
            h.push(i as f64);
        }
        h
    }

    #[test]
    fn len_counts_all_pushes_while_retention_is_bounded() {
        let h = filled(4, 10);
        assert_eq!(h.len(), 10);
        assert_eq!(h.retained(), 4);
        assert_eq!(h.first_index(), 6);
        assert_eq!(h.get(5), None);
        assert_eq!(h.get(6), Some(6.0));
        assert_eq!(h.get(9), Some(9.0));
        assert_eq!(h.get(10), None);
        assert_eq!(h.last(), Some(9.0));
    }

    #[test]
    fn range_is_clamped_to_retained_values() {
        let h = filled(4, 10);
        assert_eq!(h.range(7, 9).collect::<Vec<_>>(), vec![7.0, 8.0]);
        assert_eq!(h.range(0, 8).collect::<Vec<_>>(), vec![6.0, 7.0]);
        assert_eq!(h.range(8, 100).collect::<Vec<_>>(), vec![8.0, 9.0]);
        assert_eq!(h.range(9, 3).count(), 0);
        assert_eq!(h.range(0, 2).count(), 0);
    }

    #[test]
    fn tail_returns_newest_values_in_order() {
        let h = filled(100, 5);
        assert_eq!(h.tail(3).collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(h.tail(10).count(), 5);
    }

    #[test]
    fn iter_reports_absolute_indices() {
        let h = filled(2, 5);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![(3, 3.0), (4, 4.0)]);
    }
}
