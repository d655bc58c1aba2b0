//! Round-robin selection cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared round-robin cursor.
///
/// Holds the last handed-out slot. The index is always bounded against the
/// length passed in by the caller, so a cursor left over from a larger
/// snapshot wraps to slot 0 of a smaller one instead of running off the end.
#[derive(Debug)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cursor and return the slot to use for a snapshot of `len`
    /// members, or `None` when `len` is zero.
    ///
    /// Lock-free: a caller that loses the compare-exchange race retries
    /// against the value the winner stored.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let mut current = self.cursor.load(Ordering::Acquire);
        loop {
            let next = if current >= len - 1 { 0 } else { current + 1 };
            match self.cursor.compare_exchange_weak(
                current, next, Ordering::AcqRel, Ordering::Acquire
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        // "Before the first slot": the first call yields 0.
        Self {
            cursor: AtomicUsize::new(usize::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn test_round_robin() {
        let rr = RoundRobin::new();
        let picks: Vec<usize> = (0..7).filter_map(|_| rr.next_index(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_yields_none() {
        let rr = RoundRobin::new();
        assert_eq!(rr.next_index(0), None);
        // Empty lookups leave the cursor alone.
        assert_eq!(rr.next_index(2), Some(0));
    }

    #[test]
    fn test_single_member_wraps() {
        let rr = RoundRobin::new();
        for _ in 0..5 {
            assert_eq!(rr.next_index(1), Some(0));
        }
    }

    #[test]
    fn test_shrink_wraps_to_start() {
        let rr = RoundRobin::new();
        for _ in 0..4 {
            rr.next_index(5);
        }
        // Cursor sits at 3, beyond the end of a two member snapshot.
        assert_eq!(rr.next_index(2), Some(0));
        assert_eq!(rr.next_index(2), Some(1));
        assert_eq!(rr.next_index(2), Some(0));
    }

    #[test]
    fn test_grow_continues_from_cursor() {
        let rr = RoundRobin::new();
        rr.next_index(2);
        assert_eq!(rr.next_index(4), Some(1));
        assert_eq!(rr.next_index(4), Some(2));
        assert_eq!(rr.next_index(4), Some(3));
        assert_eq!(rr.next_index(4), Some(0));
    }

    #[test]
    fn test_concurrent_even_distribution() {
        const THREADS: usize = 8;
        const MEMBERS: usize = 5;
        const ROUNDS: usize = 200;

        let rr = RoundRobin::new();
        let counts = Mutex::new(vec![0usize; MEMBERS]);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let mut local = vec![0usize; MEMBERS];
                    for _ in 0..ROUNDS * MEMBERS {
                        local[rr.next_index(MEMBERS).unwrap()] += 1;
                    }
                    let mut counts = counts.lock().unwrap();
                    for (slot, n) in local.into_iter().enumerate() {
                        counts[slot] += n;
                    }
                });
            }
        });

        // Every successful swap advances by one slot, so the totals are exact.
        let counts = counts.into_inner().unwrap();
        assert!(counts.iter().all(|&n| n == THREADS * ROUNDS), "{counts:?}");
    }
}
