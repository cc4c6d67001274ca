//! Outstanding demand for one publisher/subscriber edge.

/// How many more items a subscriber has authorised its publisher to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    /// A finite number of items
    Finite(u64),
    /// No limit; reached by requesting `u64::MAX` or by overflow
    Unbounded,
}

impl Demand {
    /// Zero outstanding demand
    pub const NONE: Demand = Demand::Finite(0);

    /// Add `n` items of demand. Callers reject `n == 0` before getting here.
    pub fn add(&mut self, n: u64) {
        *self = match *self {
            Demand::Unbounded => Demand::Unbounded,
            Demand::Finite(_) if n == u64::MAX => Demand::Unbounded,
            Demand::Finite(current) => match current.checked_add(n) {
                Some(total) => Demand::Finite(total),
                None => Demand::Unbounded,
            },
        };
    }

    /// Spend one unit of demand, returning false when none is left.
    pub fn consume_one(&mut self) -> bool {
        match *self {
            Demand::Unbounded => true,
            Demand::Finite(n) if n > 0 => {
                *self = Demand::Finite(n - 1);
                true
            }
            Demand::Finite(_) => false,
        }
    }

    /// Whether at least one item may be delivered
    pub fn is_positive(&self) -> bool {
        !matches!(self, Demand::Finite(0))
    }
}

impl Default for Demand {
    fn default() -> Self {
        Demand::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_consume() {
        let mut demand = Demand::default();
        assert!(!demand.is_positive());
        assert!(!demand.consume_one());

        demand.add(2);
        assert_eq!(demand, Demand::Finite(2));
        assert!(demand.consume_one());
        assert!(demand.consume_one());
        assert!(!demand.consume_one());
        assert_eq!(demand, Demand::NONE);
    }

    #[test]
    fn overflow_saturates_to_unbounded() {
        let mut demand = Demand::Finite(u64::MAX - 1);
        demand.add(5);
        assert_eq!(demand, Demand::Unbounded);

        // unbounded never runs dry
        for _ in 0..1000 {
            assert!(demand.consume_one());
        }
        assert_eq!(demand, Demand::Unbounded);
    }

    #[test]
    fn max_request_means_unbounded() {
        let mut demand = Demand::NONE;
        demand.add(u64::MAX);
        assert_eq!(demand, Demand::Unbounded);
    }
}
