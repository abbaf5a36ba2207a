//! Fibonacci sequence generator.

use num_traits::{One, Zero};

use crate::{Error, Result, WorkKey, WorkResult};

/// Largest ordinal accepted by [`fibonacci()`].
///
/// F(10^7) already takes about 870 KB of digits, anything beyond is more likely a typo than a request.
pub const MAX_ORDINAL: WorkKey = 10_000_000;

/// Compute the `n`-th Fibonacci number, with `F(1) = F(2) = 1`.
///
/// Runs in `O(n)` additions and keeps only two accumulators alive.
///
/// `F(0)` is defined as `1` here: the accumulation loop does not run and the second accumulator is returned as is.
/// Callers should stick to `n >= 1`.
///
/// ```
/// assert_eq!(fibfan::sequence::fibonacci(10).unwrap(), fibfan::WorkResult::from(55u32));
/// ```
pub fn fibonacci(n: WorkKey) -> Result<WorkResult> {
    if n > MAX_ORDINAL {
        return Err(Error::Compute { key: n, max: MAX_ORDINAL });
    }

    let mut a = WorkResult::zero();
    let mut b = WorkResult::one();

    for _ in 1..n {
        a += &b;
        std::mem::swap(&mut a, &mut b);
    }

    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_reference_values() {
        for (n, expected) in [(1, 1u64), (2, 1), (3, 2), (10, 55), (50, 12_586_269_025)] {
            assert_eq!(fibonacci(n).unwrap(), WorkResult::from(expected), "F({n})");
        }
    }

    #[test]
    fn test_zero_ordinal() {
        assert_eq!(fibonacci(0).unwrap(), WorkResult::one());
    }

    #[test]
    fn test_beyond_u64() {
        let value = fibonacci(100).unwrap();
        assert_eq!(value.to_string(), "354224848179261915075");
    }

    #[test]
    fn test_out_of_range() {
        let err = fibonacci(MAX_ORDINAL + 1).unwrap_err();

        assert!(matches!(err, Error::Compute { key, .. } if key == MAX_ORDINAL + 1));
        assert_eq!(err.key(), Some(MAX_ORDINAL + 1));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn recurrence_holds(n in 1u64..2_000) {
            let sum = fibonacci(n).unwrap() + fibonacci(n + 1).unwrap();
            prop_assert_eq!(sum, fibonacci(n + 2).unwrap());
        }
    }
}
