//! Longest Increasing Subsequence (LIS)
//!
//! Used by the keyed children diff: given the new positions of the matched
//! old children, in old order, the LIS is the largest set of children that are
//! already in relative order and therefore never need a host move.
//!
//! # Complexity
//!
//! - Time: O(n log n) (patience sorting with binary search)
//! - Space: O(n) for tails and predecessor links

/// Positions (indices into `seq`) of one longest strictly increasing
/// subsequence, in ascending order.
///
/// # Example
///
/// ```
/// use reactive_vdom::renderer::longest_increasing_subsequence;
///
/// // values 1, 2 are in order; 0 has to move
/// assert_eq!(longest_increasing_subsequence(&[1, 2, 0]), vec![0, 1]);
/// ```
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    if seq.is_empty() {
        return Vec::new();
    }

    // tails[k] = position of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (pos, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        if slot > 0 {
            prev[pos] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(pos);
        } else {
            tails[slot] = pos;
        }
    }

    // Walk predecessor links back from the last tail
    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(pos) = cursor {
        result.push(pos);
        cursor = prev[pos];
    }
    result.reverse();
    result
}

// =============================================================================
// Tests
// =============================================================================
