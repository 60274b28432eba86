//! Index arithmetic over slot positions.

/// Destination indices for duplicating the items at `indices` in place.
///
/// `indices` must be ascending. Each copy lands right after the contiguous
/// run its original belongs to, and everything after an inserted copy shifts
/// down by one. A run ends wherever two neighbours differ by more than one.
pub fn find_duplication_indices(indices: &[usize]) -> Vec<usize> {
    let mut out = indices.to_vec();
    let mut previous: Option<usize> = None;
    let mut run_start = 0;
    for (i, &current) in indices.iter().enumerate() {
        if let Some(prev) = previous {
            if current > prev + 1 {
                run_start = i;
            }
        }
        for dest in &mut out[run_start..] {
            *dest += 1;
        }
        previous = Some(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplication_shifts_by_run_length() {
        assert_eq!(find_duplication_indices(&[1, 2, 5]), vec![3, 4, 8]);
        assert_eq!(find_duplication_indices(&[0]), vec![1]);
        assert_eq!(find_duplication_indices(&[0, 1, 2]), vec![3, 4, 5]);
        assert_eq!(find_duplication_indices(&[0, 2, 4]), vec![1, 4, 7]);
        assert!(find_duplication_indices(&[]).is_empty());
    }
}
