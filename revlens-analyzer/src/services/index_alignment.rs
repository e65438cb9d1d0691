//! Index alignment between a working set and its filtered subsets
//!
//! Stages that only apply to some reviews (e.g. embedding skips reviews whose
//! cleaned text is empty) filter the working set, process the subset, then
//! scatter the subset's results back onto the original positions. The same
//! projection rejoins the text branch and the rating-only branch after
//! classification.

/// Keep the items matching `predicate`, remembering where each came from
///
/// Returns `(valid_items, valid_indices)` where `valid_items[k]` is
/// `items[valid_indices[k]]`. Indices are strictly increasing.
pub fn filter_valid<T, P>(items: &[T], predicate: P) -> (Vec<T>, Vec<usize>)
where
    T: Clone,
    P: Fn(&T) -> bool,
{
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| predicate(*item))
        .map(|(index, item)| (item.clone(), index))
        .unzip()
}

/// Scatter subset results back onto a sequence of length `n`
///
/// `full[valid_indices[k]] = Some(valid_results[k])`; every other slot is `None`.
/// The output always has length `n`. Extra results (or indices) beyond the
/// shorter of the two inputs are ignored, as are indices outside `0..n`.
pub fn project<R>(valid_indices: &[usize], valid_results: Vec<R>, n: usize) -> Vec<Option<R>> {
    let mut full: Vec<Option<R>> = std::iter::repeat_with(|| None).take(n).collect();

    if valid_indices.len() != valid_results.len() {
        tracing::warn!(
            indices = valid_indices.len(),
            results = valid_results.len(),
            "Projection inputs differ in length, extra entries ignored"
        );
    }

    for (&index, result) in valid_indices.iter().zip(valid_results) {
        if let Some(slot) = full.get_mut(index) {
            *slot = Some(result);
        }
    }

    full
}

/// Rejoin two disjoint branches into one sequence in their recorded positions
///
/// Both branches are projected onto `0..n` where `n` is the total number of
/// positions; a slot claimed by neither branch is left out.
pub fn merge_branches<T>(
    first: Vec<T>,
    first_positions: &[usize],
    second: Vec<T>,
    second_positions: &[usize],
) -> Vec<T> {
    let n = first_positions.len() + second_positions.len();
    project(first_positions, first, n)
        .into_iter()
        .zip(project(second_positions, second, n))
        .filter_map(|(a, b)| a.or(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_valid_keeps_positions() {
        let texts = vec!["good", "", "bad", "  ", "fine"];
        let (valid, indices) = filter_valid(&texts, |t| !t.trim().is_empty());

        assert_eq!(valid, vec!["good", "bad", "fine"]);
        assert_eq!(indices, vec![0, 2, 4]);
    }

    #[test]
    fn test_project_places_results_at_valid_indices() {
        let indices = vec![0, 2, 4];
        let full = project(&indices, vec!['a', 'b', 'c'], 5);

        assert_eq!(full, vec![Some('a'), None, Some('b'), None, Some('c')]);
        for (k, &index) in indices.iter().enumerate() {
            assert_eq!(full[index], Some(['a', 'b', 'c'][k]));
        }
    }

    #[test]
    fn test_project_empty_inputs() {
        let full: Vec<Option<u8>> = project(&[], Vec::new(), 0);
        assert!(full.is_empty());

        let full: Vec<Option<u8>> = project(&[], Vec::new(), 3);
        assert_eq!(full, vec![None, None, None]);
    }

    #[test]
    fn test_filter_then_project_round_trip_with_no_valid_items() {
        let items = vec!["", " ", ""];
        let (valid, indices) = filter_valid(&items, |t| !t.trim().is_empty());
        assert!(valid.is_empty());

        let full = project(&indices, valid.iter().map(|t| t.len()).collect::<Vec<usize>>(), items.len());
        assert_eq!(full.len(), 3);
        assert!(full.iter().all(Option::is_none));
    }

    #[test]
    fn test_project_ignores_out_of_range_and_extra_results() {
        let full = project(&[1, 7], vec![10, 20, 30], 3);
        assert_eq!(full, vec![None, Some(10), None]);
    }

    #[test]
    fn test_merge_branches_restores_source_order() {
        let merged = merge_branches(
            vec!["text a", "text b"],
            &[0, 3],
            vec!["rated x", "rated y"],
            &[1, 2],
        );
        assert_eq!(merged, vec!["text a", "rated x", "rated y", "text b"]);

        let merged: Vec<&str> = merge_branches(Vec::new(), &[], vec!["rated"], &[0]);
        assert_eq!(merged, vec!["rated"]);
    }
}
