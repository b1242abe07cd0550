//! Odd-degree vertex matching for Christofides. A full minimum-weight
//! perfect matching requires blossom algorithm machinery that is out of
//! scope for a heuristic routing library. We instead use a greedy
//! nearest-unmatched-partner matching, which is the standard simplification
//! quoted for implementations of Christofides used as a *first-solution
//! heuristic*
//! rather than an approximation-ratio guarantee.

/// Greedily pair each odd-degree vertex with its cheapest still-unmatched
/// partner, repeatedly taking the globally cheapest remaining pair.
pub fn greedy_min_matching(cost: &[Vec<f64>], odd_vertices: &[usize]) -> Vec<(usize, usize)> {
    let mut remaining = odd_vertices.to_vec();
    let mut matching = Vec::with_capacity(remaining.len() / 2);

    while remaining.len() >= 2 {
        let mut best: Option<(usize, usize, f64)> = None;
        for (ia, &a) in remaining.iter().enumerate() {
            for (ib, &b) in remaining.iter().enumerate().skip(ia + 1) {
                let c = cost[a][b];
                if best.map(|(_, _, bc)| c < bc).unwrap_or(true) {
                    best = Some((ia, ib, c));
                }
            }
        }
        let Some((ia, ib, _)) = best else { break };
        // Remove the higher index first so the lower index stays valid.
        let b = remaining.remove(ib);
        let a = remaining.remove(ia);
        matching.push((a, b));
    }

    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_matching_pairs_all() {
        let cost = vec![
            vec![0.0, 1.0, 5.0, 9.0],
            vec![1.0, 0.0, 9.0, 5.0],
            vec![5.0, 9.0, 0.0, 1.0],
            vec![9.0, 5.0, 1.0, 0.0],
        ];
        let matching = greedy_min_matching(&cost, &[0, 1, 2, 3]);
        assert_eq!(matching.len(), 2);
        assert_eq!(matching, vec![(0, 1), (2, 3)]);
    }
}
