//! Hierholzer's algorithm for an Eulerian circuit, plus shortcutting to a
//! Hamiltonian tour (skip already-visited nodes) — the last step of
//! Christofides.

use std::collections::HashMap;

/// `edges` is a multiset of undirected edges; every vertex mentioned must
/// have even degree (guaranteed by MST-edges + a perfect matching on the
/// odd-degree vertices). Returns an Eulerian circuit starting at `start`.
pub fn eulerian_circuit(n: usize, edges: &[(usize, usize)], start: usize) -> Vec<usize> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    // Track edge-id per adjacency slot so we can mark individual
    // parallel edges used without invalidating other entries.
    let mut edge_id_at: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (id, &(a, b)) in edges.iter().enumerate() {
        adjacency[a].push(b);
        edge_id_at[a].push(id);
        adjacency[b].push(a);
        edge_id_at[b].push(id);
    }

    let mut used = vec![false; edges.len()];
    let mut pos: Vec<usize> = vec![0; n];
    let mut stack = vec![start];
    let mut circuit = Vec::new();

    while let Some(&v) = stack.last() {
        let mut advanced = false;
        while pos[v] < adjacency[v].len() {
            let edge_id = edge_id_at[v][pos[v]];
            let to = adjacency[v][pos[v]];
            pos[v] += 1;
            if used[edge_id] {
                continue;
            }
            used[edge_id] = true;
            stack.push(to);
            advanced = true;
            break;
        }
        if !advanced {
            circuit.push(stack.pop().unwrap());
        }
    }

    circuit.reverse();
    circuit
}

/// Shortcut an Eulerian circuit into a Hamiltonian tour by dropping repeat
/// visits, keeping only the first occurrence of each node.
pub fn shortcut(circuit: &[usize]) -> Vec<usize> {
    let mut seen: HashMap<usize, ()> = HashMap::with_capacity(circuit.len());
    let mut tour = Vec::with_capacity(circuit.len());
    for &node in circuit {
        if seen.insert(node, ()).is_none() {
            tour.push(node);
        }
    }
    tour
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eulerian_circuit_and_shortcut() {
        // A 4-cycle: 0-1-2-3-0, each vertex has degree 2.
        let edges = vec![(0, 1), (1, 2), (2, 3), (3, 0)];
        let circuit = eulerian_circuit(4, &edges, 0);
        assert_eq!(circuit.len(), edges.len() + 1);
        assert_eq!(circuit.first(), circuit.last());

        let tour = shortcut(&circuit);
        assert_eq!(tour.len(), 4);
    }
}
