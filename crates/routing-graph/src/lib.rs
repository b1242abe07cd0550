//! # routing-graph
//!
//! Graph primitives shared by the routing search crate: Prim's MST and
//! greedy matching for Christofides, Hierholzer's algorithm for Eulerian
//! shortcutting, and Vilim's theta-tree for the disjunctive edge-finding
//! propagator.
//!
//! None of these types know about vehicles, dimensions, or costs — they are
//! leaf data structures the rest of the workspace builds on.

pub mod eulerian;
pub mod matching;
pub mod mst;
pub mod theta_tree;

pub use eulerian::{eulerian_circuit, shortcut};
pub use matching::greedy_min_matching;
pub use mst::prim_mst;
pub use theta_tree::ThetaTree;
