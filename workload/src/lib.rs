//! MapReduce applications bundled with the engine, looked up by name.

use mrl_engine::Workload;

pub mod split_names;
pub mod vertex_degree;
pub mod wc;

const WORKLOADS: [(&str, Workload); 3] = [
    (
        "wc",
        Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        },
    ),
    (
        "vertex-degree",
        Workload {
            map_fn: vertex_degree::map,
            reduce_fn: vertex_degree::reduce,
        },
    ),
    (
        "split-names",
        Workload {
            map_fn: split_names::map,
            reduce_fn: split_names::reduce,
        },
    ),
];

/// Look up a bundled workload by name.
pub fn try_named(name: &str) -> Option<Workload> {
    WORKLOADS
        .iter()
        .find(|(workload_name, _)| *workload_name == name)
        .map(|(_, workload)| *workload)
}

/// Names of every bundled workload.
pub fn names() -> impl Iterator<Item = &'static str> {
    WORKLOADS.iter().map(|(name, _)| *name)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_listed_workload() {
        for name in names() {
            assert!(try_named(name).is_some(), "{name} not found");
        }
        assert!(try_named("matrix-multiply").is_none());
    }
}
