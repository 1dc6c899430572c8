pub mod graph;
pub mod hybrid;

pub use graph::{compile_graph, escape_literal, GraphQuery};
pub use hybrid::{compile_hybrid, HybridRequest};

use crate::config::BackendKind;
use crate::constraints::ConstraintSet;

/// A backend-specific retrieval query compiled from one constraint set
#[derive(Debug, Clone)]
pub enum QueryPlan {
    Graph(GraphQuery),
    Hybrid(HybridRequest),
}

/// Compile a merged constraint set for the configured backend
pub fn compile(constraints: &ConstraintSet, backend: BackendKind, limit: usize) -> QueryPlan {
    match backend {
        BackendKind::Graph => QueryPlan::Graph(compile_graph(constraints, limit)),
        BackendKind::Hybrid => QueryPlan::Hybrid(compile_hybrid(constraints, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_dispatches_on_backend_kind() {
        let constraints = ConstraintSet {
            include: vec!["dal".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            compile(&constraints, BackendKind::Graph, 10),
            QueryPlan::Graph(_)
        ));
        assert!(matches!(
            compile(&constraints, BackendKind::Hybrid, 10),
            QueryPlan::Hybrid(_)
        ));
    }
}
