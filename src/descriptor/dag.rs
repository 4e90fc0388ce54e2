// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! DAG (Directed Acyclic Graph) builder for stage dependencies
//!
//! Builds and validates the dependency graph declared by a descriptor's
//! stages, detecting cycles and references to undefined stages.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::descriptor::{Pipeline, Stage};
use crate::errors::StagehandError;

/// Builder for stage dependency DAGs
pub struct StageDag {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl StageDag {
    fn empty() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build a DAG from a descriptor's stages
    pub fn build(pipeline: &Pipeline) -> Result<Self, StagehandError> {
        let mut dag = Self::empty();

        // Add all stages as nodes
        for (idx, stage) in pipeline.stages.iter().enumerate() {
            let node = dag.graph.add_node(idx);
            dag.name_to_index.insert(stage.name.clone(), node);
            dag.index_to_name.insert(node, stage.name.clone());
        }

        // Add dependency edges
        for stage in &pipeline.stages {
            let stage_node = dag.name_to_index[&stage.name];

            for dep_name in &stage.depends_on {
                let dep_node = dag.name_to_index.get(dep_name).ok_or_else(|| {
                    StagehandError::UnknownDependency {
                        stage: stage.name.clone(),
                        dependency: dep_name.clone(),
                    }
                })?;

                dag.graph.add_edge(*dep_node, stage_node, ());
            }
        }

        dag.validate_acyclic()?;

        Ok(dag)
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), StagehandError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let stages = self.find_cycle_members(cycle.node_id());
                Err(StagehandError::CircularDependency { stages })
            }
        }
    }

    /// Find all stages involved in a cycle
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        use petgraph::visit::{depth_first_search, DfsEvent};

        let mut in_cycle = vec![self.index_to_name[&start].clone()];
        let mut visited = std::collections::HashSet::new();

        depth_first_search(&self.graph, Some(start), |event| {
            if let DfsEvent::Discover(node, _) = event {
                let name = &self.index_to_name[&node];
                if visited.contains(name) {
                    in_cycle.push(name.clone());
                    return petgraph::visit::Control::Break(());
                }
                visited.insert(name.clone());
                in_cycle.push(name.clone());
            }
            petgraph::visit::Control::Continue
        });

        in_cycle
    }

    /// Get topologically sorted stage indices
    pub fn topological_order(&self) -> Result<Vec<usize>, StagehandError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| {
                let stages = self.find_cycle_members(cycle.node_id());
                StagehandError::CircularDependency { stages }
            })
    }

    /// Get topologically sorted stage names
    pub fn topological_order_names(&self) -> Result<Vec<String>, StagehandError> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect()
            })
            .map_err(|cycle| {
                let stages = self.find_cycle_members(cycle.node_id());
                StagehandError::CircularDependency { stages }
            })
    }

    /// Get dependencies for a stage (stages that must complete before it)
    pub fn dependencies(&self, stage_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        Some(deps)
    }

    /// Get dependents for a stage (stages waiting on it)
    pub fn dependents(&self, stage_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Outgoing)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        Some(deps)
    }

    /// Check if stage A depends (directly or transitively) on stage B
    pub fn depends_on(&self, stage_a: &str, stage_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(stage_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(stage_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for (name, _) in &self.name_to_index {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).unwrap();
            let from_name = &self.index_to_name[&from];
            let to_name = &self.index_to_name[&to];
            out.push_str(&format!("    {} --> {}\n", from_name, to_name));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).unwrap();
            let from_name = &self.index_to_name[&from];
            let to_name = &self.index_to_name[&to];
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from_name, to_name));
        }

        // Isolated nodes (cron stages and other parallel entry points)
        for (name, node) in &self.name_to_index {
            if self.graph.neighbors_undirected(*node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of stage ordering
    pub fn to_text(&self, pipeline: &Pipeline) -> Result<String, StagehandError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let stage = &pipeline.stages[*idx];
            let deps = self.dependencies(&stage.name).unwrap_or_default();

            out.push_str(&format!("{}. {}{}", i + 1, stage.name, stage_marker(stage)));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

fn stage_marker(stage: &Stage) -> &'static str {
    if stage.cron {
        " (cron)"
    } else if stage.release {
        " (release)"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_pipeline(stages: Vec<(&str, Vec<&str>)>) -> Pipeline {
        Pipeline {
            version: "1".into(),
            name: "test".into(),
            description: None,
            trigger: Default::default(),
            pr: Default::default(),
            schedules: vec![],
            variables: Default::default(),
            stages: stages
                .into_iter()
                .map(|(name, deps)| Stage {
                    name: name.into(),
                    display_name: None,
                    depends_on: deps.into_iter().map(String::from).collect(),
                    condition: None,
                    cron: false,
                    release: false,
                    jobs: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_linear_dag() {
        let pipeline = make_test_pipeline(vec![
            ("first_phase", vec![]),
            ("second_phase", vec!["first_phase"]),
            ("publish", vec!["second_phase"]),
        ]);

        let dag = StageDag::build(&pipeline).unwrap();
        let order = dag.topological_order_names().unwrap();

        assert_eq!(order, vec!["first_phase", "second_phase", "publish"]);
    }

    #[test]
    fn test_diamond_dag() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = StageDag::build(&pipeline).unwrap();
        let order = dag.topological_order_names().unwrap();

        // a must come first, d must come last
        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
        assert!(order[1] == "b" || order[1] == "c");
        assert!(order[2] == "b" || order[2] == "c");
    }

    #[test]
    fn test_circular_dependency_detection() {
        let pipeline = make_test_pipeline(vec![("a", vec!["b"]), ("b", vec!["a"])]);

        let result = StageDag::build(&pipeline);
        assert!(matches!(
            result,
            Err(StagehandError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let pipeline = make_test_pipeline(vec![("a", vec!["nonexistent"])]);

        let result = StageDag::build(&pipeline);
        assert!(matches!(
            result,
            Err(StagehandError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_depends_on_check() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = StageDag::build(&pipeline).unwrap();

        assert!(dag.depends_on("c", "a")); // transitive
        assert!(dag.depends_on("c", "b")); // direct
        assert!(dag.depends_on("b", "a")); // direct
        assert!(!dag.depends_on("a", "c")); // reverse
        assert!(!dag.depends_on("a", "b")); // reverse
    }

    #[test]
    fn test_isolated_cron_stage_in_dot() {
        let mut pipeline = make_test_pipeline(vec![("tests", vec![]), ("cron_tests", vec![])]);
        pipeline.stages[1].cron = true;

        let dag = StageDag::build(&pipeline).unwrap();
        let dot = dag.to_dot();

        assert!(dot.contains("\"cron_tests\";"));
    }

    #[test]
    fn test_mermaid_output() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"])]);

        let dag = StageDag::build(&pipeline).unwrap();
        let mermaid = dag.to_mermaid();

        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("a --> b"));
    }
}
