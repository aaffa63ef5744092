use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::config::WorkflowConfig;
use crate::core::schema::{
    Component, ComponentKind, Edge, EdgeLabel, EdgeRef, StepType, Workflow, WorkflowStep,
};

/// How a node was reached; `produces` is only resolved when the node is popped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reached {
    Step(StepType),
    Produced,
}

impl Reached {
    /// Step type for an edge by label priority
    fn via(edge: &Edge) -> Self {
        if edge.has_label(EdgeLabel::Dispatches) {
            Reached::Step(StepType::Dispatch)
        } else if edge.has_label(EdgeLabel::Persists) || edge.has_label(EdgeLabel::Transforms) {
            Reached::Step(StepType::Persist)
        } else if edge.has_label(EdgeLabel::Produces) {
            Reached::Produced
        } else {
            Reached::Step(StepType::Call)
        }
    }
}

/// Flow-edge adjacency over component indices, treated as undirected
struct FlowGraph<'a> {
    components: &'a [Component],
    edges: Vec<&'a Edge>,
    /// Per node: (neighbor, edge index) in edge order
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl<'a> FlowGraph<'a> {
    fn new(components: &'a [Component], edges: &'a [Edge]) -> Self {
        let index: HashMap<&str, usize> = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        let mut flow = Vec::new();
        let mut adjacency = vec![Vec::new(); components.len()];
        for edge in edges.iter().filter(|e| e.is_flow()) {
            let (Some(&from), Some(&to)) = (index.get(edge.from_id.as_str()), index.get(edge.to_id.as_str()))
            else {
                continue;
            };
            let slot = flow.len();
            flow.push(edge);
            adjacency[from].push((to, slot));
            adjacency[to].push((from, slot));
        }

        Self {
            components,
            edges: flow,
            adjacency,
        }
    }

    /// Non-entry transports are only entered through a dispatch
    fn admits(&self, node: usize, edge: usize) -> bool {
        self.components[node].kind != ComponentKind::Transport
            || self.edges[edge].has_label(EdgeLabel::Dispatches)
    }
}

/// Synthesizes one workflow per transport by breadth-first traversal
pub struct WorkflowSynthesizer {
    config: WorkflowConfig,
}

impl WorkflowSynthesizer {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Workflows with at least `min_steps` steps, most steps first
    pub fn synthesize(&self, components: &[Component], edges: &[Edge]) -> Vec<Workflow> {
        let graph = FlowGraph::new(components, edges);

        let entries: Vec<usize> = components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ComponentKind::Transport)
            .map(|(i, _)| i)
            .collect();

        let mut workflows: Vec<Workflow> = entries
            .par_iter()
            .map(|&entry| self.trace(&graph, entry))
            .filter(|w| w.steps.len() >= self.config.min_steps)
            .collect();

        workflows.sort_by(|a, b| b.steps.len().cmp(&a.steps.len()).then_with(|| a.name.cmp(&b.name)));
        debug!("Synthesized {} workflows from {} transports", workflows.len(), entries.len());
        workflows
    }

    fn trace(&self, graph: &FlowGraph, entry: usize) -> Workflow {
        let entry_component = &graph.components[entry];

        let mut discovered: HashSet<usize> = HashSet::from([entry]);
        let mut queue: VecDeque<(usize, usize, Reached)> = VecDeque::from([(entry, 0, Reached::Step(StepType::Entry))]);
        let mut steps = Vec::new();
        let mut crossed: Vec<usize> = Vec::new();
        let mut crossed_set: HashSet<usize> = HashSet::new();

        while let Some((node, depth, reached)) = queue.pop_front() {
            let step_type = match reached {
                Reached::Step(step_type) => step_type,
                Reached::Produced => {
                    let open = graph.adjacency[node]
                        .iter()
                        .any(|&(next, edge)| !discovered.contains(&next) && graph.admits(next, edge));
                    if open {
                        StepType::Call
                    } else {
                        StepType::Response
                    }
                }
            };
            steps.push(WorkflowStep {
                component_id: graph.components[node].id.clone(),
                step_type,
                order: steps.len() as u32,
            });

            if depth >= self.config.max_depth {
                continue;
            }
            for &(next, edge) in &graph.adjacency[node] {
                if !graph.admits(next, edge) {
                    continue;
                }
                if crossed_set.insert(edge) {
                    crossed.push(edge);
                }
                if discovered.insert(next) {
                    queue.push_back((next, depth + 1, Reached::via(graph.edges[edge])));
                }
            }
        }

        Workflow {
            id: workflow_id(&entry_component.id),
            name: workflow_name(entry_component),
            entry_point_id: entry_component.id.clone(),
            steps,
            edges: crossed
                .into_iter()
                .map(|e| EdgeRef {
                    from_id: graph.edges[e].from_id.clone(),
                    to_id: graph.edges[e].to_id.clone(),
                })
                .collect(),
        }
    }
}

/// First 16 hex chars of `sha256("workflow:{entry_id}")`
pub fn workflow_id(entry_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("workflow:{}", entry_id).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn workflow_name(transport: &Component) -> String {
    match (&transport.http_method, &transport.http_path) {
        (Some(method), Some(path)) => format!("{} {}", method, path),
        _ => transport.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Language;
    use crate::core::schema::SourceLocation;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn component(id: &str, kind: ComponentKind) -> Component {
        Component {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            language: Language::TypeScript,
            source: SourceLocation {
                file: "src/app.ts".to_string(),
                line_start: 1,
                line_end: None,
            },
            metadata: BTreeMap::new(),
            transport_protocol: None,
            http_method: None,
            http_path: None,
            model_fields: None,
            consumes: None,
            produces: None,
        }
    }

    fn step_types(workflow: &Workflow) -> Vec<(&str, StepType)> {
        workflow
            .steps
            .iter()
            .map(|s| (s.component_id.as_str(), s.step_type))
            .collect()
    }

    #[test]
    fn test_bfs_types_steps_by_edge_label() {
        let mut route = component("route", ComponentKind::Transport);
        route.http_method = Some("POST".to_string());
        route.http_path = Some("/orders".to_string());
        let components = vec![
            route,
            component("ctrl", ComponentKind::Service),
            component("Order", ComponentKind::Model),
            component("mailer", ComponentKind::Service),
            component("Receipt", ComponentKind::Model),
        ];
        let edges = vec![
            Edge::new("ctrl", "route", EdgeLabel::Handles),
            Edge::new("route", "Order", EdgeLabel::Persists),
            Edge::new("ctrl", "mailer", EdgeLabel::Dispatches),
            Edge::new("ctrl", "Receipt", EdgeLabel::Produces),
            Edge::new("ctrl", "Order", EdgeLabel::References),
        ];

        let workflows = WorkflowSynthesizer::new(&WorkflowConfig::default()).synthesize(&components, &edges);
        assert_eq!(workflows.len(), 1);
        let workflow = &workflows[0];
        assert_eq!(workflow.name, "POST /orders");
        assert_eq!(workflow.id, workflow_id("route"));
        assert_eq!(
            step_types(workflow),
            vec![
                ("route", StepType::Entry),
                ("ctrl", StepType::Call),
                ("Order", StepType::Persist),
                ("mailer", StepType::Dispatch),
                ("Receipt", StepType::Response),
            ]
        );
        let orders: Vec<u32> = workflow.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4]);
        assert_eq!(workflow.edges.len(), 4);
    }

    #[test]
    fn test_produces_to_open_node_is_a_call() {
        let components = vec![
            component("route", ComponentKind::Transport),
            component("Dto", ComponentKind::Model),
            component("mapper", ComponentKind::Transform),
        ];
        let edges = vec![
            Edge::new("route", "Dto", EdgeLabel::Produces),
            Edge::new("mapper", "Dto", EdgeLabel::Transforms),
        ];
        let workflows = WorkflowSynthesizer::new(&WorkflowConfig::default()).synthesize(&components, &edges);
        assert_eq!(
            step_types(&workflows[0]),
            vec![
                ("route", StepType::Entry),
                ("Dto", StepType::Call),
                ("mapper", StepType::Persist),
            ]
        );
    }

    #[test]
    fn test_other_transports_need_a_dispatch() {
        let components = vec![
            component("a", ComponentKind::Transport),
            component("svc", ComponentKind::Service),
            component("b", ComponentKind::Transport),
            component("queue", ComponentKind::Transport),
        ];
        let edges = vec![
            Edge::new("svc", "a", EdgeLabel::Handles),
            Edge::new("svc", "b", EdgeLabel::Handles),
            Edge::new("svc", "queue", EdgeLabel::Dispatches),
        ];
        let workflows = WorkflowSynthesizer::new(&WorkflowConfig::default()).synthesize(&components, &edges);
        let from_a = workflows.iter().find(|w| w.entry_point_id == "a").unwrap();
        let ids: Vec<&str> = from_a.steps.iter().map(|s| s.component_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "svc", "queue"]);
        assert!(!from_a.edges.iter().any(|e| e.to_id == "b"));
    }

    #[test]
    fn test_single_step_policy_and_depth() {
        let components = vec![
            component("lonely", ComponentKind::Transport),
            component("route", ComponentKind::Transport),
            component("s1", ComponentKind::Service),
            component("s2", ComponentKind::Service),
        ];
        let edges = vec![
            Edge::new("route", "s1", EdgeLabel::Calls),
            Edge::new("s1", "s2", EdgeLabel::Calls),
        ];

        let default = WorkflowSynthesizer::new(&WorkflowConfig::default()).synthesize(&components, &edges);
        assert_eq!(default.len(), 1);

        let config = WorkflowConfig {
            min_steps: 1,
            max_depth: 1,
        };
        let all = WorkflowSynthesizer::new(&config).synthesize(&components, &edges);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entry_point_id, "route");
        assert_eq!(all[0].steps.len(), 2);
        assert_eq!(all[1].steps.len(), 1);
    }

    #[test]
    fn test_structural_edges_are_ignored() {
        let components = vec![
            component("route", ComponentKind::Transport),
            component("User", ComponentKind::Model),
        ];
        let edges = vec![Edge::new("route", "User", EdgeLabel::Imports)];
        assert!(WorkflowSynthesizer::new(&WorkflowConfig::default())
            .synthesize(&components, &edges)
            .is_empty());
    }
}
