//! Supertype graph of the declared types using petgraph
//!
//! Edges run from a supertype's template to the templates that extend it, so a
//! topological order lists every supertype before its subtypes. A cycle means
//! some type would be its own supertype.

use crate::ast::{Program, TypeRef};
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::types::TemplateId;
use petgraph::graph::NodeIndex;
use petgraph::{algo, Graph as PetGraph};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SupertypeGraph {
    graph: PetGraph<TemplateId, ()>,
}

impl SupertypeGraph {
    pub fn build(program: &Program) -> Self {
        let mut graph = PetGraph::new();
        let mut template_to_node: HashMap<TemplateId, NodeIndex> = HashMap::new();

        for index in 0..program.types.len() {
            let template = TemplateId::declared(index);
            template_to_node.insert(template, graph.add_node(template));
        }

        for (index, decl) in program.types.iter().enumerate() {
            if let Some(TypeRef::Named { template, .. }) = &decl.supertype {
                let sub = template_to_node.get(&TemplateId::declared(index));
                if let (Some(sup), Some(sub)) = (template_to_node.get(template), sub) {
                    graph.add_edge(*sup, *sub, ());
                }
            }
        }

        Self { graph }
    }

    /// Declared templates, supertypes first
    pub fn declaration_order(&self, program: &Program) -> TypeResult<Vec<TemplateId>> {
        match algo::toposort(&self.graph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(|node| self.graph[node]).collect()),
            Err(cycle) => {
                let template = self.graph[cycle.node_id()];
                let decl = template
                    .index()
                    .checked_sub(TemplateId::declared(0).index())
                    .and_then(|index| program.types.get(index));
                Err(TypecheckError::CyclicSupertype {
                    type_name: decl.map(|decl| decl.name.clone()).unwrap_or_default(),
                    span: to_source_span(decl.map(|decl| decl.span)),
                })
            }
        }
    }
}
