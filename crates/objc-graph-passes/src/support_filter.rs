// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Drops everything the binding layer cannot represent.
//!
//! Verdicts come from [`SupportAnalysis`]; this pass only applies them.
//! Unsupported top-level declarations leave their module's list,
//! unsupported members leave their container's member lists - a bad method
//! never takes its whole class down.

use crate::pipeline::GraphPass;
use log::debug;
use objc_model::{DeclId, MetadataGraph, SupportAnalysis, SymbolDenylist};

pub struct SupportFilterPass {
    denylist: SymbolDenylist,
}

impl SupportFilterPass {
    pub fn new(denylist: SymbolDenylist) -> Box<Self> {
        Box::new(Self { denylist })
    }
}

impl GraphPass for SupportFilterPass {
    fn run(&self, graph: &mut MetadataGraph) {
        let mut analysis = SupportAnalysis::new(&self.denylist);

        let unsupported: Vec<DeclId> = graph
            .decl_ids()
            .filter(|&id| !analysis.decl_supported(graph, id))
            .collect();
        if unsupported.is_empty() {
            return;
        }
        debug!("filtering {} unsupported declaration(s)", unsupported.len());
        let dropped: std::collections::BTreeSet<DeclId> = unsupported.into_iter().collect();

        for module in graph.module_ids().collect::<Vec<_>>() {
            graph
                .module_mut(module)
                .declarations
                .retain(|id| !dropped.contains(id));
        }
        for id in graph.decl_ids().collect::<Vec<_>>() {
            if let Some(iface) = graph.decl_mut(id).as_interface_mut() {
                iface.categories.retain(|c| !dropped.contains(c));
            }
            if let Some((methods, properties)) = graph.decl_mut(id).member_lists_mut() {
                methods.retain(|m| !dropped.contains(m));
                properties.retain(|p| !dropped.contains(p));
            }
        }
    }

    fn name(&self) -> String {
        "support_filter".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_model::{
        default_denylist, DeclBase, Declaration, InterfaceDecl, MethodDecl, PrimitiveKind,
        TypeDefinition,
    };

    fn method(graph: &mut MetadataGraph, selector: &str, variadic: bool) -> DeclId {
        let void = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Void));
        graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase::named(selector),
            selector: selector.to_string(),
            return_type: void,
            parameters: Vec::new(),
            is_static: false,
            is_variadic: variadic,
            is_nil_terminated: false,
            is_implicit: false,
            owns_returned_reference: false,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    #[test]
    fn bad_member_does_not_take_its_class_down() {
        let mut graph = MetadataGraph::new();
        let good = method(&mut graph, "doWork", false);
        let bad = method(&mut graph, "appendFormat:", true);
        let iface = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase::named("NSWorker"),
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: vec![good, bad],
            properties: Vec::new(),
        }));
        let module = graph.ensure_module("Foundation");
        graph.module_mut(module).declarations.insert(iface);

        SupportFilterPass::new(default_denylist().clone()).run(&mut graph);

        let iface = graph.decl(iface).as_interface().unwrap();
        assert_eq!(iface.methods, vec![good]);
    }

    #[test]
    fn denylisted_interfaces_leave_their_module() {
        let mut graph = MetadataGraph::new();
        let iface = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase::named("NSInvocation"),
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }));
        let module = graph.ensure_module("Foundation");
        graph.module_mut(module).declarations.insert(iface);

        SupportFilterPass::new(default_denylist().clone()).run(&mut graph);
        assert!(!graph.module(module).declarations.contains(&iface));
    }
}
