// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Deterministic member ordering.
//!
//! The binary layout addresses members positionally, so the same graph must
//! serialize the same way on every run regardless of header visitation
//! order. Methods, properties, categories and module declaration lists are
//! sorted by the byte ordinals of their emitted names; record fields and
//! enum members keep source order, theirs is ABI layout.

use crate::pipeline::GraphPass;
use indexmap::IndexSet;
use objc_model::{DeclId, MetadataGraph};

pub struct MemberOrderingPass;

impl MemberOrderingPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }

    /// Byte-ordinal key. Rust's `String` ordering is already bytewise; the
    /// selector tie-break keeps same-named overloads stable.
    fn sort_key(graph: &MetadataGraph, id: DeclId) -> (String, String) {
        let decl = graph.decl(id);
        let selector = decl
            .as_method()
            .map(|m| m.selector.clone())
            .unwrap_or_default();
        (decl.external_name().to_string(), selector)
    }

    fn sort_members(graph: &MetadataGraph, mut members: Vec<DeclId>) -> Vec<DeclId> {
        members.sort_by_cached_key(|&id| Self::sort_key(graph, id));
        members
    }
}

impl GraphPass for MemberOrderingPass {
    fn run(&self, graph: &mut MetadataGraph) {
        for id in graph.decl_ids().collect::<Vec<_>>() {
            let categories = graph.decl(id).as_interface().map(|i| i.categories.clone());
            if let Some(categories) = categories {
                let categories = Self::sort_members(graph, categories);
                graph.decl_mut(id).as_interface_mut().unwrap().categories = categories;
            }
            let Some((methods, properties)) = graph.decl(id).member_lists() else {
                continue;
            };
            let (methods, properties) = (methods.clone(), properties.clone());
            let methods = Self::sort_members(graph, methods);
            let properties = Self::sort_members(graph, properties);
            let (m, p) = graph.decl_mut(id).member_lists_mut().unwrap();
            *m = methods;
            *p = properties;
        }

        for module in graph.module_ids().collect::<Vec<_>>() {
            let mut decls: Vec<DeclId> = graph.module(module).declarations.iter().copied().collect();
            decls.sort_by_cached_key(|&id| Self::sort_key(graph, id));
            graph.module_mut(module).declarations = decls.into_iter().collect::<IndexSet<_>>();
        }
    }

    fn name(&self) -> String {
        "member_ordering".to_string()
    }
}
