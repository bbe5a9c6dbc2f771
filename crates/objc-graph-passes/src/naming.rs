// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! External-name assignment.
//!
//! The binding language has one flat namespace per module and no colons in
//! identifiers, so three renames happen here: top-level declarations whose
//! public name is claimed by more than one kind get a kind suffix, selectors
//! are folded to camelCase, and a property whose name is taken by an
//! unrelated instance method gets a `Property` suffix. External names are
//! assigned only when they differ from the public name.

use crate::pipeline::GraphPass;
use log::debug;
use objc_model::{DeclId, DeclKind, Declaration, MetadataGraph};
use std::collections::{BTreeMap, BTreeSet};

pub struct NamingPass;

impl NamingPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }

    fn kind_suffix(kind: DeclKind) -> &'static str {
        match kind {
            DeclKind::Interface => "Interface",
            DeclKind::Protocol => "Protocol",
            DeclKind::Category => "Category",
            DeclKind::Struct => "Struct",
            DeclKind::Union => "Union",
            DeclKind::Enum => "Enum",
            DeclKind::Function => "Function",
            DeclKind::Var => "Var",
            DeclKind::Typedef => "TypeDef",
            other => panic!("BUG: no namespace suffix for {} declarations", other),
        }
    }

    /// `fooWithBar:baz:` -> `fooWithBarBaz`. The first segment keeps its
    /// spelling; later segments contribute their capitalized form.
    fn selector_to_identifier(selector: &str) -> String {
        let mut segments = selector.split(':').filter(|s| !s.is_empty());
        let mut out = match segments.next() {
            Some(first) => first.to_string(),
            None => return String::new(),
        };
        for segment in segments {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
        out
    }

    fn rename_top_level(graph: &mut MetadataGraph) {
        let mut top_level: Vec<DeclId> = Vec::new();
        for module in graph.module_ids().collect::<Vec<_>>() {
            top_level.extend(graph.module(module).declarations.iter().copied());
        }

        let mut kinds_per_name: BTreeMap<String, BTreeSet<DeclKind>> = BTreeMap::new();
        for &id in &top_level {
            kinds_per_name
                .entry(graph.decl(id).public_name().to_string())
                .or_default()
                .insert(graph.decl(id).kind());
        }

        for id in top_level {
            let name = graph.decl(id).public_name().to_string();
            if kinds_per_name[&name].len() < 2 {
                continue;
            }
            let renamed = format!("{}{}", name, Self::kind_suffix(graph.decl(id).kind()));
            debug!("namespace collision on `{}`, emitting `{}`", name, renamed);
            graph.decl_mut(id).base_mut().external_name = Some(renamed);
        }
    }

    fn rename_selectors(graph: &mut MetadataGraph) {
        for id in graph.decl_ids().collect::<Vec<_>>() {
            let Some(method) = graph.decl(id).as_method() else {
                continue;
            };
            let identifier = Self::selector_to_identifier(&method.selector);
            if identifier != method.selector {
                graph.decl_mut(id).base_mut().external_name = Some(identifier);
            }
        }
    }

    fn rename_shadowed_properties(graph: &mut MetadataGraph) {
        for container in graph.decl_ids().collect::<Vec<_>>() {
            let Some((methods, properties)) = graph.decl(container).member_lists() else {
                continue;
            };
            let (methods, properties) = (methods.clone(), properties.clone());

            for property in properties {
                let (name, getter, setter) = {
                    let p = graph.decl(property);
                    let prop = p.as_property().expect("property");
                    (p.external_name().to_string(), prop.getter, prop.setter)
                };
                let shadowed = methods.iter().any(|&m| {
                    if Some(m) == getter || Some(m) == setter {
                        return false;
                    }
                    let method = graph.decl(m).as_method().expect("method");
                    !method.is_static && graph.decl(m).external_name() == name
                });
                if shadowed {
                    let renamed = format!("{}Property", name);
                    debug!("property `{}` shadowed by a method, emitting `{}`", name, renamed);
                    graph.decl_mut(property).base_mut().external_name = Some(renamed);
                }
            }
        }
    }
}

impl GraphPass for NamingPass {
    fn run(&self, graph: &mut MetadataGraph) {
        Self::rename_top_level(graph);
        Self::rename_selectors(graph);
        Self::rename_shadowed_properties(graph);
    }

    fn name(&self) -> String {
        "naming".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_model::{
        DeclBase, EnumDecl, InterfaceDecl, MethodDecl, PrimitiveKind, PropertyDecl, RecordDecl,
        TypeDefinition,
    };

    fn run(graph: &mut MetadataGraph) {
        NamingPass::new().run(graph);
    }

    fn method(graph: &mut MetadataGraph, selector: &str, is_static: bool) -> DeclId {
        let void = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Void));
        graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase::named(selector),
            selector: selector.to_string(),
            return_type: void,
            parameters: Vec::new(),
            is_static,
            is_variadic: false,
            is_nil_terminated: false,
            is_implicit: false,
            owns_returned_reference: false,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    #[test]
    fn selector_folding() {
        assert_eq!(
            NamingPass::selector_to_identifier("fooWithParam:secondParam:"),
            "fooWithParamSecondParam"
        );
        assert_eq!(NamingPass::selector_to_identifier("count"), "count");
        assert_eq!(NamingPass::selector_to_identifier("initWith:"), "initWith");
    }

    #[test]
    fn cross_kind_collisions_get_kind_suffixes() {
        let mut graph = MetadataGraph::new();
        let iface = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase::named("NSRange"),
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }));
        let record = graph.register(Declaration::Struct(RecordDecl {
            base: DeclBase::named("NSRange"),
            fields: Vec::new(),
            typedef_name: None,
        }));
        let unrelated = graph.register(Declaration::Enum(EnumDecl {
            base: DeclBase::named("NSComparisonResult"),
            underlying: None,
            members: Vec::new(),
            typedef_name: None,
        }));
        let module = graph.ensure_module("Foundation");
        for id in [iface, record, unrelated] {
            graph.module_mut(module).declarations.insert(id);
        }

        run(&mut graph);
        assert_eq!(graph.decl(iface).external_name(), "NSRangeInterface");
        assert_eq!(graph.decl(record).external_name(), "NSRangeStruct");
        assert_eq!(graph.decl(unrelated).external_name(), "NSComparisonResult");
        assert!(graph.decl(unrelated).base().external_name.is_none());
    }

    #[test]
    fn shadowed_property_gets_a_suffix_but_accessors_do_not_shadow() {
        let mut graph = MetadataGraph::new();
        let int = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));
        let length_getter = method(&mut graph, "length", false);
        let count_getter = method(&mut graph, "currentCount", false);
        let unrelated_count = method(&mut graph, "count", false);
        let unshadowed = graph.add_decl(Declaration::Property(PropertyDecl {
            base: DeclBase::named("length"),
            property_type: int,
            is_readonly: true,
            getter: Some(length_getter),
            setter: None,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }));
        let shadowed = graph.add_decl(Declaration::Property(PropertyDecl {
            base: DeclBase::named("count"),
            property_type: int,
            is_readonly: true,
            getter: Some(count_getter),
            setter: None,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }));
        graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase::named("NSString"),
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: vec![length_getter, count_getter, unrelated_count],
            properties: vec![unshadowed, shadowed],
        }));

        run(&mut graph);
        // `length` names only its own getter, which does not shadow;
        // `count` is claimed by a method that is not one of its accessors.
        assert_eq!(graph.decl(unshadowed).external_name(), "length");
        assert_eq!(graph.decl(shadowed).external_name(), "countProperty");
    }
}
