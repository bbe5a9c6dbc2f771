// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Structural fix-ups run once after construction.
//!
//! These repair the raw front-end graph before any semantic pass reads it:
//! dangling references are bound, categories are attached to their
//! interfaces, colliding parameter names are disambiguated, implicit
//! property accessors are synthesized, structurally inert records are
//! dropped and module declaration lists are made self-consistent.

use crate::pipeline::GraphPass;
use log::debug;
use objc_model::{
    DeclBase, DeclId, Declaration, MetadataGraph, MethodDecl, ParameterDecl, TypeId,
};
use std::collections::BTreeSet;

/// Rebinds every reference still pending at end of input to the Unresolved
/// sentinel.
pub struct FinalizeReferencesPass;

impl FinalizeReferencesPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }
}

impl GraphPass for FinalizeReferencesPass {
    fn run(&self, graph: &mut MetadataGraph) {
        graph.finalize();
    }

    fn name(&self) -> String {
        "finalize_references".to_string()
    }
}

/// Adds every category to its extended interface's category set. The
/// category may have been seen before the interface was defined; by now
/// the reference points at the real slot (or the Unresolved sentinel, in
/// which case there is nothing to attach to).
pub struct CategoryAttachmentPass;

impl CategoryAttachmentPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }
}

impl GraphPass for CategoryAttachmentPass {
    fn run(&self, graph: &mut MetadataGraph) {
        let mut attachments: Vec<(DeclId, DeclId)> = Vec::new();
        for id in graph.decl_ids() {
            if let Some(category) = graph.decl(id).as_category() {
                if let Some(target) = graph.target_of(category.extended_interface) {
                    if graph.decl(target).as_interface().is_some() {
                        attachments.push((target, id));
                    }
                }
            }
        }
        for (interface, category) in attachments {
            let iface = graph
                .decl_mut(interface)
                .as_interface_mut()
                .expect("checked above");
            if !iface.categories.contains(&category) {
                iface.categories.push(category);
            }
        }
    }

    fn name(&self) -> String {
        "category_attachment".to_string()
    }
}

/// Renames a later parameter when two parameters of one callable share a
/// name, so generated call sites stay unambiguous.
pub struct ParameterDisambiguationPass;

impl ParameterDisambiguationPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }
}

impl GraphPass for ParameterDisambiguationPass {
    fn run(&self, graph: &mut MetadataGraph) {
        for id in graph.decl_ids() {
            let parameters = match graph.decl(id) {
                Declaration::Method(m) => m.parameters.clone(),
                Declaration::Function(f) => f.parameters.clone(),
                _ => continue,
            };
            let mut seen: BTreeSet<String> = BTreeSet::new();
            for (index, &param) in parameters.iter().enumerate() {
                let name = graph.decl(param).base().name.clone();
                if !seen.insert(name.clone()) {
                    let renamed = format!("{}{}", name, index + 1);
                    debug!(
                        "renaming colliding parameter `{}` of `{}` to `{}`",
                        name,
                        graph.decl(id).base().name,
                        renamed
                    );
                    graph.decl_mut(param).base_mut().name = renamed;
                }
            }
        }
    }

    fn name(&self) -> String {
        "parameter_disambiguation".to_string()
    }
}

/// Synthesizes implicit getter/setter methods for properties that do not
/// name declared accessors, and validates accessor shapes.
///
/// A property with no getter after synthesis, or a setter that is
/// non-void or not single-argument, means the front end produced an
/// invalid graph; both are fatal.
pub struct AccessorSynthesisPass;

impl AccessorSynthesisPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }

    fn synthesize_getter(graph: &mut MetadataGraph, property: DeclId, parent: DeclId) -> DeclId {
        let (name, property_type, module) = {
            let p = graph.decl(property);
            let prop = p.as_property().expect("property");
            (p.base().name.clone(), prop.property_type, p.base().module)
        };
        graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase {
                name: name.clone(),
                module,
                is_definition: true,
                ..DeclBase::default()
            },
            selector: name,
            return_type: property_type,
            parameters: Vec::new(),
            is_static: false,
            is_variadic: false,
            is_nil_terminated: false,
            is_implicit: true,
            owns_returned_reference: false,
            parent: Some(parent),
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    fn synthesize_setter(graph: &mut MetadataGraph, property: DeclId, parent: DeclId) -> DeclId {
        let (name, property_type, module) = {
            let p = graph.decl(property);
            let prop = p.as_property().expect("property");
            (p.base().name.clone(), prop.property_type, p.base().module)
        };
        let selector = format!("set{}:", capitalize_first(&name));
        let void = graph.add_type(objc_model::TypeDefinition::Primitive(
            objc_model::PrimitiveKind::Void,
        ));
        let value = graph.add_decl(Declaration::Parameter(ParameterDecl {
            base: DeclBase::named("value"),
            param_type: property_type,
        }));
        graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase {
                name: selector.clone(),
                module,
                is_definition: true,
                ..DeclBase::default()
            },
            selector,
            return_type: void,
            parameters: vec![value],
            is_static: false,
            is_variadic: false,
            is_nil_terminated: false,
            is_implicit: true,
            owns_returned_reference: false,
            parent: Some(parent),
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    fn validate_setter(graph: &MetadataGraph, property: DeclId, setter: DeclId) {
        let method = graph
            .decl(setter)
            .as_method()
            .expect("BUG: property setter is not a method");
        let returns_void = matches!(
            graph.type_def(method.return_type),
            objc_model::TypeDefinition::Primitive(objc_model::PrimitiveKind::Void)
        );
        if !returns_void || method.parameters.len() != 1 {
            panic!(
                "BUG: setter `{}` of property `{}` must return void and take exactly one argument",
                method.selector,
                graph.decl(property).base().name
            );
        }
    }
}

impl GraphPass for AccessorSynthesisPass {
    fn run(&self, graph: &mut MetadataGraph) {
        for container in graph.decl_ids().collect::<Vec<_>>() {
            let Some((_, properties)) = graph.decl(container).member_lists() else {
                continue;
            };
            let properties = properties.clone();
            for property in properties {
                let (getter, setter, readonly) = {
                    let prop = graph.decl(property).as_property().expect("property");
                    (prop.getter, prop.setter, prop.is_readonly)
                };

                let getter = match getter {
                    Some(g) => g,
                    None => {
                        let g = Self::synthesize_getter(graph, property, container);
                        let (methods, _) = graph.decl_mut(container).member_lists_mut().unwrap();
                        methods.push(g);
                        g
                    }
                };
                let setter = match setter {
                    Some(s) => Some(s),
                    None if !readonly => {
                        let s = Self::synthesize_setter(graph, property, container);
                        let (methods, _) = graph.decl_mut(container).member_lists_mut().unwrap();
                        methods.push(s);
                        Some(s)
                    }
                    None => None,
                };

                // Contract checks. A property without a getter cannot have
                // survived synthesis, but keep the invariant explicit.
                assert!(
                    graph.decl(getter).as_method().is_some(),
                    "BUG: property `{}` has no usable getter",
                    graph.decl(property).base().name
                );
                if let Some(setter) = setter {
                    Self::validate_setter(graph, property, setter);
                }

                let prop = graph.decl_mut(property).as_property_mut().unwrap();
                prop.getter = Some(getter);
                prop.setter = setter;
            }
        }
    }

    fn name(&self) -> String {
        "accessor_synthesis".to_string()
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Drops record declarations that are both anonymous and typedef-less.
/// Nothing can reference them; they are structurally inert.
pub struct InertRecordSweepPass;

impl InertRecordSweepPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }
}

impl GraphPass for InertRecordSweepPass {
    fn run(&self, graph: &mut MetadataGraph) {
        let inert: BTreeSet<DeclId> = graph
            .decl_ids()
            .filter(|&id| match graph.decl(id) {
                Declaration::Struct(r) | Declaration::Union(r) => {
                    r.is_anonymous() && r.typedef_name.is_none()
                }
                _ => false,
            })
            .collect();
        if inert.is_empty() {
            return;
        }
        let mut dropped = 0usize;
        for module in graph.module_ids().collect::<Vec<_>>() {
            let list = &mut graph.module_mut(module).declarations;
            let before = list.len();
            list.retain(|id| !inert.contains(id));
            dropped += before - list.len();
        }
        debug!("swept {} inert anonymous record(s)", dropped);
    }

    fn name(&self) -> String {
        "inert_record_sweep".to_string()
    }
}

/// Re-inserts declarations reachable through member/protocol/base/category
/// edges into their home module's declaration list, so that every module's
/// set is self-consistent for per-module emission.
pub struct ModuleReinsertionPass;

impl ModuleReinsertionPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }

    fn collect_type_targets(graph: &MetadataGraph, tid: TypeId, out: &mut BTreeSet<DeclId>) {
        let mut stack = vec![tid];
        let mut seen: BTreeSet<TypeId> = BTreeSet::new();
        while let Some(tid) = stack.pop() {
            if !seen.insert(tid) {
                continue;
            }
            let ty = graph.type_def(tid);
            if let Some(target) = ty.referenced_decl() {
                out.insert(target);
            }
            stack.extend(ty.referenced_types());
        }
    }

    fn reachable_from(graph: &MetadataGraph, id: DeclId, out: &mut BTreeSet<DeclId>) {
        for &tid in graph.decl(id).protocol_refs() {
            Self::collect_type_targets(graph, tid, out);
        }
        match graph.decl(id) {
            Declaration::Interface(iface) => {
                if let Some(super_ref) = iface.super_ref {
                    Self::collect_type_targets(graph, super_ref, out);
                }
                out.extend(iface.categories.iter().copied());
            }
            Declaration::Category(cat) => {
                Self::collect_type_targets(graph, cat.extended_interface, out);
            }
            _ => {}
        }
        if let Some((methods, properties)) = graph.decl(id).member_lists() {
            for &member in methods.iter().chain(properties.iter()) {
                match graph.decl(member) {
                    Declaration::Method(m) => {
                        Self::collect_type_targets(graph, m.return_type, out);
                        for &param in &m.parameters {
                            if let Declaration::Parameter(p) = graph.decl(param) {
                                Self::collect_type_targets(graph, p.param_type, out);
                            }
                        }
                    }
                    Declaration::Property(p) => {
                        Self::collect_type_targets(graph, p.property_type, out);
                    }
                    _ => {}
                }
            }
        }
    }
}

impl GraphPass for ModuleReinsertionPass {
    fn run(&self, graph: &mut MetadataGraph) {
        let mut reachable: BTreeSet<DeclId> = BTreeSet::new();
        for id in graph.decl_ids() {
            if graph.decl(id).member_lists().is_some() {
                Self::reachable_from(graph, id, &mut reachable);
            }
        }
        let mut reinserted = 0usize;
        for id in reachable {
            if !graph.decl(id).is_container() && graph.decl(id).kind() != objc_model::DeclKind::Typedef {
                continue;
            }
            let Some(module) = graph.decl(id).base().module else {
                continue;
            };
            if graph.module_mut(module).declarations.insert(id) {
                reinserted += 1;
            }
        }
        if reinserted > 0 {
            debug!("re-inserted {} reachable declaration(s) into module lists", reinserted);
        }
    }

    fn name(&self) -> String {
        "module_reinsertion".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_model::{
        CategoryDecl, InterfaceDecl, PrimitiveKind, PropertyDecl, RecordDecl, TypeDefinition,
        TypeId,
    };

    fn int_property(
        graph: &mut MetadataGraph,
        name: &str,
        readonly: bool,
        getter: Option<DeclId>,
        setter: Option<DeclId>,
    ) -> DeclId {
        let int = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));
        graph.add_decl(Declaration::Property(PropertyDecl {
            base: DeclBase::named(name),
            property_type: int,
            is_readonly: readonly,
            getter,
            setter,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    fn interface_with(
        graph: &mut MetadataGraph,
        name: &str,
        methods: Vec<DeclId>,
        properties: Vec<DeclId>,
    ) -> DeclId {
        graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase::named(name),
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods,
            properties,
        }))
    }

    fn method_with_params(
        graph: &mut MetadataGraph,
        selector: &str,
        return_type: TypeId,
        parameters: Vec<DeclId>,
    ) -> DeclId {
        graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase::named(selector),
            selector: selector.to_string(),
            return_type,
            parameters,
            is_static: false,
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
    fn accessors_are_synthesized_for_a_bare_property() {
        let mut graph = MetadataGraph::new();
        let prop = int_property(&mut graph, "myProperty", false, None, None);
        let iface = interface_with(&mut graph, "NSKnob", Vec::new(), vec![prop]);

        AccessorSynthesisPass::new().run(&mut graph);

        let property = graph.decl(prop).as_property().unwrap().clone();
        let getter = graph.decl(property.getter.unwrap()).as_method().unwrap();
        let setter = graph.decl(property.setter.unwrap()).as_method().unwrap();
        assert_eq!(getter.selector, "myProperty");
        assert_eq!(setter.selector, "setMyProperty:");
        assert!(getter.is_implicit && setter.is_implicit);
        assert_eq!(setter.parameters.len(), 1);

        let iface = graph.decl(iface).as_interface().unwrap();
        assert_eq!(iface.methods.len(), 2);
    }

    #[test]
    fn readonly_properties_get_no_setter() {
        let mut graph = MetadataGraph::new();
        let prop = int_property(&mut graph, "count", true, None, None);
        interface_with(&mut graph, "NSCounter", Vec::new(), vec![prop]);

        AccessorSynthesisPass::new().run(&mut graph);
        let property = graph.decl(prop).as_property().unwrap();
        assert!(property.getter.is_some());
        assert!(property.setter.is_none());
    }

    #[test]
    #[should_panic(expected = "must return void and take exactly one argument")]
    fn malformed_setter_is_fatal() {
        let mut graph = MetadataGraph::new();
        let int = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));
        // Declared setter that returns int instead of void.
        let setter = method_with_params(&mut graph, "setCount:", int, Vec::new());
        let getter = method_with_params(&mut graph, "count", int, Vec::new());
        let prop = int_property(&mut graph, "count", false, Some(getter), Some(setter));
        interface_with(&mut graph, "NSCounter", vec![getter, setter], vec![prop]);

        AccessorSynthesisPass::new().run(&mut graph);
    }

    #[test]
    fn colliding_parameter_names_are_disambiguated() {
        let mut graph = MetadataGraph::new();
        let void = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Void));
        let int = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));
        let a = graph.add_decl(Declaration::Parameter(ParameterDecl {
            base: DeclBase::named("value"),
            param_type: int,
        }));
        let b = graph.add_decl(Declaration::Parameter(ParameterDecl {
            base: DeclBase::named("value"),
            param_type: int,
        }));
        method_with_params(&mut graph, "setRange:length:", void, vec![a, b]);

        ParameterDisambiguationPass::new().run(&mut graph);
        assert_eq!(graph.decl(a).base().name, "value");
        assert_eq!(graph.decl(b).base().name, "value2");
    }

    #[test]
    fn category_seen_first_attaches_to_the_later_interface() {
        let mut graph = MetadataGraph::new();
        let ext = graph.resolve_or_defer("c:objc(cs)NSDate");
        let cat = graph.register(Declaration::Category(CategoryDecl {
            base: DeclBase::named("NSDateExtras"),
            extended_interface: ext,
            protocol_refs: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }));
        let iface = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase {
                usr: Some("c:objc(cs)NSDate".to_string()),
                ..DeclBase::named("NSDate")
            },
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }));

        CategoryAttachmentPass::new().run(&mut graph);
        // Running twice must not attach twice.
        CategoryAttachmentPass::new().run(&mut graph);

        assert_eq!(graph.target_of(ext), Some(iface));
        assert_eq!(graph.decl(iface).as_interface().unwrap().categories, vec![cat]);
    }

    #[test]
    fn inert_anonymous_records_leave_their_module() {
        let mut graph = MetadataGraph::new();
        let inert = graph.register(Declaration::Struct(RecordDecl {
            base: DeclBase::named(""),
            fields: Vec::new(),
            typedef_name: None,
        }));
        let named = graph.register(Declaration::Struct(RecordDecl {
            base: DeclBase::named(""),
            fields: Vec::new(),
            typedef_name: Some("CGPoint".to_string()),
        }));
        let module = graph.ensure_module("CoreGraphics");
        graph.module_mut(module).declarations.insert(inert);
        graph.module_mut(module).declarations.insert(named);

        InertRecordSweepPass::new().run(&mut graph);
        assert!(!graph.module(module).declarations.contains(&inert));
        assert!(graph.module(module).declarations.contains(&named));
    }

    #[test]
    fn referenced_declarations_are_reinserted_into_their_module() {
        let mut graph = MetadataGraph::new();
        let module = graph.ensure_module("Foundation");
        let referenced = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase {
                module: Some(module),
                ..DeclBase::named("NSURL")
            },
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }));
        // Deliberately absent from the module's declaration list.
        let url_ref = graph.reference_to(referenced);
        let ptr = graph.add_type(TypeDefinition::Pointer(url_ref));
        let m = method_with_params(&mut graph, "url", ptr, Vec::new());
        let holder = interface_with(&mut graph, "NSRequest", vec![m], Vec::new());
        graph.decl_mut(holder).base_mut().module = Some(module);
        graph.module_mut(module).declarations.insert(holder);

        ModuleReinsertionPass::new().run(&mut graph);
        assert!(graph.module(module).declarations.contains(&referenced));
    }
}
