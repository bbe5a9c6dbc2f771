// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The memoized "is this declaration representable" predicate.
//!
//! Results are cached per declaration and per type node independently (the
//! same type node can be reached through different declaration paths). The
//! cache entry is pre-seeded `true` before recursing, so a cycle that only
//! reaches itself (a struct holding a pointer to itself) evaluates as
//! supported and the recursion terminates.

use crate::declarations::{DeclId, Declaration};
use crate::denylist::SymbolDenylist;
use crate::model::MetadataGraph;
use crate::types::{TypeDefinition, TypeId};
use itertools::Itertools;
use std::collections::BTreeMap;

pub struct SupportAnalysis<'a> {
    denylist: &'a SymbolDenylist,
    decl_cache: BTreeMap<DeclId, bool>,
    type_cache: BTreeMap<TypeId, bool>,
}

impl<'a> SupportAnalysis<'a> {
    pub fn new(denylist: &'a SymbolDenylist) -> Self {
        Self {
            denylist,
            decl_cache: BTreeMap::new(),
            type_cache: BTreeMap::new(),
        }
    }

    pub fn decl_supported(&mut self, graph: &MetadataGraph, id: DeclId) -> bool {
        if let Some(&cached) = self.decl_cache.get(&id) {
            return cached;
        }
        self.decl_cache.insert(id, true);
        let result = match self.decl_override(graph, id) {
            Some(forced) => forced,
            None => self.decl_refs_supported(graph, id),
        };
        self.decl_cache.insert(id, result);
        result
    }

    pub fn type_supported(&mut self, graph: &MetadataGraph, id: TypeId) -> bool {
        if let Some(&cached) = self.type_cache.get(&id) {
            return cached;
        }
        self.type_cache.insert(id, true);
        let result = match self.type_override(graph, id) {
            Some(forced) => forced,
            None => self.type_refs_supported(graph, id),
        };
        self.type_cache.insert(id, result);
        result
    }

    /// Per-variant unconditional verdicts; `None` defers to recursion.
    fn decl_override(&self, graph: &MetadataGraph, id: DeclId) -> Option<bool> {
        let decl = graph.decl(id);
        if self.denylist.contains(decl.kind(), decl.public_name()) {
            return Some(false);
        }
        match decl {
            Declaration::Unresolved(_) => Some(false),
            Declaration::Union(_) => Some(false),
            Declaration::Function(f) if f.is_variadic && !f.is_nil_terminated => Some(false),
            Declaration::Method(m) if m.is_variadic && !m.is_nil_terminated => Some(false),
            _ => None,
        }
    }

    fn type_override(&self, graph: &MetadataGraph, id: TypeId) -> Option<bool> {
        match graph.type_def(id) {
            TypeDefinition::Vector { .. }
            | TypeDefinition::Complex(_)
            | TypeDefinition::VaList => Some(false),
            // A still-null target should not survive finalize; treat it as
            // never defined either way.
            TypeDefinition::DeclarationReference(None) => Some(false),
            _ => None,
        }
    }

    fn decl_refs_supported(&mut self, graph: &MetadataGraph, id: DeclId) -> bool {
        let (types, decls) = referenced_nodes(graph, id);
        types
            .into_iter()
            .unique()
            .all(|t| self.type_supported(graph, t))
            && decls
                .into_iter()
                .unique()
                .all(|d| self.decl_supported(graph, d))
    }

    fn type_refs_supported(&mut self, graph: &MetadataGraph, id: TypeId) -> bool {
        let ty = graph.type_def(id);
        let mut ok = ty
            .referenced_types()
            .into_iter()
            .unique()
            .all(|t| self.type_supported(graph, t));
        if let Some(target) = ty.referenced_decl() {
            ok = ok && self.decl_supported(graph, target);
        }
        ok
    }
}

/// Distinct type and declaration nodes a declaration refers to directly.
///
/// Containers do not recurse into their member sets here: an unsupported
/// method must not take its whole class down - members are filtered
/// individually by the support-filter pass.
fn referenced_nodes(graph: &MetadataGraph, id: DeclId) -> (Vec<TypeId>, Vec<DeclId>) {
    match graph.decl(id) {
        Declaration::Interface(d) => {
            let mut types: Vec<TypeId> = d.protocol_refs.clone();
            types.extend(d.super_ref);
            (types, Vec::new())
        }
        Declaration::Protocol(d) => (d.protocol_refs.clone(), Vec::new()),
        Declaration::Category(d) => {
            let mut types = vec![d.extended_interface];
            types.extend(d.protocol_refs.iter().copied());
            (types, Vec::new())
        }
        Declaration::Struct(d) | Declaration::Union(d) => (Vec::new(), d.fields.clone()),
        Declaration::Enum(d) => (d.underlying.into_iter().collect(), Vec::new()),
        Declaration::EnumMember(_) => (Vec::new(), Vec::new()),
        Declaration::Function(d) => (vec![d.return_type], d.parameters.clone()),
        Declaration::Method(d) => (vec![d.return_type], d.parameters.clone()),
        Declaration::Parameter(d) => (vec![d.param_type], Vec::new()),
        Declaration::Property(d) => {
            let mut decls = Vec::new();
            decls.extend(d.getter);
            decls.extend(d.setter);
            (vec![d.property_type], decls)
        }
        Declaration::Var(d) => (vec![d.var_type], Vec::new()),
        Declaration::Typedef(d) => (vec![d.underlying], Vec::new()),
        Declaration::Field(d) => (vec![d.field_type], Vec::new()),
        Declaration::Unresolved(_) => (Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::{DeclBase, FieldDecl, FunctionDecl, RecordDecl, TypedefDecl};
    use crate::denylist::default_denylist;
    use crate::types::PrimitiveKind;

    #[test]
    fn self_referential_struct_through_a_pointer_is_supported() {
        let mut graph = MetadataGraph::new();
        // struct S { struct S *next; }
        let s = graph.register(Declaration::Struct(RecordDecl {
            base: DeclBase::named("S"),
            fields: Vec::new(),
            typedef_name: None,
        }));
        let s_ref = graph.reference_to(s);
        let ptr = graph.add_type(TypeDefinition::Pointer(s_ref));
        let next = graph.add_decl(Declaration::Field(FieldDecl {
            base: DeclBase::named("next"),
            field_type: ptr,
        }));
        match graph.decl_mut(s) {
            Declaration::Struct(record) => record.fields.push(next),
            _ => unreachable!(),
        }

        let mut analysis = SupportAnalysis::new(default_denylist());
        assert!(analysis.decl_supported(&graph, s));
    }

    #[test]
    fn unions_and_anything_reaching_them_are_unsupported() {
        let mut graph = MetadataGraph::new();
        let u = graph.register(Declaration::Union(RecordDecl {
            base: DeclBase::named("U"),
            fields: Vec::new(),
            typedef_name: None,
        }));
        let u_ref = graph.reference_to(u);
        let field = graph.add_decl(Declaration::Field(FieldDecl {
            base: DeclBase::named("inner"),
            field_type: u_ref,
        }));
        let s = graph.register(Declaration::Struct(RecordDecl {
            base: DeclBase::named("Wrapper"),
            fields: vec![field],
            typedef_name: None,
        }));

        let mut analysis = SupportAnalysis::new(default_denylist());
        assert!(!analysis.decl_supported(&graph, u));
        assert!(!analysis.decl_supported(&graph, s));
    }

    #[test]
    fn variadic_function_without_terminator_is_unsupported() {
        let mut graph = MetadataGraph::new();
        let void = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Void));
        let f = graph.register(Declaration::Function(FunctionDecl {
            base: DeclBase::named("printfLike"),
            return_type: void,
            parameters: Vec::new(),
            is_variadic: true,
            is_nil_terminated: false,
            owns_returned_reference: false,
        }));
        let g = graph.register(Declaration::Function(FunctionDecl {
            base: DeclBase::named("arrayWithObjects"),
            return_type: void,
            parameters: Vec::new(),
            is_variadic: true,
            is_nil_terminated: true,
            owns_returned_reference: false,
        }));

        let mut analysis = SupportAnalysis::new(default_denylist());
        assert!(!analysis.decl_supported(&graph, f));
        assert!(analysis.decl_supported(&graph, g));
    }

    #[test]
    fn unresolved_targets_poison_their_referrers() {
        let mut graph = MetadataGraph::new();
        let dangling = graph.resolve_or_defer("c:@S@NeverDefined");
        let td = graph.register(Declaration::Typedef(TypedefDecl {
            base: DeclBase::named("NeverDefinedRef"),
            underlying: dangling,
        }));
        graph.finalize();

        let mut analysis = SupportAnalysis::new(default_denylist());
        assert!(!analysis.decl_supported(&graph, td));
    }

    #[test]
    fn denylisted_symbols_are_unsupported() {
        let mut graph = MetadataGraph::new();
        let void = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Void));
        let f = graph.register(Declaration::Function(FunctionDecl {
            base: DeclBase::named("NSLogv"),
            return_type: void,
            parameters: Vec::new(),
            is_variadic: false,
            is_nil_terminated: false,
            owns_returned_reference: false,
        }));
        let mut analysis = SupportAnalysis::new(default_denylist());
        assert!(!analysis.decl_supported(&graph, f));
    }
}
