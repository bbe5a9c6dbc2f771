// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The declaration graph: arenas, symbol caches and forward-reference
//! resolution.
//!
//! The graph owns every declaration, type node and module. The front end
//! calls [`MetadataGraph::register`] per visited symbol and
//! [`MetadataGraph::resolve_or_defer`] per type reference; once traversal is
//! complete, [`MetadataGraph::finalize`] rebinds every still-pending
//! reference to an Unresolved sentinel. Lookups never fail - a miss yields
//! either a deferred placeholder or the sentinel.

use crate::declarations::{DeclBase, DeclId, DeclKind, Declaration, UnresolvedDecl};
use crate::types::{TypeDefinition, TypeId};
use indexmap::IndexSet;
use log::debug;
use std::collections::BTreeMap;

/// Unique identifier for a module in the graph.
pub type ModuleId = usize;

/// A translation-unit grouping with a parent/submodule tree. `Foo.Bar`
/// names the submodule `Bar` of `Foo`.
#[derive(Debug, Clone)]
pub struct Module {
    /// Last path segment.
    pub name: String,
    /// Dot-separated full module path.
    pub full_name: String,
    pub parent: Option<ModuleId>,
    pub submodules: Vec<ModuleId>,
    /// Top-level declarations owned by this module, in registration order.
    pub declarations: IndexSet<DeclId>,
}

/// The declaration graph. One instance per pipeline run; no sharing across
/// threads.
#[derive(Debug, Default)]
pub struct MetadataGraph {
    decls: Vec<Declaration>,
    types: Vec<TypeDefinition>,
    modules: Vec<Module>,

    /// USR -> declaration. Unique per symbol across the whole run.
    usr_map: BTreeMap<String, DeclId>,
    /// (kind, source name) -> declaration. First writer wins; later
    /// same-name declarations are equivalent forward declarations.
    name_map: BTreeMap<(DeclKind, String), DeclId>,
    /// Full module path -> module.
    module_map: BTreeMap<String, ModuleId>,
    /// Unpatched declaration references, keyed by the USR they wait for.
    pending: BTreeMap<String, Vec<TypeId>>,
    /// Unresolved sentinels already minted, keyed by USR.
    sentinels: BTreeMap<String, DeclId>,
}

impl MetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.decls[id]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn decl_ids(&self) -> impl Iterator<Item = DeclId> {
        0..self.decls.len()
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDefinition {
        &self.types[id]
    }

    pub fn type_def_mut(&mut self, id: TypeId) -> &mut TypeDefinition {
        &mut self.types[id]
    }

    /// Allocate a type node.
    pub fn add_type(&mut self, ty: TypeDefinition) -> TypeId {
        self.types.push(ty);
        self.types.len() - 1
    }

    /// Allocate a declaration without touching the symbol caches. Used for
    /// members (methods, parameters, fields...), which are owned by their
    /// container rather than looked up by name.
    pub fn add_decl(&mut self, decl: Declaration) -> DeclId {
        self.decls.push(decl);
        self.decls.len() - 1
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id]
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        0..self.modules.len()
    }

    /// Look up or create the module named by a dot-separated path, creating
    /// any missing ancestors along the way.
    pub fn ensure_module(&mut self, full_name: &str) -> ModuleId {
        if let Some(&id) = self.module_map.get(full_name) {
            return id;
        }
        let (parent, name) = match full_name.rsplit_once('.') {
            Some((parent_path, last)) => (Some(self.ensure_module(parent_path)), last),
            None => (None, full_name),
        };
        let id = self.modules.len();
        self.modules.push(Module {
            name: name.to_string(),
            full_name: full_name.to_string(),
            parent,
            submodules: Vec::new(),
            declarations: IndexSet::new(),
        });
        if let Some(parent) = parent {
            self.modules[parent].submodules.push(id);
        }
        self.module_map.insert(full_name.to_string(), id);
        id
    }

    // ------------------------------------------------------------------
    // Registration and resolution
    // ------------------------------------------------------------------

    /// Register a top-level declaration.
    ///
    /// Binds the USR map (if the declaration carries a USR that is not
    /// already bound) and the (kind, name) map (first writer wins). Any
    /// pending type references waiting on the USR are patched to point at
    /// the registered slot. Registering a definition over an existing
    /// forward declaration merges into the existing slot, preserving the
    /// handle and anything already attached to it.
    pub fn register(&mut self, decl: Declaration) -> DeclId {
        let kind = decl.kind();
        let name = decl.base().name.clone();
        let usr = decl.base().usr.clone();

        let existing = usr
            .as_deref()
            .and_then(|u| self.usr_map.get(u).copied())
            .or_else(|| {
                // Name-based fallback for forward uses seen before any
                // USR-bearing definition. Anonymous declarations have no
                // name identity and never merge this way.
                if name.is_empty() {
                    return None;
                }
                self.name_map.get(&(kind, name.clone())).copied()
            });

        let id = match existing {
            Some(id) => {
                if decl.base().is_definition && !self.decls[id].base().is_definition {
                    self.merge_definition(id, decl);
                }
                id
            }
            None => self.add_decl(decl),
        };

        if !name.is_empty() {
            self.name_map.entry((kind, name)).or_insert(id);
        }
        if let Some(usr) = usr {
            self.usr_map.entry(usr.clone()).or_insert(id);
            self.patch_pending(&usr, id);
        }
        id
    }

    /// Replace a forward-declaration slot with its definition, keeping the
    /// handle and any categories already attached to the forward slot.
    fn merge_definition(&mut self, id: DeclId, mut incoming: Declaration) {
        if incoming.base().usr.is_none() {
            incoming.base_mut().usr = self.decls[id].base().usr.clone();
        }
        if let (Some(new_iface), Some(old_iface)) =
            (incoming.as_interface_mut(), self.decls[id].as_interface())
        {
            for &cat in &old_iface.categories {
                if !new_iface.categories.contains(&cat) {
                    new_iface.categories.push(cat);
                }
            }
        }
        self.decls[id] = incoming;
    }

    /// Resolve a USR to a declaration-reference type node, or defer: when
    /// the USR is unknown a reference with a null target is allocated and
    /// parked until a matching `register` patches it.
    pub fn resolve_or_defer(&mut self, usr: &str) -> TypeId {
        let known = self
            .usr_map
            .get(usr)
            .or_else(|| self.sentinels.get(usr))
            .copied();
        match known {
            Some(id) => self.add_type(TypeDefinition::DeclarationReference(Some(id))),
            None => {
                let tid = self.add_type(TypeDefinition::DeclarationReference(None));
                self.pending.entry(usr.to_string()).or_default().push(tid);
                tid
            }
        }
    }

    /// Allocate a reference to an already-known declaration.
    pub fn reference_to(&mut self, id: DeclId) -> TypeId {
        self.add_type(TypeDefinition::DeclarationReference(Some(id)))
    }

    pub fn lookup_usr(&self, usr: &str) -> Option<DeclId> {
        self.usr_map.get(usr).copied()
    }

    pub fn lookup_name(&self, kind: DeclKind, name: &str) -> Option<DeclId> {
        self.name_map.get(&(kind, name.to_string())).copied()
    }

    fn patch_pending(&mut self, usr: &str, id: DeclId) {
        if let Some(refs) = self.pending.remove(usr) {
            for tid in refs {
                self.types[tid] = TypeDefinition::DeclarationReference(Some(id));
            }
        }
    }

    /// Rebind every reference still pending at end of input to an
    /// Unresolved sentinel. After this no declaration reference has a null
    /// target.
    pub fn finalize(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (usr, refs) in pending {
            let sentinel = self.sentinel_for(&usr);
            debug!(
                "binding {} dangling reference(s) for `{}` to the unresolved sentinel",
                refs.len(),
                usr
            );
            for tid in refs {
                self.types[tid] = TypeDefinition::DeclarationReference(Some(sentinel));
            }
        }
    }

    fn sentinel_for(&mut self, usr: &str) -> DeclId {
        if let Some(&id) = self.sentinels.get(usr) {
            return id;
        }
        let id = self.add_decl(Declaration::Unresolved(UnresolvedDecl {
            base: DeclBase {
                name: usr.to_string(),
                usr: Some(usr.to_string()),
                ..DeclBase::default()
            },
        }));
        self.sentinels.insert(usr.to_string(), id);
        id
    }

    /// Target of a declaration-reference type node. None only for
    /// non-reference nodes; a reference target is always bound after
    /// `finalize`.
    pub fn target_of(&self, tid: TypeId) -> Option<DeclId> {
        self.types[tid].referenced_decl()
    }

    pub fn is_unresolved(&self, id: DeclId) -> bool {
        matches!(self.decls[id], Declaration::Unresolved(_))
    }

    /// Whether any references are still waiting for a definition.
    pub fn has_pending_references(&self) -> bool {
        !self.pending.is_empty()
    }
}
