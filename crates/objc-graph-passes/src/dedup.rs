// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Hierarchy-aware member de-duplication.
//!
//! An interface together with its categories forms one emission unit; its
//! predecessors are everything reachable through extends, implements and
//! category-ownership edges. A unit member that exactly restates a
//! predecessor member (same selector, same staticness, same signature
//! encoding) is dropped; one that merely reuses a predecessor's external
//! name in the same namespace slot is kept but flagged so the emitter can
//! mark the override. Runs after naming, so external names are final.

use crate::pipeline::GraphPass;
use log::debug;
use objc_model::{DeclId, Declaration, MetadataGraph};
use objc_type_encoding::TypeEncoder;
use std::collections::{BTreeMap, BTreeSet};

/// Exact-match identity of a member: staticness, selector (or property
/// name) and the signature encoding string.
type MemberKey = (bool, String, String);

/// Namespace slot within a container. Static methods never collide with
/// instance members; properties share the instance slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Static,
    Instance,
}

pub struct DeduplicationPass;

impl DeduplicationPass {
    pub fn new() -> Box<Self> {
        Box::new(Self)
    }

    fn member_key(graph: &MetadataGraph, encoder: &TypeEncoder, member: DeclId) -> MemberKey {
        match graph.decl(member) {
            Declaration::Method(m) => {
                let mut signature = encoder.encode(m.return_type).to_string();
                for &param in &m.parameters {
                    match graph.decl(param) {
                        Declaration::Parameter(p) => {
                            signature.push_str(&encoder.encode(p.param_type).to_string());
                        }
                        other => panic!(
                            "BUG: non-parameter `{}` in the parameter list of `{}`",
                            other.base().name,
                            m.selector
                        ),
                    }
                }
                (m.is_static, m.selector.clone(), signature)
            }
            Declaration::Property(p) => (
                false,
                graph.decl(member).base().name.clone(),
                encoder.encode(p.property_type).to_string(),
            ),
            other => panic!("BUG: {} is not a container member", other.kind()),
        }
    }

    fn member_slot(graph: &MetadataGraph, member: DeclId) -> Slot {
        match graph.decl(member) {
            Declaration::Method(m) if m.is_static => Slot::Static,
            _ => Slot::Instance,
        }
    }

    /// Direct hierarchy predecessors of one container: implemented
    /// protocols, plus the base class for interfaces. A container listing
    /// itself (a protocol conforming to itself, or an inheritance cycle)
    /// contributes no edge.
    fn direct_edges(graph: &MetadataGraph, container: DeclId) -> Vec<DeclId> {
        let mut edges = Vec::new();
        let mut push = |target: Option<DeclId>| {
            let Some(target) = target else { return };
            if target == container {
                debug!(
                    "`{}` lists itself in its own hierarchy, skipping the edge",
                    graph.decl(container).base().name
                );
                return;
            }
            if !graph.is_unresolved(target) {
                edges.push(target);
            }
        };
        for &tid in graph.decl(container).protocol_refs() {
            push(graph.target_of(tid));
        }
        if let Some(iface) = graph.decl(container).as_interface() {
            push(iface.super_ref.and_then(|tid| graph.target_of(tid)));
        }
        edges
    }

    /// Every container whose members precede the unit's in the hierarchy.
    /// Categories of a predecessor interface count as predecessors and are
    /// expanded in turn (their protocols precede the unit too); the unit's
    /// own categories do not, they are part of the unit.
    fn predecessors(graph: &MetadataGraph, unit: &[DeclId]) -> Vec<DeclId> {
        let mut visited: BTreeSet<DeclId> = unit.iter().copied().collect();
        let mut out = Vec::new();
        let mut work: Vec<DeclId> = unit
            .iter()
            .flat_map(|&c| Self::direct_edges(graph, c))
            .collect();
        while let Some(container) = work.pop() {
            if !visited.insert(container) {
                if unit.contains(&container) {
                    debug!(
                        "`{}` reappears in its own hierarchy, not descending",
                        graph.decl(container).base().name
                    );
                }
                continue;
            }
            out.push(container);
            work.extend(Self::direct_edges(graph, container));
            if let Some(iface) = graph.decl(container).as_interface() {
                work.extend(iface.categories.iter().copied());
            }
        }
        out
    }

    fn unit_of(graph: &MetadataGraph, start: DeclId) -> Vec<DeclId> {
        let mut unit = vec![start];
        if let Some(iface) = graph.decl(start).as_interface() {
            unit.extend(iface.categories.iter().copied());
        }
        unit
    }

    fn members_of(graph: &MetadataGraph, container: DeclId) -> Vec<DeclId> {
        match graph.decl(container).member_lists() {
            Some((methods, properties)) => {
                methods.iter().chain(properties.iter()).copied().collect()
            }
            None => Vec::new(),
        }
    }
}

impl GraphPass for DeduplicationPass {
    fn run(&self, graph: &mut MetadataGraph) {
        let mut removals: BTreeMap<DeclId, BTreeSet<DeclId>> = BTreeMap::new();
        let mut hierarchy_duplicates: BTreeSet<DeclId> = BTreeSet::new();
        let mut local_firsts: BTreeSet<DeclId> = BTreeSet::new();
        let mut local_rest: BTreeSet<DeclId> = BTreeSet::new();

        {
            let encoder = TypeEncoder::new(graph);
            let starts: Vec<DeclId> = graph
                .decl_ids()
                .filter(|&id| {
                    matches!(
                        graph.decl(id),
                        Declaration::Interface(_) | Declaration::Protocol(_)
                    )
                })
                .collect();

            for start in starts {
                let unit = Self::unit_of(graph, start);
                let predecessors = Self::predecessors(graph, &unit);

                let mut predecessor_keys: BTreeSet<MemberKey> = BTreeSet::new();
                let mut predecessor_names: BTreeSet<(Slot, String)> = BTreeSet::new();
                for &pred in &predecessors {
                    for member in Self::members_of(graph, pred) {
                        predecessor_keys.insert(Self::member_key(graph, &encoder, member));
                        predecessor_names.insert((
                            Self::member_slot(graph, member),
                            graph.decl(member).external_name().to_string(),
                        ));
                    }
                }

                // Restated predecessor members are dropped; mere name
                // reuse is kept and flagged.
                let mut survivors: Vec<DeclId> = Vec::new();
                for &container in &unit {
                    for member in Self::members_of(graph, container) {
                        let key = Self::member_key(graph, &encoder, member);
                        if predecessor_keys.contains(&key) {
                            debug!(
                                "dropping `{}` from `{}`: restates a hierarchy predecessor",
                                graph.decl(member).external_name(),
                                graph.decl(container).base().name
                            );
                            removals.entry(container).or_default().insert(member);
                            continue;
                        }
                        let slot = Self::member_slot(graph, member);
                        let name = graph.decl(member).external_name().to_string();
                        if predecessor_names.contains(&(slot, name)) {
                            hierarchy_duplicates.insert(member);
                        }
                        survivors.push(member);
                    }
                }

                // Same-named siblings within the unit: the first one keeps
                // the name but is flagged, the rest are demoted.
                let mut seen: BTreeMap<(Slot, String), DeclId> = BTreeMap::new();
                for member in survivors {
                    let slot = Self::member_slot(graph, member);
                    let name = graph.decl(member).external_name().to_string();
                    match seen.get(&(slot, name.clone())) {
                        Some(&first) => {
                            local_firsts.insert(first);
                            local_rest.insert(member);
                        }
                        None => {
                            seen.insert((slot, name), member);
                        }
                    }
                }
            }
        }

        for (container, dropped) in removals {
            let (methods, properties) = graph
                .decl_mut(container)
                .member_lists_mut()
                .expect("container");
            methods.retain(|m| !dropped.contains(m));
            properties.retain(|p| !dropped.contains(p));
        }
        for member in hierarchy_duplicates.iter().chain(local_firsts.iter()) {
            match graph.decl_mut(*member) {
                Declaration::Method(m) => m.has_name_duplicate = true,
                Declaration::Property(p) => p.has_name_duplicate = true,
                _ => {}
            }
        }
        for member in local_rest {
            match graph.decl_mut(member) {
                Declaration::Method(m) => m.is_local_duplicate = true,
                Declaration::Property(p) => p.is_local_duplicate = true,
                _ => {}
            }
        }
    }

    fn name(&self) -> String {
        "deduplication".to_string()
    }
}
