// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Per-kind denylist of symbols the marshaller cannot handle.
//!
//! Membership is policy, not mechanism: the table ships with a built-in
//! default and can be replaced or extended from a TOML file at startup.
//! The supportability predicate consults it through
//! [`SymbolDenylist::contains`].

use crate::declarations::DeclKind;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolDenylist {
    #[serde(default)]
    pub interfaces: BTreeSet<String>,
    #[serde(default)]
    pub protocols: BTreeSet<String>,
    #[serde(default)]
    pub structs: BTreeSet<String>,
    #[serde(default)]
    pub unions: BTreeSet<String>,
    #[serde(default)]
    pub enums: BTreeSet<String>,
    #[serde(default)]
    pub functions: BTreeSet<String>,
    #[serde(default)]
    pub vars: BTreeSet<String>,
    #[serde(default)]
    pub typedefs: BTreeSet<String>,
}

impl SymbolDenylist {
    pub fn contains(&self, kind: DeclKind, name: &str) -> bool {
        let set = match kind {
            DeclKind::Interface => &self.interfaces,
            DeclKind::Protocol => &self.protocols,
            DeclKind::Struct => &self.structs,
            DeclKind::Union => &self.unions,
            DeclKind::Enum => &self.enums,
            DeclKind::Function => &self.functions,
            DeclKind::Var => &self.vars,
            DeclKind::Typedef => &self.typedefs,
            _ => return false,
        };
        set.contains(name)
    }

    /// Union with another table. Used to apply a user-supplied override on
    /// top of the built-in default.
    pub fn extend(&mut self, other: SymbolDenylist) {
        self.interfaces.extend(other.interfaces);
        self.protocols.extend(other.protocols);
        self.structs.extend(other.structs);
        self.unions.extend(other.unions);
        self.enums.extend(other.enums);
        self.functions.extend(other.functions);
        self.vars.extend(other.vars);
        self.typedefs.extend(other.typedefs);
    }
}

static DEFAULT_DENYLIST: Lazy<SymbolDenylist> = Lazy::new(|| {
    let mut list = SymbolDenylist::default();
    // Symbols the marshaller is known to choke on even though their
    // declarations look well-formed.
    for name in ["NSLogv", "CFStringCreateWithFormatAndArguments", "NSGetSizeAndAlignment"] {
        list.functions.insert(name.to_string());
    }
    for name in ["NSInvocation", "NSMethodSignature"] {
        list.interfaces.insert(name.to_string());
    }
    list
});

/// The built-in table. Established before any pass runs, never mutated.
pub fn default_denylist() -> &'static SymbolDenylist {
    &DEFAULT_DENYLIST
}
