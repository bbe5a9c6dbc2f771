// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Structural type tree attached to declarations.
//!
//! Type nodes live in the graph arena behind [`TypeId`] handles, like
//! declarations. A `DeclarationReference` with a `None` target is pending
//! resolution; `MetadataGraph::finalize` rebinds any survivor to the
//! Unresolved sentinel, so a `None` target never escapes construction.

use crate::declarations::DeclId;
use serde::Deserialize;

/// Unique identifier for a type node in the graph.
pub type TypeId = usize;

/// Built-in C scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    Void,
    Bool,
    Char,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

/// Call shape shared by function pointers and blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    pub return_type: TypeId,
    pub parameters: Vec<TypeId>,
    pub is_variadic: bool,
}

/// A structural type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Primitive(PrimitiveKind),
    Pointer(TypeId),
    /// Reference to a declaration. `None` while resolution is pending.
    DeclarationReference(Option<DeclId>),
    ConstantArray {
        element: TypeId,
        size: usize,
    },
    IncompleteArray(TypeId),
    Vector {
        element: TypeId,
        size: usize,
    },
    Complex(TypeId),
    FunctionPointer(CallSignature),
    Block(CallSignature),
    /// Dynamically typed object reference, optionally protocol-qualified.
    Id {
        protocols: Vec<TypeId>,
    },
    /// Metaclass reference, optionally protocol-qualified.
    ClassMeta {
        protocols: Vec<TypeId>,
    },
    Instancetype,
    Selector,
    ProtocolType,
    VaList,
}

impl TypeDefinition {
    /// Type ids this node refers to directly. Declaration references are
    /// reported separately by [`TypeDefinition::referenced_decl`].
    pub fn referenced_types(&self) -> Vec<TypeId> {
        match self {
            TypeDefinition::Pointer(t)
            | TypeDefinition::IncompleteArray(t)
            | TypeDefinition::Complex(t) => vec![*t],
            TypeDefinition::ConstantArray { element, .. }
            | TypeDefinition::Vector { element, .. } => vec![*element],
            TypeDefinition::FunctionPointer(sig) | TypeDefinition::Block(sig) => {
                let mut refs = vec![sig.return_type];
                refs.extend(&sig.parameters);
                refs
            }
            TypeDefinition::Id { protocols } | TypeDefinition::ClassMeta { protocols } => {
                protocols.clone()
            }
            _ => Vec::new(),
        }
    }

    pub fn referenced_decl(&self) -> Option<DeclId> {
        match self {
            TypeDefinition::DeclarationReference(target) => *target,
            _ => None,
        }
    }
}
