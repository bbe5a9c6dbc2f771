// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Declaration model for the Objective-C metadata generator.
//!
//! This crate owns the declaration graph produced by the compiler front end:
//! arena-allocated declaration and type nodes, the module table, USR-based
//! forward-reference resolution, and the memoized supportability predicate.
//! It does NOT compute encodings or emit metadata - those responsibilities
//! belong to objc-type-encoding and objc-binary-backend.

pub mod availability;
pub mod construction;
pub mod declarations;
pub mod denylist;
mod model;
pub mod support;
mod types;

// Graph and module structures (from model.rs)
pub use model::{MetadataGraph, Module, ModuleId};

// Declaration definitions (from declarations.rs)
pub use declarations::{
    CategoryDecl, DeclBase, DeclId, DeclKind, Declaration, EnumDecl, EnumMemberDecl, FieldDecl,
    FunctionDecl, InterfaceDecl, Location, MethodDecl, ParameterDecl, PropertyDecl, ProtocolDecl,
    RecordDecl, TypedefDecl, UnresolvedDecl, VarDecl,
};

// Type definitions (from types.rs)
pub use types::{CallSignature, PrimitiveKind, TypeDefinition, TypeId};

// Availability records (from availability.rs)
pub use availability::{Availability, PlatformAvailability, Version};

// Supportability predicate (from support.rs)
pub use support::SupportAnalysis;

// Denylist configuration (from denylist.rs)
pub use denylist::{default_denylist, SymbolDenylist};

// Construction types (for replaying a front-end dump)
pub use construction::{GraphBuilder, GraphDump};
