// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Declaration nodes of the header graph.
//!
//! Declarations are arena-allocated in [`crate::MetadataGraph`] and addressed
//! by [`DeclId`] handles; identity is the handle, never a deep copy. The
//! front end creates declarations in visitation order, later passes mutate
//! them in place (external names, duplicate flags) and finally either drop
//! them or hand them to the binary backend.

use crate::availability::Availability;
use crate::types::TypeId;
use serde::Deserialize;
use std::fmt;

/// Unique identifier for a declaration in the graph.
pub type DeclId = usize;

/// Source position of a declaration, as reported by the front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Data shared by every declaration variant.
#[derive(Debug, Clone, Default)]
pub struct DeclBase {
    /// Source name, exactly as spelled in the header.
    pub name: String,

    /// Collision-resolved name for the binding language. Assigned by the
    /// naming pass only - never by a constructor.
    pub external_name: Option<String>,

    /// Where the declaration was seen.
    pub location: Location,

    /// Owning module. None until resolved.
    pub module: Option<crate::model::ModuleId>,

    /// Per-platform availability.
    pub availability: Availability,

    /// Compiler-assigned unique symbol id. Used during resolution only.
    pub usr: Option<String>,

    /// Whether this is a full definition rather than a forward declaration.
    pub is_definition: bool,
}

impl DeclBase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_definition: true,
            ..Self::default()
        }
    }
}

/// Declaration kind discriminant, used for name maps and suffix tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclKind {
    Interface,
    Protocol,
    Category,
    Struct,
    Union,
    Enum,
    EnumMember,
    Function,
    Method,
    Parameter,
    Property,
    Var,
    Typedef,
    Field,
    Unresolved,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub base: DeclBase,
    /// Single-inheritance base class, as a declaration-reference type node.
    pub super_ref: Option<TypeId>,
    /// Implemented protocols, as declaration-reference type nodes.
    pub protocol_refs: Vec<TypeId>,
    /// Categories attached to this interface, in attachment order.
    pub categories: Vec<DeclId>,
    pub methods: Vec<DeclId>,
    pub properties: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct ProtocolDecl {
    pub base: DeclBase,
    pub protocol_refs: Vec<TypeId>,
    pub methods: Vec<DeclId>,
    pub properties: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct CategoryDecl {
    pub base: DeclBase,
    /// The extended interface. Always present, though it may point at a
    /// forward declaration (or the Unresolved sentinel) of that interface.
    pub extended_interface: TypeId,
    pub protocol_refs: Vec<TypeId>,
    pub methods: Vec<DeclId>,
    pub properties: Vec<DeclId>,
}

/// Struct or union; the enclosing [`Declaration`] variant tells which.
#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub base: DeclBase,
    pub fields: Vec<DeclId>,
    /// Name of a typedef attached to this record, if any. Anonymous records
    /// are only nameable through this.
    pub typedef_name: Option<String>,
}

impl RecordDecl {
    pub fn is_anonymous(&self) -> bool {
        self.base.name.is_empty()
    }

    /// Typedef name if attached, source name otherwise.
    pub fn public_name(&self) -> &str {
        self.typedef_name.as_deref().unwrap_or(&self.base.name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub base: DeclBase,
    pub underlying: Option<TypeId>,
    pub members: Vec<DeclId>,
    pub typedef_name: Option<String>,
}

impl EnumDecl {
    pub fn public_name(&self) -> &str {
        self.typedef_name.as_deref().unwrap_or(&self.base.name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumMemberDecl {
    pub base: DeclBase,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub base: DeclBase,
    pub return_type: TypeId,
    pub parameters: Vec<DeclId>,
    pub is_variadic: bool,
    /// Variadic with a nil terminator convention; without it a variadic
    /// function cannot be marshalled.
    pub is_nil_terminated: bool,
    pub owns_returned_reference: bool,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub base: DeclBase,
    /// Colon-delimited selector, e.g. `fooWithParam:secondParam:`.
    pub selector: String,
    pub return_type: TypeId,
    pub parameters: Vec<DeclId>,
    pub is_static: bool,
    pub is_variadic: bool,
    pub is_nil_terminated: bool,
    /// Synthesized property accessor rather than a declared method.
    pub is_implicit: bool,
    pub owns_returned_reference: bool,
    /// The base class this method belongs to. Exactly one after fix-ups.
    pub parent: Option<DeclId>,
    /// External name collides with a hierarchy predecessor's member.
    pub has_name_duplicate: bool,
    /// A same-named sibling on the same container was kept as canonical.
    pub is_local_duplicate: bool,
}

impl MethodDecl {
    pub fn is_initializer(&self) -> bool {
        !self.is_static && (self.selector == "init" || self.selector.starts_with("initWith"))
    }
}

#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub base: DeclBase,
    pub param_type: TypeId,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub base: DeclBase,
    pub property_type: TypeId,
    pub is_readonly: bool,
    pub getter: Option<DeclId>,
    pub setter: Option<DeclId>,
    pub parent: Option<DeclId>,
    pub has_name_duplicate: bool,
    pub is_local_duplicate: bool,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub base: DeclBase,
    pub var_type: TypeId,
}

#[derive(Debug, Clone)]
pub struct TypedefDecl {
    pub base: DeclBase,
    pub underlying: TypeId,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub base: DeclBase,
    pub field_type: TypeId,
}

/// Sentinel for a symbol that was referenced but never defined. Terminal,
/// serializable state - not an error.
#[derive(Debug, Clone)]
pub struct UnresolvedDecl {
    pub base: DeclBase,
}

/// A declaration node. Closed set; passes rely on exhaustive matching.
#[derive(Debug, Clone)]
pub enum Declaration {
    Interface(InterfaceDecl),
    Protocol(ProtocolDecl),
    Category(CategoryDecl),
    Struct(RecordDecl),
    Union(RecordDecl),
    Enum(EnumDecl),
    EnumMember(EnumMemberDecl),
    Function(FunctionDecl),
    Method(MethodDecl),
    Parameter(ParameterDecl),
    Property(PropertyDecl),
    Var(VarDecl),
    Typedef(TypedefDecl),
    Field(FieldDecl),
    Unresolved(UnresolvedDecl),
}

impl Declaration {
    pub fn base(&self) -> &DeclBase {
        match self {
            Declaration::Interface(d) => &d.base,
            Declaration::Protocol(d) => &d.base,
            Declaration::Category(d) => &d.base,
            Declaration::Struct(d) | Declaration::Union(d) => &d.base,
            Declaration::Enum(d) => &d.base,
            Declaration::EnumMember(d) => &d.base,
            Declaration::Function(d) => &d.base,
            Declaration::Method(d) => &d.base,
            Declaration::Parameter(d) => &d.base,
            Declaration::Property(d) => &d.base,
            Declaration::Var(d) => &d.base,
            Declaration::Typedef(d) => &d.base,
            Declaration::Field(d) => &d.base,
            Declaration::Unresolved(d) => &d.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut DeclBase {
        match self {
            Declaration::Interface(d) => &mut d.base,
            Declaration::Protocol(d) => &mut d.base,
            Declaration::Category(d) => &mut d.base,
            Declaration::Struct(d) | Declaration::Union(d) => &mut d.base,
            Declaration::Enum(d) => &mut d.base,
            Declaration::EnumMember(d) => &mut d.base,
            Declaration::Function(d) => &mut d.base,
            Declaration::Method(d) => &mut d.base,
            Declaration::Parameter(d) => &mut d.base,
            Declaration::Property(d) => &mut d.base,
            Declaration::Var(d) => &mut d.base,
            Declaration::Typedef(d) => &mut d.base,
            Declaration::Field(d) => &mut d.base,
            Declaration::Unresolved(d) => &mut d.base,
        }
    }

    pub fn kind(&self) -> DeclKind {
        match self {
            Declaration::Interface(_) => DeclKind::Interface,
            Declaration::Protocol(_) => DeclKind::Protocol,
            Declaration::Category(_) => DeclKind::Category,
            Declaration::Struct(_) => DeclKind::Struct,
            Declaration::Union(_) => DeclKind::Union,
            Declaration::Enum(_) => DeclKind::Enum,
            Declaration::EnumMember(_) => DeclKind::EnumMember,
            Declaration::Function(_) => DeclKind::Function,
            Declaration::Method(_) => DeclKind::Method,
            Declaration::Parameter(_) => DeclKind::Parameter,
            Declaration::Property(_) => DeclKind::Property,
            Declaration::Var(_) => DeclKind::Var,
            Declaration::Typedef(_) => DeclKind::Typedef,
            Declaration::Field(_) => DeclKind::Field,
            Declaration::Unresolved(_) => DeclKind::Unresolved,
        }
    }

    /// Whether this declaration can own other declarations.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Declaration::Interface(_)
                | Declaration::Protocol(_)
                | Declaration::Category(_)
                | Declaration::Struct(_)
                | Declaration::Union(_)
                | Declaration::Enum(_)
        )
    }

    /// Name preferring an attached typedef over the source spelling.
    pub fn public_name(&self) -> &str {
        match self {
            Declaration::Struct(d) | Declaration::Union(d) => d.public_name(),
            Declaration::Enum(d) => d.public_name(),
            other => &other.base().name,
        }
    }

    /// External name if assigned, public name otherwise.
    pub fn external_name(&self) -> &str {
        match &self.base().external_name {
            Some(n) => n,
            None => self.public_name(),
        }
    }

    /// Method and property lists for base-class declarations.
    pub fn member_lists(&self) -> Option<(&Vec<DeclId>, &Vec<DeclId>)> {
        match self {
            Declaration::Interface(d) => Some((&d.methods, &d.properties)),
            Declaration::Protocol(d) => Some((&d.methods, &d.properties)),
            Declaration::Category(d) => Some((&d.methods, &d.properties)),
            _ => None,
        }
    }

    pub fn member_lists_mut(&mut self) -> Option<(&mut Vec<DeclId>, &mut Vec<DeclId>)> {
        match self {
            Declaration::Interface(d) => Some((&mut d.methods, &mut d.properties)),
            Declaration::Protocol(d) => Some((&mut d.methods, &mut d.properties)),
            Declaration::Category(d) => Some((&mut d.methods, &mut d.properties)),
            _ => None,
        }
    }

    /// Implemented-protocol references for base-class declarations.
    pub fn protocol_refs(&self) -> &[TypeId] {
        match self {
            Declaration::Interface(d) => &d.protocol_refs,
            Declaration::Protocol(d) => &d.protocol_refs,
            Declaration::Category(d) => &d.protocol_refs,
            _ => &[],
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceDecl> {
        match self {
            Declaration::Interface(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_interface_mut(&mut self) -> Option<&mut InterfaceDecl> {
        match self {
            Declaration::Interface(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDecl> {
        match self {
            Declaration::Method(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_method_mut(&mut self) -> Option<&mut MethodDecl> {
        match self {
            Declaration::Method(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyDecl> {
        match self {
            Declaration::Property(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_property_mut(&mut self) -> Option<&mut PropertyDecl> {
        match self {
            Declaration::Property(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&CategoryDecl> {
        match self {
            Declaration::Category(d) => Some(d),
            _ => None,
        }
    }
}
