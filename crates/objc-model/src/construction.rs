// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Construction types for replaying a front-end traversal.
//!
//! The compiler front end runs out of process and dumps its visitation as a
//! serde document: one entry per declaration, in visitation order, with type
//! references expressed by USR. [`GraphBuilder`] replays the dump through
//! the graph's `register`/`resolve_or_defer` primitives, so forward
//! references behave exactly as they would with an in-process front end.

use crate::availability::Availability;
use crate::declarations::{
    CategoryDecl, DeclBase, DeclId, Declaration, EnumDecl, EnumMemberDecl, FieldDecl,
    FunctionDecl, InterfaceDecl, Location, MethodDecl, ParameterDecl, PropertyDecl, ProtocolDecl,
    RecordDecl, TypedefDecl, VarDecl,
};
use crate::model::MetadataGraph;
use crate::types::{CallSignature, PrimitiveKind, TypeDefinition, TypeId};
use log::warn;
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// A complete front-end dump.
#[derive(Debug, Deserialize)]
pub struct GraphDump {
    #[serde(default)]
    pub modules: Vec<ModuleDump>,
    #[serde(default)]
    pub declarations: Vec<DeclarationDump>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleDump {
    pub name: String,
}

/// Fields common to every dumped declaration.
#[derive(Debug, Default, Deserialize)]
pub struct CommonDump {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub usr: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default = "default_true")]
    pub is_definition: bool,
}

/// A type expression in the dump. References are by USR and are resolved
/// or deferred when lowered.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TypeExpr {
    Primitive {
        name: PrimitiveKind,
    },
    Pointer {
        target: Box<TypeExpr>,
    },
    Reference {
        usr: String,
    },
    ConstantArray {
        element: Box<TypeExpr>,
        size: usize,
    },
    IncompleteArray {
        element: Box<TypeExpr>,
    },
    Vector {
        element: Box<TypeExpr>,
        size: usize,
    },
    Complex {
        element: Box<TypeExpr>,
    },
    FunctionPointer {
        returns: Box<TypeExpr>,
        #[serde(default)]
        parameters: Vec<TypeExpr>,
        #[serde(default)]
        variadic: bool,
    },
    Block {
        returns: Box<TypeExpr>,
        #[serde(default)]
        parameters: Vec<TypeExpr>,
        #[serde(default)]
        variadic: bool,
    },
    Id {
        #[serde(default)]
        protocols: Vec<String>,
    },
    ClassMeta {
        #[serde(default)]
        protocols: Vec<String>,
    },
    Instancetype,
    Selector,
    Protocol,
    VaList,
}

#[derive(Debug, Deserialize)]
pub struct ParameterDump {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[derive(Debug, Deserialize)]
pub struct MethodDump {
    pub selector: String,
    #[serde(default)]
    pub usr: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    pub returns: TypeExpr,
    #[serde(default)]
    pub parameters: Vec<ParameterDump>,
    #[serde(default)]
    pub is_variadic: bool,
    #[serde(default)]
    pub is_nil_terminated: bool,
    #[serde(default)]
    pub owns_returned_reference: bool,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub availability: Availability,
}

#[derive(Debug, Deserialize)]
pub struct PropertyDump {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// Selector of the getter method, declared in the same container.
    #[serde(default)]
    pub getter: Option<String>,
    /// Selector of the setter method, declared in the same container.
    #[serde(default)]
    pub setter: Option<String>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub availability: Availability,
}

#[derive(Debug, Deserialize)]
pub struct FieldDump {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[derive(Debug, Deserialize)]
pub struct EnumMemberDump {
    pub name: String,
    #[serde(default)]
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct InterfaceDump {
    #[serde(flatten)]
    pub common: CommonDump,
    /// USR of the base class.
    #[serde(default)]
    pub base: Option<String>,
    /// USRs of implemented protocols.
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDump>,
    #[serde(default)]
    pub properties: Vec<PropertyDump>,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolDump {
    #[serde(flatten)]
    pub common: CommonDump,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDump>,
    #[serde(default)]
    pub properties: Vec<PropertyDump>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryDump {
    #[serde(flatten)]
    pub common: CommonDump,
    /// USR of the extended interface.
    pub extends: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDump>,
    #[serde(default)]
    pub properties: Vec<PropertyDump>,
}

#[derive(Debug, Deserialize)]
pub struct RecordDump {
    #[serde(flatten)]
    pub common: CommonDump,
    #[serde(default)]
    pub fields: Vec<FieldDump>,
    #[serde(default)]
    pub typedef_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnumDump {
    #[serde(flatten)]
    pub common: CommonDump,
    #[serde(default)]
    pub underlying: Option<TypeExpr>,
    #[serde(default)]
    pub members: Vec<EnumMemberDump>,
    #[serde(default)]
    pub typedef_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionDump {
    #[serde(flatten)]
    pub common: CommonDump,
    pub returns: TypeExpr,
    #[serde(default)]
    pub parameters: Vec<ParameterDump>,
    #[serde(default)]
    pub is_variadic: bool,
    #[serde(default)]
    pub is_nil_terminated: bool,
    #[serde(default)]
    pub owns_returned_reference: bool,
}

#[derive(Debug, Deserialize)]
pub struct VarDump {
    #[serde(flatten)]
    pub common: CommonDump,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[derive(Debug, Deserialize)]
pub struct TypedefDump {
    #[serde(flatten)]
    pub common: CommonDump,
    pub underlying: TypeExpr,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeclarationDump {
    Interface(InterfaceDump),
    Protocol(ProtocolDump),
    Category(CategoryDump),
    Struct(RecordDump),
    Union(RecordDump),
    Enum(EnumDump),
    Function(FunctionDump),
    Var(VarDump),
    Typedef(TypedefDump),
}

/// Replays a dump against a fresh graph.
pub struct GraphBuilder {
    graph: MetadataGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: MetadataGraph::new(),
        }
    }

    /// Build the graph from a dump. The caller still owns finalization and
    /// the pass pipeline.
    pub fn build(dump: GraphDump) -> MetadataGraph {
        let mut builder = Self::new();
        for module in &dump.modules {
            builder.graph.ensure_module(&module.name);
        }
        for decl in dump.declarations {
            builder.add_declaration(decl);
        }
        builder.graph
    }

    pub fn into_graph(self) -> MetadataGraph {
        self.graph
    }

    fn base_from(&mut self, common: CommonDump) -> DeclBase {
        let module = common.module.as_deref().map(|m| self.graph.ensure_module(m));
        DeclBase {
            name: common.name,
            external_name: None,
            location: common.location,
            module,
            availability: common.availability,
            usr: common.usr,
            is_definition: common.is_definition,
        }
    }

    fn lower_type(&mut self, expr: &TypeExpr) -> TypeId {
        match expr {
            TypeExpr::Primitive { name } => {
                self.graph.add_type(TypeDefinition::Primitive(*name))
            }
            TypeExpr::Pointer { target } => {
                let inner = self.lower_type(target);
                self.graph.add_type(TypeDefinition::Pointer(inner))
            }
            TypeExpr::Reference { usr } => self.graph.resolve_or_defer(usr),
            TypeExpr::ConstantArray { element, size } => {
                let element = self.lower_type(element);
                self.graph.add_type(TypeDefinition::ConstantArray {
                    element,
                    size: *size,
                })
            }
            TypeExpr::IncompleteArray { element } => {
                let element = self.lower_type(element);
                self.graph.add_type(TypeDefinition::IncompleteArray(element))
            }
            TypeExpr::Vector { element, size } => {
                let element = self.lower_type(element);
                self.graph.add_type(TypeDefinition::Vector {
                    element,
                    size: *size,
                })
            }
            TypeExpr::Complex { element } => {
                let element = self.lower_type(element);
                self.graph.add_type(TypeDefinition::Complex(element))
            }
            TypeExpr::FunctionPointer {
                returns,
                parameters,
                variadic,
            } => {
                let sig = self.lower_signature(returns, parameters, *variadic);
                self.graph.add_type(TypeDefinition::FunctionPointer(sig))
            }
            TypeExpr::Block {
                returns,
                parameters,
                variadic,
            } => {
                let sig = self.lower_signature(returns, parameters, *variadic);
                self.graph.add_type(TypeDefinition::Block(sig))
            }
            TypeExpr::Id { protocols } => {
                let protocols = protocols
                    .iter()
                    .map(|usr| self.graph.resolve_or_defer(usr))
                    .collect();
                self.graph.add_type(TypeDefinition::Id { protocols })
            }
            TypeExpr::ClassMeta { protocols } => {
                let protocols = protocols
                    .iter()
                    .map(|usr| self.graph.resolve_or_defer(usr))
                    .collect();
                self.graph.add_type(TypeDefinition::ClassMeta { protocols })
            }
            TypeExpr::Instancetype => self.graph.add_type(TypeDefinition::Instancetype),
            TypeExpr::Selector => self.graph.add_type(TypeDefinition::Selector),
            TypeExpr::Protocol => self.graph.add_type(TypeDefinition::ProtocolType),
            TypeExpr::VaList => self.graph.add_type(TypeDefinition::VaList),
        }
    }

    fn lower_signature(
        &mut self,
        returns: &TypeExpr,
        parameters: &[TypeExpr],
        variadic: bool,
    ) -> CallSignature {
        let return_type = self.lower_type(returns);
        let parameters = parameters.iter().map(|p| self.lower_type(p)).collect();
        CallSignature {
            return_type,
            parameters,
            is_variadic: variadic,
        }
    }

    fn lower_method(&mut self, dump: MethodDump, module: Option<crate::ModuleId>) -> DeclId {
        let return_type = self.lower_type(&dump.returns);
        let parameters = dump
            .parameters
            .into_iter()
            .map(|p| {
                let param_type = self.lower_type(&p.ty);
                self.graph.add_decl(Declaration::Parameter(ParameterDecl {
                    base: DeclBase::named(p.name),
                    param_type,
                }))
            })
            .collect();
        self.graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase {
                name: dump.selector.clone(),
                location: dump.location,
                availability: dump.availability,
                usr: dump.usr,
                is_definition: true,
                module,
                ..DeclBase::default()
            },
            selector: dump.selector,
            return_type,
            parameters,
            is_static: dump.is_static,
            is_variadic: dump.is_variadic,
            is_nil_terminated: dump.is_nil_terminated,
            is_implicit: false,
            owns_returned_reference: dump.owns_returned_reference,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    fn lower_members(
        &mut self,
        methods: Vec<MethodDump>,
        properties: Vec<PropertyDump>,
        module: Option<crate::ModuleId>,
    ) -> (Vec<DeclId>, Vec<DeclId>) {
        let method_ids: Vec<DeclId> = methods
            .into_iter()
            .map(|m| self.lower_method(m, module))
            .collect();

        let find_by_selector = |graph: &MetadataGraph, selector: &str| {
            method_ids
                .iter()
                .copied()
                .find(|&id| graph.decl(id).as_method().map(|m| m.selector.as_str()) == Some(selector))
        };

        let property_ids = properties
            .into_iter()
            .map(|p| {
                let getter = p
                    .getter
                    .as_deref()
                    .and_then(|s| find_by_selector(&self.graph, s));
                let setter = p
                    .setter
                    .as_deref()
                    .and_then(|s| find_by_selector(&self.graph, s));
                if p.getter.is_some() && getter.is_none() {
                    warn!("property `{}` names a getter that is not declared", p.name);
                }
                let property_type = self.lower_type(&p.ty);
                self.graph.add_decl(Declaration::Property(PropertyDecl {
                    base: DeclBase {
                        name: p.name,
                        location: p.location,
                        availability: p.availability,
                        is_definition: true,
                        module,
                        ..DeclBase::default()
                    },
                    property_type,
                    is_readonly: p.readonly,
                    getter,
                    setter,
                    parent: None,
                    has_name_duplicate: false,
                    is_local_duplicate: false,
                }))
            })
            .collect();
        (method_ids, property_ids)
    }

    fn lower_protocol_refs(&mut self, usrs: &[String]) -> Vec<TypeId> {
        usrs.iter().map(|u| self.graph.resolve_or_defer(u)).collect()
    }

    /// Attach a registered container to its module's declaration list and
    /// stamp member back-references.
    fn attach(&mut self, id: DeclId) {
        if let Some(module) = self.graph.decl(id).base().module {
            self.graph.module_mut(module).declarations.insert(id);
        }
        if let Some((methods, properties)) = self.graph.decl(id).member_lists() {
            let members: Vec<DeclId> =
                methods.iter().chain(properties.iter()).copied().collect();
            for member in members {
                match self.graph.decl_mut(member) {
                    Declaration::Method(m) => m.parent = Some(id),
                    Declaration::Property(p) => p.parent = Some(id),
                    _ => {}
                }
            }
        }
    }

    fn add_declaration(&mut self, dump: DeclarationDump) {
        match dump {
            DeclarationDump::Interface(d) => {
                let base = self.base_from(d.common);
                let module = base.module;
                let super_ref = d.base.as_deref().map(|u| self.graph.resolve_or_defer(u));
                let protocol_refs = self.lower_protocol_refs(&d.protocols);
                let (methods, properties) = self.lower_members(d.methods, d.properties, module);
                let id = self.graph.register(Declaration::Interface(InterfaceDecl {
                    base,
                    super_ref,
                    protocol_refs,
                    categories: Vec::new(),
                    methods,
                    properties,
                }));
                self.attach(id);
            }
            DeclarationDump::Protocol(d) => {
                let base = self.base_from(d.common);
                let module = base.module;
                let protocol_refs = self.lower_protocol_refs(&d.protocols);
                let (methods, properties) = self.lower_members(d.methods, d.properties, module);
                let id = self.graph.register(Declaration::Protocol(ProtocolDecl {
                    base,
                    protocol_refs,
                    methods,
                    properties,
                }));
                self.attach(id);
            }
            DeclarationDump::Category(d) => {
                let base = self.base_from(d.common);
                let module = base.module;
                let extended_interface = self.graph.resolve_or_defer(&d.extends);
                let protocol_refs = self.lower_protocol_refs(&d.protocols);
                let (methods, properties) = self.lower_members(d.methods, d.properties, module);
                let id = self.graph.register(Declaration::Category(CategoryDecl {
                    base,
                    extended_interface,
                    protocol_refs,
                    methods,
                    properties,
                }));
                self.attach(id);
            }
            DeclarationDump::Struct(d) => {
                let record = self.lower_record(d);
                let id = self.graph.register(Declaration::Struct(record));
                self.attach(id);
            }
            DeclarationDump::Union(d) => {
                let record = self.lower_record(d);
                let id = self.graph.register(Declaration::Union(record));
                self.attach(id);
            }
            DeclarationDump::Enum(d) => {
                let base = self.base_from(d.common);
                let underlying = d.underlying.as_ref().map(|t| self.lower_type(t));
                let members = d
                    .members
                    .into_iter()
                    .map(|m| {
                        self.graph.add_decl(Declaration::EnumMember(EnumMemberDecl {
                            base: DeclBase::named(m.name),
                            value: m.value,
                        }))
                    })
                    .collect();
                let id = self.graph.register(Declaration::Enum(EnumDecl {
                    base,
                    underlying,
                    members,
                    typedef_name: d.typedef_name,
                }));
                self.attach(id);
            }
            DeclarationDump::Function(d) => {
                let base = self.base_from(d.common);
                let return_type = self.lower_type(&d.returns);
                let parameters = d
                    .parameters
                    .into_iter()
                    .map(|p| {
                        let param_type = self.lower_type(&p.ty);
                        self.graph.add_decl(Declaration::Parameter(ParameterDecl {
                            base: DeclBase::named(p.name),
                            param_type,
                        }))
                    })
                    .collect();
                let id = self.graph.register(Declaration::Function(FunctionDecl {
                    base,
                    return_type,
                    parameters,
                    is_variadic: d.is_variadic,
                    is_nil_terminated: d.is_nil_terminated,
                    owns_returned_reference: d.owns_returned_reference,
                }));
                self.attach(id);
            }
            DeclarationDump::Var(d) => {
                let base = self.base_from(d.common);
                let var_type = self.lower_type(&d.ty);
                let id = self
                    .graph
                    .register(Declaration::Var(VarDecl { base, var_type }));
                self.attach(id);
            }
            DeclarationDump::Typedef(d) => {
                let base = self.base_from(d.common);
                let underlying = self.lower_type(&d.underlying);
                let id = self
                    .graph
                    .register(Declaration::Typedef(TypedefDecl { base, underlying }));
                self.attach(id);
            }
        }
    }

    fn lower_record(&mut self, d: RecordDump) -> RecordDecl {
        let base = self.base_from(d.common);
        let fields = d
            .fields
            .into_iter()
            .map(|f| {
                let field_type = self.lower_type(&f.ty);
                self.graph.add_decl(Declaration::Field(FieldDecl {
                    base: DeclBase::named(f.name),
                    field_type,
                }))
            })
            .collect();
        RecordDecl {
            base,
            fields,
            typedef_name: d.typedef_name,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::DeclKind;

    #[test]
    fn replays_a_dump_in_visitation_order() {
        let dump: GraphDump = toml::from_str(
            r#"
            [[declarations]]
            kind = "interface"
            name = "NSObject"
            usr = "c:objc(cs)NSObject"
            module = "ObjectiveC"

            [[declarations.methods]]
            selector = "description"
            returns = { kind = "id" }
            "#,
        )
        .unwrap();

        let graph = GraphBuilder::build(dump);
        let id = graph.lookup_usr("c:objc(cs)NSObject").unwrap();
        let iface = graph.decl(id).as_interface().unwrap();
        assert_eq!(iface.methods.len(), 1);
        let method = graph.decl(iface.methods[0]).as_method().unwrap();
        assert_eq!(method.selector, "description");
        assert_eq!(method.parent, Some(id));
        assert_eq!(
            graph.decl(id).base().module.map(|m| graph.module(m).full_name.clone()),
            Some("ObjectiveC".to_string())
        );
    }

    #[test]
    fn category_seen_before_its_interface_resolves_to_the_same_slot() {
        let dump: GraphDump = toml::from_str(
            r#"
            [[declarations]]
            kind = "category"
            name = "NSDateExtensions"
            usr = "c:objc(cy)NSDate@NSDateExtensions"
            extends = "c:objc(cs)NSDate"

            [[declarations]]
            kind = "interface"
            name = "NSDate"
            usr = "c:objc(cs)NSDate"
            "#,
        )
        .unwrap();

        let graph = GraphBuilder::build(dump);
        let category = graph.lookup_name(DeclKind::Category, "NSDateExtensions").unwrap();
        let interface = graph.lookup_usr("c:objc(cs)NSDate").unwrap();
        let extended = graph.decl(category).as_category().unwrap().extended_interface;
        assert_eq!(graph.target_of(extended), Some(interface));
    }

    #[test]
    fn unknown_references_stay_pending_until_finalize() {
        let dump: GraphDump = toml::from_str(
            r#"
            [[declarations]]
            kind = "var"
            name = "kSharedDateFormatter"
            type = { kind = "pointer", target = { kind = "reference", usr = "c:objc(cs)NSDateFormatter" } }
            "#,
        )
        .unwrap();

        let mut graph = GraphBuilder::build(dump);
        assert!(graph.has_pending_references());
        graph.finalize();
        assert!(!graph.has_pending_references());
    }
}
