// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The transform from graph type nodes to encoding values.
//!
//! Total over supported types; the supportability predicate must have
//! filtered the graph first. Asking for the encoding of an Unresolved
//! target (or of a type the filter should have dropped) is a programming
//! contract violation and panics.

use crate::bridges::bridged_encoding;
use crate::encoding::{CallEncoding, ScalarKind, TypeEncoding};
use objc_model::{
    CallSignature, DeclId, Declaration, MetadataGraph, PrimitiveKind, RecordDecl, TypeDefinition,
    TypeId,
};

pub struct TypeEncoder<'a> {
    graph: &'a MetadataGraph,
}

impl<'a> TypeEncoder<'a> {
    pub fn new(graph: &'a MetadataGraph) -> Self {
        Self { graph }
    }

    pub fn encode(&self, tid: TypeId) -> TypeEncoding {
        match self.graph.type_def(tid) {
            TypeDefinition::Primitive(kind) => TypeEncoding::Scalar(scalar_kind(*kind)),
            TypeDefinition::Pointer(inner) => self.encode_pointer(*inner),
            TypeDefinition::DeclarationReference(target) => self.encode_reference(*target),
            TypeDefinition::ConstantArray { element, size } => TypeEncoding::ConstantArray {
                element: Box::new(self.encode(*element)),
                size: *size,
            },
            TypeDefinition::IncompleteArray(element) => {
                TypeEncoding::IncompleteArray(Box::new(self.encode(*element)))
            }
            TypeDefinition::FunctionPointer(sig) => {
                TypeEncoding::FunctionPointer(self.encode_call(sig))
            }
            TypeDefinition::Block(sig) => TypeEncoding::Block(self.encode_call(sig)),
            TypeDefinition::Id { protocols } => TypeEncoding::Id {
                protocols: self.protocol_names(protocols),
            },
            TypeDefinition::ClassMeta { .. } => TypeEncoding::Class,
            TypeDefinition::Instancetype => TypeEncoding::Instancetype,
            TypeDefinition::Selector => TypeEncoding::Selector,
            TypeDefinition::ProtocolType => TypeEncoding::Protocol,
            TypeDefinition::Vector { .. }
            | TypeDefinition::Complex(_)
            | TypeDefinition::VaList => {
                panic!("BUG: unsupported type reached the encoder; the support filter must run first")
            }
        }
    }

    /// Pointers to interfaces and to `char` are special-cased: callers must
    /// be able to recover the class name (or the C-string nature) without
    /// re-resolving the pointee.
    fn encode_pointer(&self, inner: TypeId) -> TypeEncoding {
        match self.graph.type_def(inner) {
            TypeDefinition::Primitive(PrimitiveKind::Char)
            | TypeDefinition::Primitive(PrimitiveKind::UnsignedChar) => TypeEncoding::CString,
            TypeDefinition::DeclarationReference(Some(target)) => {
                match self.graph.decl(*target) {
                    Declaration::Interface(_) => self.interface_encoding(*target),
                    _ => TypeEncoding::Pointer(Box::new(self.encode(inner))),
                }
            }
            _ => TypeEncoding::Pointer(Box::new(self.encode(inner))),
        }
    }

    fn encode_reference(&self, target: Option<DeclId>) -> TypeEncoding {
        let target = target
            .expect("BUG: declaration reference still pending; finalize the graph before encoding");
        match self.graph.decl(target) {
            Declaration::Unresolved(u) => panic!(
                "BUG: requested encoding of unresolved symbol `{}`; \
                 it should have been filtered out by the supportability predicate",
                u.base.name
            ),
            Declaration::Interface(_) => self.interface_encoding(target),
            Declaration::Protocol(_) => TypeEncoding::Protocol,
            Declaration::Struct(record) => self.record_encoding(record, false),
            Declaration::Union(record) => self.record_encoding(record, true),
            Declaration::Enum(e) => match e.underlying {
                Some(underlying) => self.encode(underlying),
                None => TypeEncoding::Scalar(ScalarKind::Int),
            },
            Declaration::Typedef(td) => {
                let name = self.graph.decl(target).base().name.clone();
                match bridged_encoding(&name) {
                    Some(bridged) => bridged,
                    None => self.encode(td.underlying),
                }
            }
            other => panic!(
                "BUG: type reference to non-type declaration `{}` ({})",
                other.base().name,
                other.kind()
            ),
        }
    }

    fn interface_encoding(&self, id: DeclId) -> TypeEncoding {
        let decl = self.graph.decl(id);
        let module = decl
            .base()
            .module
            .map(|m| self.graph.module(m).full_name.clone());
        TypeEncoding::Interface {
            name: decl.external_name().to_string(),
            module,
        }
    }

    /// Opaque records encode as void; anonymous ones inline their fields;
    /// named (or typedef'd) records encode by name only.
    fn record_encoding(&self, record: &RecordDecl, is_union: bool) -> TypeEncoding {
        if record.fields.is_empty() {
            return TypeEncoding::Scalar(ScalarKind::Void);
        }
        if record.is_anonymous() && record.typedef_name.is_none() {
            let fields = record
                .fields
                .iter()
                .map(|&field| {
                    let decl = self.graph.decl(field);
                    let encoding = match decl {
                        Declaration::Field(f) => self.encode(f.field_type),
                        _ => panic!("BUG: non-field member in record `{}`", record.base.name),
                    };
                    (decl.base().name.clone(), encoding)
                })
                .collect();
            return if is_union {
                TypeEncoding::AnonymousUnion(fields)
            } else {
                TypeEncoding::AnonymousStruct(fields)
            };
        }
        let name = record.public_name().to_string();
        if is_union {
            TypeEncoding::Union(name)
        } else {
            TypeEncoding::Struct(name)
        }
    }

    fn encode_call(&self, sig: &CallSignature) -> CallEncoding {
        CallEncoding {
            returns: Box::new(self.encode(sig.return_type)),
            parameters: sig.parameters.iter().map(|&p| self.encode(p)).collect(),
        }
    }

    fn protocol_names(&self, protocols: &[TypeId]) -> Vec<String> {
        protocols
            .iter()
            .filter_map(|&tid| self.graph.target_of(tid))
            .filter(|&id| !self.graph.is_unresolved(id))
            .map(|id| self.graph.decl(id).external_name().to_string())
            .collect()
    }
}

fn scalar_kind(kind: PrimitiveKind) -> ScalarKind {
    match kind {
        PrimitiveKind::Void => ScalarKind::Void,
        PrimitiveKind::Bool => ScalarKind::Bool,
        PrimitiveKind::Char => ScalarKind::Char,
        PrimitiveKind::UnsignedChar => ScalarKind::UChar,
        PrimitiveKind::Short => ScalarKind::Short,
        PrimitiveKind::UnsignedShort => ScalarKind::UShort,
        PrimitiveKind::Int => ScalarKind::Int,
        PrimitiveKind::UnsignedInt => ScalarKind::UInt,
        PrimitiveKind::Long => ScalarKind::Long,
        PrimitiveKind::UnsignedLong => ScalarKind::ULong,
        PrimitiveKind::LongLong => ScalarKind::LongLong,
        PrimitiveKind::UnsignedLongLong => ScalarKind::ULongLong,
        PrimitiveKind::Float => ScalarKind::Float,
        PrimitiveKind::Double => ScalarKind::Double,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_model::{DeclBase, FieldDecl, InterfaceDecl, TypedefDecl};

    fn graph_with_interface(name: &str, module: Option<&str>) -> (MetadataGraph, DeclId) {
        let mut graph = MetadataGraph::new();
        let module = module.map(|m| graph.ensure_module(m));
        let id = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase {
                module,
                ..DeclBase::named(name)
            },
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }));
        (graph, id)
    }

    #[test]
    fn pointer_to_interface_encodes_as_the_interface() {
        let (mut graph, id) = graph_with_interface("NSString", Some("Foundation"));
        let r = graph.reference_to(id);
        let ptr = graph.add_type(TypeDefinition::Pointer(r));
        let enc = TypeEncoder::new(&graph).encode(ptr);
        assert_eq!(enc.to_string(), "@\"Foundation.NSString\"");
    }

    #[test]
    fn pointer_to_char_is_a_c_string() {
        let mut graph = MetadataGraph::new();
        let c = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Char));
        let ptr = graph.add_type(TypeDefinition::Pointer(c));
        assert_eq!(TypeEncoder::new(&graph).encode(ptr).to_string(), "*");

        let i = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));
        let iptr = graph.add_type(TypeDefinition::Pointer(i));
        assert_eq!(TypeEncoder::new(&graph).encode(iptr).to_string(), "^i");
    }

    #[test]
    fn bridged_typedef_substitutes_the_bridge_encoding() {
        let mut graph = MetadataGraph::new();
        let c = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Char));
        let td = graph.register(Declaration::Typedef(TypedefDecl {
            base: DeclBase::named("BOOL"),
            underlying: c,
        }));
        let r = graph.reference_to(td);
        assert_eq!(TypeEncoder::new(&graph).encode(r).to_string(), "B");

        // An unregistered typedef unwraps transparently.
        let other = graph.register(Declaration::Typedef(TypedefDecl {
            base: DeclBase::named("MyChar"),
            underlying: c,
        }));
        let r2 = graph.reference_to(other);
        assert_eq!(TypeEncoder::new(&graph).encode(r2).to_string(), "c");
    }

    #[test]
    fn opaque_record_encodes_as_void() {
        let mut graph = MetadataGraph::new();
        let s = graph.register(Declaration::Struct(objc_model::RecordDecl {
            base: DeclBase::named("OpaqueHandle"),
            fields: Vec::new(),
            typedef_name: None,
        }));
        let r = graph.reference_to(s);
        assert_eq!(TypeEncoder::new(&graph).encode(r).to_string(), "v");
    }

    #[test]
    fn anonymous_record_inlines_its_fields() {
        let mut graph = MetadataGraph::new();
        let int = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));
        let dbl = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Double));
        let x = graph.add_decl(Declaration::Field(FieldDecl {
            base: DeclBase::named("x"),
            field_type: int,
        }));
        let y = graph.add_decl(Declaration::Field(FieldDecl {
            base: DeclBase::named("y"),
            field_type: dbl,
        }));
        let s = graph.add_decl(Declaration::Struct(objc_model::RecordDecl {
            base: DeclBase::named(""),
            fields: vec![x, y],
            typedef_name: None,
        }));
        let r = graph.reference_to(s);
        assert_eq!(
            TypeEncoder::new(&graph).encode(r).to_string(),
            "{?=\"x\"i\"y\"d}"
        );
    }

    #[test]
    fn encoding_is_referentially_transparent() {
        let (mut graph, id) = graph_with_interface("NSArray", Some("Foundation"));
        let r = graph.reference_to(id);
        let ptr = graph.add_type(TypeDefinition::Pointer(r));
        let encoder = TypeEncoder::new(&graph);
        assert_eq!(encoder.encode(ptr), encoder.encode(ptr));
        assert_eq!(encoder.encode(ptr).to_string(), encoder.encode(ptr).to_string());
    }

    #[test]
    #[should_panic(expected = "BUG: requested encoding of unresolved symbol")]
    fn encoding_an_unresolved_target_is_fatal() {
        let mut graph = MetadataGraph::new();
        let dangling = graph.resolve_or_defer("c:@S@NeverDefined");
        graph.finalize();
        TypeEncoder::new(&graph).encode(dangling);
    }
}
