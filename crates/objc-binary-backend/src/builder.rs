// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Phase one: graph to record heap.
//!
//! One record per surviving top-level declaration, plus nested method and
//! property records referenced from their container's arrays. All
//! cross-references stay symbolic; nothing here knows a byte offset.
//! Interface records fold the members of their categories in, so the
//! emitted class is the whole extension lattice the runtime sees.

use crate::records::{
    ArrayData, Field, MetaRecord, RecordFlags, RecordHeap, RecordId, RecordKind, RefSlot, StringId,
};
use objc_model::{DeclId, Declaration, MetadataGraph, Version};
use objc_type_encoding::{
    function_signature_encoding, method_signature_encoding, ArchLayout, RecordLayoutProvider,
    TypeEncoder, TypeEncoding,
};
use std::collections::{BTreeMap, BTreeSet};

/// Byte sizes of named records, resolved by looking the record up in the
/// graph and summing (or for unions, maxing) its field sizes.
pub struct GraphRecordSizes<'a> {
    graph: &'a MetadataGraph,
}

impl<'a> GraphRecordSizes<'a> {
    pub fn new(graph: &'a MetadataGraph) -> Self {
        Self { graph }
    }
}

impl RecordLayoutProvider for GraphRecordSizes<'_> {
    fn record_size(&self, name: &str, layout: &ArchLayout) -> Option<usize> {
        let encoder = TypeEncoder::new(self.graph);
        for id in self.graph.decl_ids() {
            let (record, is_union) = match self.graph.decl(id) {
                Declaration::Struct(r) => (r, false),
                Declaration::Union(r) => (r, true),
                _ => continue,
            };
            if record.public_name() != name || !self.graph.decl(id).base().is_definition {
                continue;
            }
            let sizes = record.fields.iter().map(|&field| match self.graph.decl(field) {
                Declaration::Field(f) => layout.size_of(&encoder.encode(f.field_type), self),
                other => panic!(
                    "BUG: non-field member `{}` in record `{}`",
                    other.base().name,
                    name
                ),
            });
            return Some(if is_union {
                sizes.max().unwrap_or(0)
            } else {
                sizes.sum()
            });
        }
        None
    }
}

fn packed(version: Option<Version>) -> u32 {
    version.map(|v| v.packed()).unwrap_or(0)
}

/// Builds the symbolic heap for a fully processed graph.
pub struct HeapBuilder<'a> {
    graph: &'a MetadataGraph,
    layout: ArchLayout,
    heap: RecordHeap,
    roots: Vec<(StringId, RecordId)>,
    record_map: BTreeMap<DeclId, RecordId>,
}

impl<'a> HeapBuilder<'a> {
    pub fn new(graph: &'a MetadataGraph, layout: ArchLayout) -> Self {
        Self {
            graph,
            layout,
            heap: RecordHeap::new(),
            roots: Vec::new(),
            record_map: BTreeMap::new(),
        }
    }

    pub fn build(mut self) -> (RecordHeap, Vec<(StringId, RecordId)>) {
        for module in self.graph.module_ids() {
            let declarations: Vec<DeclId> =
                self.graph.module(module).declarations.iter().copied().collect();
            for id in declarations {
                if !matches!(
                    self.graph.decl(id),
                    Declaration::Interface(_)
                        | Declaration::Protocol(_)
                        | Declaration::Struct(_)
                        | Declaration::Enum(_)
                        | Declaration::Function(_)
                        | Declaration::Var(_)
                        | Declaration::Typedef(_)
                ) {
                    continue;
                }
                let record = self.decl_record(id);
                let name = self.heap.intern(self.graph.decl(id).external_name());
                self.roots.push((name, record));
            }
        }
        (self.heap, self.roots)
    }

    /// Record handle for a declaration, built on first request. The record
    /// slot is allocated before the fields are computed, so reference
    /// cycles through base classes terminate.
    fn decl_record(&mut self, id: DeclId) -> RecordId {
        if let Some(&record) = self.record_map.get(&id) {
            return record;
        }
        let kind = match self.graph.decl(id) {
            Declaration::Interface(_) => RecordKind::Interface,
            Declaration::Protocol(_) => RecordKind::Protocol,
            Declaration::Struct(_) => RecordKind::Struct,
            Declaration::Enum(_) => RecordKind::Enum,
            Declaration::Function(_) => RecordKind::Function,
            Declaration::Var(_) => RecordKind::Var,
            Declaration::Typedef(_) => RecordKind::Typedef,
            Declaration::Method(_) => RecordKind::Method,
            Declaration::Property(_) => RecordKind::Property,
            other => panic!("BUG: {} declarations are never serialized", other.kind()),
        };
        let record = self.heap.add_record(MetaRecord {
            kind,
            fields: Vec::new(),
        });
        self.record_map.insert(id, record);

        let (flags, payload) = match self.graph.decl(id) {
            Declaration::Interface(_) | Declaration::Protocol(_) => self.container_payload(id),
            Declaration::Struct(_) => self.struct_payload(id),
            Declaration::Enum(_) => self.enum_payload(id),
            Declaration::Function(_) => self.function_payload(id),
            Declaration::Var(_) => self.var_payload(id),
            Declaration::Typedef(_) => self.typedef_payload(id),
            Declaration::Method(_) => self.method_payload(id),
            Declaration::Property(_) => self.property_payload(id),
            _ => unreachable!(),
        };
        let mut fields = self.header_fields(id, flags);
        fields.extend(payload);
        self.heap.records[record].fields = fields;
        record
    }

    /// Header shared by every record kind: flags, external name, module,
    /// packed iOS availability triple.
    fn header_fields(&mut self, id: DeclId, mut flags: RecordFlags) -> Vec<Field> {
        let decl = self.graph.decl(id);
        let availability = decl.base().availability.clone();
        if availability.ios.unavailable {
            flags |= RecordFlags::UNAVAILABLE;
        }
        if availability.ios_app_extension.is_available() {
            flags |= RecordFlags::APP_EXTENSION_AVAILABLE;
        }
        let name = self.heap.string_ref(self.graph.decl(id).external_name());
        let module = match self.graph.decl(id).base().module {
            Some(m) => self.heap.string_ref(&self.graph.module(m).full_name),
            None => RefSlot::Null,
        };
        vec![
            Field::U16(flags.bits()),
            Field::Ref(name),
            Field::Ref(module),
            Field::U32(packed(availability.ios.introduced)),
            Field::U32(packed(availability.ios.deprecated)),
            Field::U32(packed(availability.ios.obsoleted)),
        ]
    }

    fn encoded_signature(&self, returns: objc_model::TypeId, parameters: &[DeclId]) -> (TypeEncoding, Vec<TypeEncoding>) {
        let encoder = TypeEncoder::new(self.graph);
        let ret = encoder.encode(returns);
        let params = parameters
            .iter()
            .map(|&p| match self.graph.decl(p) {
                Declaration::Parameter(param) => encoder.encode(param.param_type),
                other => panic!("BUG: non-parameter `{}` in a parameter list", other.base().name),
            })
            .collect();
        (ret, params)
    }

    fn call_string(ret: &TypeEncoding, params: &[TypeEncoding]) -> String {
        let mut out = ret.to_string();
        for p in params {
            out.push_str(&p.to_string());
        }
        out
    }

    fn method_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let method = self.graph.decl(id).as_method().expect("method").clone();
        let (ret, params) = self.encoded_signature(method.return_type, &method.parameters);
        let call = Self::call_string(&ret, &params);
        let runtime = method_signature_encoding(
            &self.layout,
            &GraphRecordSizes::new(self.graph),
            &ret,
            &params,
        );

        let mut flags = RecordFlags::empty();
        flags.set(RecordFlags::IS_STATIC, method.is_static);
        flags.set(RecordFlags::IS_VARIADIC, method.is_variadic);
        flags.set(RecordFlags::IS_NIL_TERMINATED, method.is_nil_terminated);
        flags.set(RecordFlags::IS_IMPLICIT, method.is_implicit);
        flags.set(
            RecordFlags::OWNS_RETURNED_REFERENCE,
            method.owns_returned_reference,
        );
        flags.set(RecordFlags::HAS_NAME_DUPLICATE, method.has_name_duplicate);
        flags.set(RecordFlags::IS_LOCAL_DUPLICATE, method.is_local_duplicate);
        flags.set(RecordFlags::IS_INITIALIZER, method.is_initializer());

        let selector = self.heap.string_ref(&method.selector);
        let call = self.heap.string_ref(&call);
        let runtime = self.heap.string_ref(&runtime);
        (
            flags,
            vec![Field::Ref(selector), Field::Ref(call), Field::Ref(runtime)],
        )
    }

    fn function_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let function = match self.graph.decl(id) {
            Declaration::Function(f) => f.clone(),
            _ => unreachable!(),
        };
        let (ret, params) = self.encoded_signature(function.return_type, &function.parameters);
        let call = Self::call_string(&ret, &params);
        let runtime = function_signature_encoding(&ret, &params);

        let mut flags = RecordFlags::empty();
        flags.set(RecordFlags::IS_VARIADIC, function.is_variadic);
        flags.set(RecordFlags::IS_NIL_TERMINATED, function.is_nil_terminated);
        flags.set(
            RecordFlags::OWNS_RETURNED_REFERENCE,
            function.owns_returned_reference,
        );

        let symbol = self.heap.string_ref(&function.base.name);
        let call = self.heap.string_ref(&call);
        let runtime = self.heap.string_ref(&runtime);
        (
            flags,
            vec![Field::Ref(symbol), Field::Ref(call), Field::Ref(runtime)],
        )
    }

    fn property_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let property = self.graph.decl(id).as_property().expect("property").clone();
        let encoder = TypeEncoder::new(self.graph);
        let encoding = encoder.encode(property.property_type).to_string();

        let getter = property
            .getter
            .unwrap_or_else(|| panic!("BUG: property `{}` reached serialization without a getter",
                self.graph.decl(id).base().name));
        let getter = self
            .graph
            .decl(getter)
            .as_method()
            .expect("BUG: property getter is not a method")
            .selector
            .clone();
        let setter = property.setter.map(|s| {
            self.graph
                .decl(s)
                .as_method()
                .expect("BUG: property setter is not a method")
                .selector
                .clone()
        });

        let mut flags = RecordFlags::empty();
        flags.set(RecordFlags::IS_READONLY, property.is_readonly);
        flags.set(RecordFlags::HAS_SETTER, setter.is_some());
        flags.set(RecordFlags::HAS_NAME_DUPLICATE, property.has_name_duplicate);
        flags.set(RecordFlags::IS_LOCAL_DUPLICATE, property.is_local_duplicate);

        let encoding = self.heap.string_ref(&encoding);
        let getter = self.heap.string_ref(&getter);
        let setter = match setter {
            Some(s) => self.heap.string_ref(&s),
            None => RefSlot::Null,
        };
        (
            flags,
            vec![Field::Ref(encoding), Field::Ref(getter), Field::Ref(setter)],
        )
    }

    /// Interface and protocol records: first-initializer index, base class
    /// reference (interfaces only), then the four count-prefixed arrays.
    fn container_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let mut unit = vec![id];
        if let Some(iface) = self.graph.decl(id).as_interface() {
            unit.extend(iface.categories.iter().copied());
        }

        let mut instance_methods: Vec<DeclId> = Vec::new();
        let mut static_methods: Vec<DeclId> = Vec::new();
        let mut properties: Vec<DeclId> = Vec::new();
        let mut protocol_names: BTreeSet<String> = BTreeSet::new();
        for &container in &unit {
            if let Some((methods, props)) = self.graph.decl(container).member_lists() {
                for &m in methods {
                    if self.graph.decl(m).as_method().expect("method").is_static {
                        static_methods.push(m);
                    } else {
                        instance_methods.push(m);
                    }
                }
                properties.extend(props.iter().copied());
            }
            for &tid in self.graph.decl(container).protocol_refs() {
                if let Some(target) = self.graph.target_of(tid) {
                    if !self.graph.is_unresolved(target) {
                        protocol_names.insert(self.graph.decl(target).external_name().to_string());
                    }
                }
            }
        }
        self.sort_members(&mut instance_methods);
        self.sort_members(&mut static_methods);
        self.sort_members(&mut properties);

        let first_initializer = instance_methods
            .iter()
            .position(|&m| self.graph.decl(m).as_method().expect("method").is_initializer())
            .map(|i| i as u32)
            .unwrap_or(u32::MAX);

        let base = match self.graph.decl(id).as_interface() {
            Some(iface) => {
                let target = iface
                    .super_ref
                    .and_then(|tid| self.graph.target_of(tid))
                    .filter(|&t| !self.graph.is_unresolved(t))
                    .filter(|&t| self.graph.decl(t).as_interface().is_some());
                Some(match target {
                    Some(t) => RefSlot::Record(self.decl_record(t)),
                    None => RefSlot::Null,
                })
            }
            None => None,
        };

        let instance_array = self.member_array(&instance_methods);
        let static_array = self.member_array(&static_methods);
        let property_array = self.member_array(&properties);
        let protocol_fields: Vec<Field> = protocol_names
            .iter()
            .map(|name| Field::Ref(self.heap.string_ref(name)))
            .collect();
        let protocol_array = self.heap.add_array(ArrayData {
            count: protocol_names.len() as u32,
            fields: protocol_fields,
        });

        let mut payload = vec![Field::U32(first_initializer)];
        if let Some(base) = base {
            payload.push(Field::Ref(base));
        }
        payload.extend([
            Field::Ref(RefSlot::Array(instance_array)),
            Field::Ref(RefSlot::Array(static_array)),
            Field::Ref(RefSlot::Array(property_array)),
            Field::Ref(RefSlot::Array(protocol_array)),
        ]);
        (RecordFlags::empty(), payload)
    }

    fn sort_members(&self, members: &mut [DeclId]) {
        members.sort_by_cached_key(|&m| {
            let decl = self.graph.decl(m);
            let selector = decl
                .as_method()
                .map(|method| method.selector.clone())
                .unwrap_or_default();
            (decl.external_name().to_string(), selector)
        });
    }

    fn member_array(&mut self, members: &[DeclId]) -> crate::records::ArrayId {
        let fields: Vec<Field> = members
            .iter()
            .map(|&m| Field::Ref(RefSlot::Record(self.decl_record(m))))
            .collect();
        self.heap.add_array(ArrayData {
            count: members.len() as u32,
            fields,
        })
    }

    fn struct_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let record = match self.graph.decl(id) {
            Declaration::Struct(r) => r.clone(),
            _ => unreachable!(),
        };
        let encoder = TypeEncoder::new(self.graph);
        let mut encodings = String::new();
        let mut name_fields = Vec::with_capacity(record.fields.len());
        for &field in &record.fields {
            match self.graph.decl(field) {
                Declaration::Field(f) => {
                    encodings.push_str(&encoder.encode(f.field_type).to_string());
                }
                other => panic!(
                    "BUG: non-field member `{}` in record `{}`",
                    other.base().name,
                    record.base.name
                ),
            }
            let name = self.heap.string_ref(&self.graph.decl(field).base().name);
            name_fields.push(Field::Ref(name));
        }
        let encodings = self.heap.string_ref(&encodings);
        let names = self.heap.add_array(ArrayData {
            count: record.fields.len() as u32,
            fields: name_fields,
        });
        (
            RecordFlags::empty(),
            vec![Field::Ref(encodings), Field::Ref(RefSlot::Array(names))],
        )
    }

    fn enum_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let decl = match self.graph.decl(id) {
            Declaration::Enum(e) => e.clone(),
            _ => unreachable!(),
        };
        let encoder = TypeEncoder::new(self.graph);
        let underlying = match decl.underlying {
            Some(tid) => encoder.encode(tid).to_string(),
            None => "i".to_string(),
        };
        let mut member_fields = Vec::with_capacity(decl.members.len() * 2);
        for &member in &decl.members {
            match self.graph.decl(member) {
                Declaration::EnumMember(m) => {
                    let name = self.heap.string_ref(&m.base.name);
                    member_fields.push(Field::Ref(name));
                    member_fields.push(Field::I64(m.value));
                }
                other => panic!(
                    "BUG: non-member `{}` in enum `{}`",
                    other.base().name,
                    decl.base.name
                ),
            }
        }
        let underlying = self.heap.string_ref(&underlying);
        let members = self.heap.add_array(ArrayData {
            count: decl.members.len() as u32,
            fields: member_fields,
        });
        (
            RecordFlags::empty(),
            vec![Field::Ref(underlying), Field::Ref(RefSlot::Array(members))],
        )
    }

    fn var_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let var_type = match self.graph.decl(id) {
            Declaration::Var(v) => v.var_type,
            _ => unreachable!(),
        };
        let encoding = TypeEncoder::new(self.graph).encode(var_type).to_string();
        let encoding = self.heap.string_ref(&encoding);
        (RecordFlags::empty(), vec![Field::Ref(encoding)])
    }

    fn typedef_payload(&mut self, id: DeclId) -> (RecordFlags, Vec<Field>) {
        let underlying = match self.graph.decl(id) {
            Declaration::Typedef(t) => t.underlying,
            _ => unreachable!(),
        };
        let encoding = TypeEncoder::new(self.graph).encode(underlying).to_string();
        let encoding = self.heap.string_ref(&encoding);
        (RecordFlags::empty(), vec![Field::Ref(encoding)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_model::{
        DeclBase, FieldDecl, InterfaceDecl, MethodDecl, PrimitiveKind, PropertyDecl, RecordDecl,
        TypeDefinition,
    };

    fn method(graph: &mut MetadataGraph, selector: &str, is_static: bool) -> DeclId {
        let void = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Void));
        graph.add_decl(Declaration::Method(MethodDecl {
            base: DeclBase::named(selector),
            selector: selector.to_string(),
            return_type: void,
            parameters: Vec::new(),
            is_static,
            is_variadic: false,
            is_nil_terminated: false,
            is_implicit: false,
            owns_returned_reference: false,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }))
    }

    fn sample_graph() -> (MetadataGraph, DeclId) {
        let mut graph = MetadataGraph::new();
        let module = graph.ensure_module("Foundation");
        let int = graph.add_type(TypeDefinition::Primitive(PrimitiveKind::Int));

        let init = method(&mut graph, "initWithCapacity:", false);
        let count = method(&mut graph, "count", false);
        let array = method(&mut graph, "array", true);
        let prop = graph.add_decl(Declaration::Property(PropertyDecl {
            base: DeclBase::named("count"),
            property_type: int,
            is_readonly: true,
            getter: Some(count),
            setter: None,
            parent: None,
            has_name_duplicate: false,
            is_local_duplicate: false,
        }));
        let iface = graph.register(Declaration::Interface(InterfaceDecl {
            base: DeclBase {
                module: Some(module),
                ..DeclBase::named("NSArray")
            },
            super_ref: None,
            protocol_refs: Vec::new(),
            categories: Vec::new(),
            methods: vec![init, count, array],
            properties: vec![prop],
        }));
        graph.module_mut(module).declarations.insert(iface);
        (graph, iface)
    }

    #[test]
    fn top_level_declarations_become_roots() {
        let (graph, _) = sample_graph();
        let (heap, roots) = HeapBuilder::new(&graph, ArchLayout::default()).build();
        assert_eq!(roots.len(), 1);
        assert_eq!(heap.strings[roots[0].0], "NSArray");
        assert_eq!(heap.records[roots[0].1].kind as u8, RecordKind::Interface as u8);
    }

    #[test]
    fn interface_payload_counts_members_and_finds_the_initializer() {
        let (graph, _) = sample_graph();
        let (heap, roots) = HeapBuilder::new(&graph, ArchLayout::default()).build();
        let record = &heap.records[roots[0].1];
        // Header (6 fields), then first-init index, base ref and 4 arrays.
        assert_eq!(record.fields.len(), 12);
        // Instance methods sort as [count, initWithCapacity]; the
        // initializer is at index 1.
        match record.fields[6] {
            Field::U32(index) => assert_eq!(index, 1),
            _ => panic!("expected the first-initializer index"),
        }
        match record.fields[8] {
            Field::Ref(RefSlot::Array(a)) => assert_eq!(heap.arrays[a].count, 2),
            _ => panic!("expected the instance-method array"),
        }
        match record.fields[9] {
            Field::Ref(RefSlot::Array(a)) => assert_eq!(heap.arrays[a].count, 1),
            _ => panic!("expected the static-method array"),
        }
    }

    #[test]
    fn record_sizes_resolve_through_the_graph() {
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
        graph.register(Declaration::Struct(RecordDecl {
            base: DeclBase::named("CGThing"),
            fields: vec![x, y],
            typedef_name: None,
        }));

        let sizes = GraphRecordSizes::new(&graph);
        let layout = ArchLayout::default();
        assert_eq!(sizes.record_size("CGThing", &layout), Some(12));
        assert_eq!(sizes.record_size("Unknown", &layout), None);
    }
}
