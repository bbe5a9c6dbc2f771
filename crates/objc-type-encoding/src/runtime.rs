// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Runtime (compiler) member encodings.
//!
//! Besides the structural grammar, every function and method record carries
//! the classic offset-annotated runtime encoding the Objective-C runtime
//! expects, e.g. `v20@0:4i8d12` for `fooWithParam:secondParam:` taking
//! `(int, double)`. Offsets depend on the target architecture, so the
//! generator is parameterized by pointer width; an outer driver runs one
//! whole pipeline per architecture.

use crate::encoding::{CallEncoding, ScalarKind, TypeEncoding};
use crate::visitor::EncodingVisitor;

/// Byte-size model of one target architecture.
#[derive(Debug, Clone, Copy)]
pub struct ArchLayout {
    pub pointer_width: usize,
}

impl Default for ArchLayout {
    fn default() -> Self {
        // 32-bit device slices; the driver overrides for 64-bit runs.
        Self { pointer_width: 4 }
    }
}

/// Resolves the byte size of a record named in an encoding. The backend
/// implements this over the declaration graph; encodings alone do not know
/// record layouts.
pub trait RecordLayoutProvider {
    fn record_size(&self, name: &str, layout: &ArchLayout) -> Option<usize>;
}

/// Provider for contexts where no named record can occur.
impl RecordLayoutProvider for () {
    fn record_size(&self, _name: &str, _layout: &ArchLayout) -> Option<usize> {
        None
    }
}

impl ArchLayout {
    pub fn size_of(&self, encoding: &TypeEncoding, records: &dyn RecordLayoutProvider) -> usize {
        match encoding {
            TypeEncoding::Scalar(kind) => self.scalar_size(*kind),
            TypeEncoding::CString
            | TypeEncoding::Selector
            | TypeEncoding::Class
            | TypeEncoding::Protocol
            | TypeEncoding::Instancetype
            | TypeEncoding::Id { .. }
            | TypeEncoding::Interface { .. }
            | TypeEncoding::Pointer(_)
            | TypeEncoding::IncompleteArray(_)
            | TypeEncoding::FunctionPointer(_)
            | TypeEncoding::Block(_) => self.pointer_width,
            TypeEncoding::ConstantArray { element, size } => {
                size * self.size_of(element, records)
            }
            TypeEncoding::Struct(name) | TypeEncoding::Union(name) => records
                .record_size(name, self)
                .unwrap_or_else(|| panic!("BUG: byte size of record `{}` is not known", name)),
            TypeEncoding::AnonymousStruct(fields) => fields
                .iter()
                .map(|(_, f)| self.size_of(f, records))
                .sum(),
            TypeEncoding::AnonymousUnion(fields) => fields
                .iter()
                .map(|(_, f)| self.size_of(f, records))
                .max()
                .unwrap_or(0),
        }
    }

    fn scalar_size(&self, kind: ScalarKind) -> usize {
        match kind {
            ScalarKind::Void => 0,
            ScalarKind::Bool | ScalarKind::Char | ScalarKind::UChar => 1,
            ScalarKind::Unichar | ScalarKind::Short | ScalarKind::UShort => 2,
            ScalarKind::Int | ScalarKind::UInt | ScalarKind::Float => 4,
            ScalarKind::Long | ScalarKind::ULong => self.pointer_width,
            ScalarKind::LongLong | ScalarKind::ULongLong | ScalarKind::Double => 8,
        }
    }

    /// Size a value occupies as a call argument: arrays decay to pointers
    /// and sub-word scalars are promoted to a full word.
    fn argument_size(&self, encoding: &TypeEncoding, records: &dyn RecordLayoutProvider) -> usize {
        match encoding {
            TypeEncoding::ConstantArray { .. } | TypeEncoding::IncompleteArray(_) => {
                self.pointer_width
            }
            other => self.size_of(other, records).max(4),
        }
    }
}

/// Emits classic runtime `@encode` tags. All flavors of object reference
/// collapse to `@` here; the structural grammar is where they stay apart.
pub struct RuntimeEncoder;

impl RuntimeEncoder {
    fn tag(&mut self, encoding: &TypeEncoding) -> String {
        encoding.accept(self)
    }
}

impl EncodingVisitor for RuntimeEncoder {
    type Output = String;

    fn visit_scalar(&mut self, kind: ScalarKind) -> String {
        let tag = match kind {
            ScalarKind::Unichar => 'S',
            other => other.tag(),
        };
        tag.to_string()
    }

    fn visit_cstring(&mut self) -> String {
        "*".to_string()
    }

    fn visit_selector(&mut self) -> String {
        ":".to_string()
    }

    fn visit_class(&mut self) -> String {
        "#".to_string()
    }

    fn visit_protocol(&mut self) -> String {
        "@".to_string()
    }

    fn visit_instancetype(&mut self) -> String {
        "@".to_string()
    }

    fn visit_id(&mut self, _protocols: &[String]) -> String {
        "@".to_string()
    }

    fn visit_interface(&mut self, _name: &str, _module: Option<&str>) -> String {
        "@".to_string()
    }

    fn visit_pointer(&mut self, pointee: &TypeEncoding) -> String {
        format!("^{}", self.tag(pointee))
    }

    fn visit_constant_array(&mut self, element: &TypeEncoding, size: usize) -> String {
        format!("[{}{}]", size, self.tag(element))
    }

    fn visit_incomplete_array(&mut self, element: &TypeEncoding) -> String {
        format!("^{}", self.tag(element))
    }

    fn visit_struct(&mut self, name: &str) -> String {
        format!("{{{}=}}", name)
    }

    fn visit_union(&mut self, name: &str) -> String {
        format!("({}=)", name)
    }

    fn visit_anonymous_struct(&mut self, fields: &[(String, TypeEncoding)]) -> String {
        let inner: String = fields.iter().map(|(_, f)| self.tag(f)).collect();
        format!("{{?={}}}", inner)
    }

    fn visit_anonymous_union(&mut self, fields: &[(String, TypeEncoding)]) -> String {
        let inner: String = fields.iter().map(|(_, f)| self.tag(f)).collect();
        format!("(?={})", inner)
    }

    fn visit_function(&mut self, _call: &CallEncoding) -> String {
        "^?".to_string()
    }

    fn visit_block(&mut self, _call: &CallEncoding) -> String {
        "@?".to_string()
    }
}

/// The runtime encoding of a method: return tag, total argument frame
/// size, then `self`, `_cmd` and every parameter with its byte offset.
pub fn method_signature_encoding(
    layout: &ArchLayout,
    records: &dyn RecordLayoutProvider,
    returns: &TypeEncoding,
    parameters: &[TypeEncoding],
) -> String {
    let ptr = layout.pointer_width;
    let mut encoder = RuntimeEncoder;

    let sizes: Vec<usize> = parameters
        .iter()
        .map(|p| layout.argument_size(p, records))
        .collect();
    let total: usize = 2 * ptr + sizes.iter().sum::<usize>();

    let mut out = format!("{}{}@0:{}", encoder.tag(returns), total, ptr);
    let mut offset = 2 * ptr;
    for (parameter, size) in parameters.iter().zip(sizes) {
        out.push_str(&encoder.tag(parameter));
        out.push_str(&offset.to_string());
        offset += size;
    }
    out
}

/// The runtime encoding of a free function: return tag followed by the
/// parameter tags. Functions have no `self`/`_cmd` slots and no offsets.
pub fn function_signature_encoding(returns: &TypeEncoding, parameters: &[TypeEncoding]) -> String {
    let mut encoder = RuntimeEncoder;
    let mut out = encoder.tag(returns);
    for parameter in parameters {
        out.push_str(&encoder.tag(parameter));
    }
    out
}
