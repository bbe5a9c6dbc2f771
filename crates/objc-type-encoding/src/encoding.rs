// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The structural encoding value and its canonical string grammar.
//!
//! Every distinct shape has exactly one string form, and structural
//! equality is defined as string-form equality. The grammar extends the
//! classic runtime `@encode` tags:
//!
//! - scalars keep their single-character tags (`v`, `i`, `d`, ...), with
//!   `u` for unichar;
//! - `@"Name"` / `@"Module.Name"` names a concrete interface, while plain
//!   `@` is a dynamically typed object regardless of protocol constraints
//!   (the runtime does not dispatch on them);
//! - `{Name}` / `(Name)` name records; anonymous records inline their
//!   fields as `{?="x"i"y"d}`;
//! - call shapes are wrapped in `?F<...>` / `?B<...>` so a pointer to a
//!   function is never confused with a pointer to a struct.

use crate::visitor::EncodingVisitor;
use std::fmt;

/// Built-in scalar encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Void,
    Bool,
    Char,
    UChar,
    Unichar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
}

impl ScalarKind {
    /// Canonical grammar tag.
    pub fn tag(&self) -> char {
        match self {
            ScalarKind::Void => 'v',
            ScalarKind::Bool => 'B',
            ScalarKind::Char => 'c',
            ScalarKind::UChar => 'C',
            ScalarKind::Unichar => 'u',
            ScalarKind::Short => 's',
            ScalarKind::UShort => 'S',
            ScalarKind::Int => 'i',
            ScalarKind::UInt => 'I',
            ScalarKind::Long => 'l',
            ScalarKind::ULong => 'L',
            ScalarKind::LongLong => 'q',
            ScalarKind::ULongLong => 'Q',
            ScalarKind::Float => 'f',
            ScalarKind::Double => 'd',
        }
    }
}

/// Return and parameter encodings of a function pointer or block.
#[derive(Debug, Clone)]
pub struct CallEncoding {
    pub returns: Box<TypeEncoding>,
    pub parameters: Vec<TypeEncoding>,
}

/// An immutable, structurally-compared encoding value. No link back to any
/// declaration.
#[derive(Debug, Clone)]
pub enum TypeEncoding {
    Scalar(ScalarKind),
    CString,
    Selector,
    Class,
    Protocol,
    Instancetype,
    /// Dynamically typed object. Protocol names are carried in the value
    /// for consumers that want them but never reach the string form.
    Id {
        protocols: Vec<String>,
    },
    Interface {
        name: String,
        module: Option<String>,
    },
    Pointer(Box<TypeEncoding>),
    ConstantArray {
        element: Box<TypeEncoding>,
        size: usize,
    },
    IncompleteArray(Box<TypeEncoding>),
    Struct(String),
    Union(String),
    AnonymousStruct(Vec<(String, TypeEncoding)>),
    AnonymousUnion(Vec<(String, TypeEncoding)>),
    FunctionPointer(CallEncoding),
    Block(CallEncoding),
}

impl TypeEncoding {
    /// Double dispatch over the encoding shape, so that unrelated
    /// consumers can each supply their own interpretation.
    pub fn accept<V: EncodingVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            TypeEncoding::Scalar(kind) => visitor.visit_scalar(*kind),
            TypeEncoding::CString => visitor.visit_cstring(),
            TypeEncoding::Selector => visitor.visit_selector(),
            TypeEncoding::Class => visitor.visit_class(),
            TypeEncoding::Protocol => visitor.visit_protocol(),
            TypeEncoding::Instancetype => visitor.visit_instancetype(),
            TypeEncoding::Id { protocols } => visitor.visit_id(protocols),
            TypeEncoding::Interface { name, module } => {
                visitor.visit_interface(name, module.as_deref())
            }
            TypeEncoding::Pointer(pointee) => visitor.visit_pointer(pointee),
            TypeEncoding::ConstantArray { element, size } => {
                visitor.visit_constant_array(element, *size)
            }
            TypeEncoding::IncompleteArray(element) => visitor.visit_incomplete_array(element),
            TypeEncoding::Struct(name) => visitor.visit_struct(name),
            TypeEncoding::Union(name) => visitor.visit_union(name),
            TypeEncoding::AnonymousStruct(fields) => visitor.visit_anonymous_struct(fields),
            TypeEncoding::AnonymousUnion(fields) => visitor.visit_anonymous_union(fields),
            TypeEncoding::FunctionPointer(call) => visitor.visit_function(call),
            TypeEncoding::Block(call) => visitor.visit_block(call),
        }
    }
}

/// Produces the canonical grammar. Also the reference implementation of
/// [`EncodingVisitor`].
struct CanonicalForm;

impl CanonicalForm {
    fn call(&mut self, marker: char, call: &CallEncoding) -> String {
        let mut out = format!("?{}<{}", marker, call.returns.accept(self));
        for param in &call.parameters {
            out.push_str(&param.accept(self));
        }
        out.push('>');
        out
    }

    fn record(&mut self, open: char, close: char, fields: &[(String, TypeEncoding)]) -> String {
        let mut out = format!("{}?=", open);
        for (name, encoding) in fields {
            out.push('"');
            out.push_str(name);
            out.push('"');
            out.push_str(&encoding.accept(self));
        }
        out.push(close);
        out
    }
}

impl EncodingVisitor for CanonicalForm {
    type Output = String;

    fn visit_scalar(&mut self, kind: ScalarKind) -> String {
        kind.tag().to_string()
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
        "P".to_string()
    }

    fn visit_instancetype(&mut self) -> String {
        "t".to_string()
    }

    fn visit_id(&mut self, _protocols: &[String]) -> String {
        "@".to_string()
    }

    fn visit_interface(&mut self, name: &str, module: Option<&str>) -> String {
        match module {
            Some(module) => format!("@\"{}.{}\"", module, name),
            None => format!("@\"{}\"", name),
        }
    }

    fn visit_pointer(&mut self, pointee: &TypeEncoding) -> String {
        format!("^{}", pointee.accept(self))
    }

    fn visit_constant_array(&mut self, element: &TypeEncoding, size: usize) -> String {
        format!("[{}{}]", size, element.accept(self))
    }

    fn visit_incomplete_array(&mut self, element: &TypeEncoding) -> String {
        format!("[{}]", element.accept(self))
    }

    fn visit_struct(&mut self, name: &str) -> String {
        format!("{{{}}}", name)
    }

    fn visit_union(&mut self, name: &str) -> String {
        format!("({})", name)
    }

    fn visit_anonymous_struct(&mut self, fields: &[(String, TypeEncoding)]) -> String {
        self.record('{', '}', fields)
    }

    fn visit_anonymous_union(&mut self, fields: &[(String, TypeEncoding)]) -> String {
        self.record('(', ')', fields)
    }

    fn visit_function(&mut self, call: &CallEncoding) -> String {
        self.call('F', call)
    }

    fn visit_block(&mut self, call: &CallEncoding) -> String {
        self.call('B', call)
    }
}

impl fmt::Display for TypeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.accept(&mut CanonicalForm))
    }
}

// Structural equality is string-form equality.
impl PartialEq for TypeEncoding {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for TypeEncoding {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(TypeEncoding::Scalar(ScalarKind::Int).to_string(), "i");
        assert_eq!(
            TypeEncoding::Pointer(Box::new(TypeEncoding::Scalar(ScalarKind::Void))).to_string(),
            "^v"
        );
        assert_eq!(
            TypeEncoding::Interface {
                name: "NSString".into(),
                module: Some("Foundation".into()),
            }
            .to_string(),
            "@\"Foundation.NSString\""
        );
        assert_eq!(TypeEncoding::Struct("CGRect".into()).to_string(), "{CGRect}");
        assert_eq!(
            TypeEncoding::AnonymousStruct(vec![
                ("x".into(), TypeEncoding::Scalar(ScalarKind::Int)),
                ("y".into(), TypeEncoding::Scalar(ScalarKind::Double)),
            ])
            .to_string(),
            "{?=\"x\"i\"y\"d}"
        );
        assert_eq!(
            TypeEncoding::Block(CallEncoding {
                returns: Box::new(TypeEncoding::Scalar(ScalarKind::Void)),
                parameters: vec![TypeEncoding::Scalar(ScalarKind::Int)],
            })
            .to_string(),
            "?B<vi>"
        );
        assert_eq!(
            TypeEncoding::ConstantArray {
                element: Box::new(TypeEncoding::Scalar(ScalarKind::Char)),
                size: 16,
            }
            .to_string(),
            "[16c]"
        );
    }

    #[test]
    fn protocol_constraints_never_reach_the_string_form() {
        let bare = TypeEncoding::Id { protocols: vec![] };
        let constrained = TypeEncoding::Id {
            protocols: vec!["NSCopying".into(), "NSCoding".into()],
        };
        assert_eq!(bare.to_string(), "@");
        assert_eq!(constrained.to_string(), "@");
        // ...and therefore the two compare equal.
        assert_eq!(bare, constrained);
    }

    #[test]
    fn function_and_block_pointers_are_distinguishable() {
        let call = CallEncoding {
            returns: Box::new(TypeEncoding::Scalar(ScalarKind::Void)),
            parameters: vec![],
        };
        let f = TypeEncoding::FunctionPointer(call.clone());
        let b = TypeEncoding::Block(call);
        assert_ne!(f, b);
        assert_ne!(f.to_string(), TypeEncoding::Struct("F".into()).to_string());
    }
}
