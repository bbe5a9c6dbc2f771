// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Type encoding calculus.
//!
//! Pure structural transform from the declaration graph's type tree to an
//! immutable [`TypeEncoding`] value with a canonical string grammar. The
//! encoding is what downstream consumers (binary backend, declaration
//! emitter) operate on - they never see `TypeDefinition`.

mod bridges;
mod encoder;
mod encoding;
mod runtime;
mod visitor;

pub use bridges::bridged_encoding;
pub use encoder::TypeEncoder;
pub use encoding::{CallEncoding, ScalarKind, TypeEncoding};
pub use runtime::{
    function_signature_encoding, method_signature_encoding, ArchLayout, RecordLayoutProvider,
    RuntimeEncoder,
};
pub use visitor::EncodingVisitor;
