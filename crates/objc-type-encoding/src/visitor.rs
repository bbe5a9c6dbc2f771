// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Generic visitor over encoding shapes.
//!
//! The binary codec and the declaration emitter each interpret encodings in
//! their own way; the visitor keeps the encoding tree independent of both.

use crate::encoding::{CallEncoding, ScalarKind, TypeEncoding};

pub trait EncodingVisitor {
    type Output;

    fn visit_scalar(&mut self, kind: ScalarKind) -> Self::Output;
    fn visit_cstring(&mut self) -> Self::Output;
    fn visit_selector(&mut self) -> Self::Output;
    fn visit_class(&mut self) -> Self::Output;
    fn visit_protocol(&mut self) -> Self::Output;
    fn visit_instancetype(&mut self) -> Self::Output;
    fn visit_id(&mut self, protocols: &[String]) -> Self::Output;
    fn visit_interface(&mut self, name: &str, module: Option<&str>) -> Self::Output;
    fn visit_pointer(&mut self, pointee: &TypeEncoding) -> Self::Output;
    fn visit_constant_array(&mut self, element: &TypeEncoding, size: usize) -> Self::Output;
    fn visit_incomplete_array(&mut self, element: &TypeEncoding) -> Self::Output;
    fn visit_struct(&mut self, name: &str) -> Self::Output;
    fn visit_union(&mut self, name: &str) -> Self::Output;
    fn visit_anonymous_struct(&mut self, fields: &[(String, TypeEncoding)]) -> Self::Output;
    fn visit_anonymous_union(&mut self, fields: &[(String, TypeEncoding)]) -> Self::Output;
    fn visit_function(&mut self, call: &CallEncoding) -> Self::Output;
    fn visit_block(&mut self, call: &CallEncoding) -> Self::Output;
}
