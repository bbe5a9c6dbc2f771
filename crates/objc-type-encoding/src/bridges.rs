// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Well-known bridged typedef aliases.
//!
//! A typedef normally unwraps to its underlying type, but a handful of
//! aliases carry more meaning than their spelling: boolean aliases, the
//! UTF-16 code unit alias, and toll-free-bridged opaque pointer types. The
//! table is a fixed, explicit name -> encoding mapping established before
//! any pass runs; nothing is inferred.

use crate::encoding::{ScalarKind, TypeEncoding};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

static BRIDGE_TABLE: Lazy<BTreeMap<&'static str, TypeEncoding>> = Lazy::new(|| {
    let interface = |name: &str| TypeEncoding::Interface {
        name: name.to_string(),
        module: Some("Foundation".to_string()),
    };
    BTreeMap::from([
        ("BOOL", TypeEncoding::Scalar(ScalarKind::Bool)),
        ("Boolean", TypeEncoding::Scalar(ScalarKind::Bool)),
        ("unichar", TypeEncoding::Scalar(ScalarKind::Unichar)),
        ("UniChar", TypeEncoding::Scalar(ScalarKind::Unichar)),
        // Toll-free bridged CoreFoundation handles.
        ("CFStringRef", interface("NSString")),
        ("CFMutableStringRef", interface("NSMutableString")),
        ("CFArrayRef", interface("NSArray")),
        ("CFMutableArrayRef", interface("NSMutableArray")),
        ("CFDictionaryRef", interface("NSDictionary")),
        ("CFMutableDictionaryRef", interface("NSMutableDictionary")),
        ("CFErrorRef", interface("NSError")),
        ("CFDateRef", interface("NSDate")),
        ("CFDataRef", interface("NSData")),
    ])
});

/// Encoding substituted for a bridged typedef, if the name is registered.
pub fn bridged_encoding(typedef_name: &str) -> Option<TypeEncoding> {
    BRIDGE_TABLE.get(typedef_name).cloned()
}
