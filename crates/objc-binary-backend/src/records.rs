// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The symbolic record heap.
//!
//! Phase one of serialization builds this: records, arrays and interned
//! strings addressed by handle, with every cross-reference held as a
//! [`RefSlot`] rather than a byte offset. Phase two (the layout step)
//! assigns offsets and resolves the slots.

use bitflags::bitflags;
use indexmap::IndexSet;

pub type RecordId = usize;
pub type StringId = usize;
pub type ArrayId = usize;

bitflags! {
    /// Kind-specific boolean attributes, packed into every record header.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct RecordFlags: u16 {
        const UNAVAILABLE              = 1 << 0;
        const APP_EXTENSION_AVAILABLE  = 1 << 1;
        const IS_VARIADIC              = 1 << 2;
        const IS_NIL_TERMINATED        = 1 << 3;
        const OWNS_RETURNED_REFERENCE  = 1 << 4;
        const IS_STATIC                = 1 << 5;
        const IS_IMPLICIT              = 1 << 6;
        const HAS_NAME_DUPLICATE       = 1 << 7;
        const IS_LOCAL_DUPLICATE       = 1 << 8;
        const IS_INITIALIZER           = 1 << 9;
        const IS_READONLY              = 1 << 10;
        const HAS_SETTER               = 1 << 11;
    }
}

/// Record kind tag, the first byte of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Interface = 0,
    Protocol = 1,
    Struct = 2,
    Enum = 3,
    Function = 4,
    Var = 5,
    Typedef = 6,
    Method = 7,
    Property = 8,
}

/// A cross-reference that has no byte offset yet. `Null` resolves to 0,
/// which no real target can occupy (offset 0 is the root table count).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSlot {
    Null,
    String(StringId),
    Record(RecordId),
    Array(ArrayId),
}

/// One serialized field of a record or array element.
#[derive(Debug, Clone, Copy)]
pub enum Field {
    U16(u16),
    U32(u32),
    I64(i64),
    Ref(RefSlot),
}

impl Field {
    pub fn byte_size(&self) -> usize {
        match self {
            Field::U16(_) => 2,
            Field::U32(_) | Field::Ref(_) => 4,
            Field::I64(_) => 8,
        }
    }
}

/// A tagged record: kind byte followed by its fields.
#[derive(Debug, Clone)]
pub struct MetaRecord {
    pub kind: RecordKind,
    pub fields: Vec<Field>,
}

impl MetaRecord {
    pub fn byte_size(&self) -> usize {
        1 + self.fields.iter().map(Field::byte_size).sum::<usize>()
    }
}

/// A count-prefixed array. `count` is the logical element count; the
/// fields may hold more entries than that when elements are tuples.
#[derive(Debug, Clone)]
pub struct ArrayData {
    pub count: u32,
    pub fields: Vec<Field>,
}

impl ArrayData {
    pub fn byte_size(&self) -> usize {
        4 + self.fields.iter().map(Field::byte_size).sum::<usize>()
    }
}

/// The phase-one arena. Strings are interned by value, so two logical
/// occurrences of the same text share one heap slot.
#[derive(Default)]
pub struct RecordHeap {
    pub strings: IndexSet<String>,
    pub arrays: Vec<ArrayData>,
    pub records: Vec<MetaRecord>,
}

impl RecordHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, value: &str) -> StringId {
        self.strings.insert_full(value.to_string()).0
    }

    pub fn string_ref(&mut self, value: &str) -> RefSlot {
        RefSlot::String(self.intern(value))
    }

    pub fn add_record(&mut self, record: MetaRecord) -> RecordId {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn add_array(&mut self, array: ArrayData) -> ArrayId {
        self.arrays.push(array);
        self.arrays.len() - 1
    }
}
