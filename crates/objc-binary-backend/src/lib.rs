// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Binary metadata serializer.
//!
//! Turns the final (named, deduplicated, encoding-resolved) graph into one
//! offset-addressed blob: a root symbol table followed by a heap of tagged
//! records, every pointer an absolute little-endian byte offset. Emission
//! is two-phase - a symbolic record heap first, then a linearization step
//! that assigns offsets and resolves every reference.

mod builder;
mod generator;
mod layout;
mod records;
mod writer;

pub use builder::{GraphRecordSizes, HeapBuilder};
pub use generator::{save_metadata, serialize_graph};
pub use layout::linearize;
pub use records::{
    ArrayData, ArrayId, Field, MetaRecord, RecordFlags, RecordHeap, RecordId, RecordKind, RefSlot,
    StringId,
};
pub use writer::BinaryWriter;
