// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Phase two: heap linearization.
//!
//! A small linker. Every string, record and array gets an absolute byte
//! offset from the start of the file, computed purely from the sizes of
//! what precedes it; then the whole heap is written out with each
//! [`RefSlot`] resolved to its target's offset. The file starts with the
//! root symbol table, sorted by name bytes, so lookups can binary-search
//! without reading the heap.

use crate::records::{Field, RecordHeap, RecordId, RefSlot, StringId};
use crate::writer::BinaryWriter;

struct Layout {
    string_offsets: Vec<usize>,
    record_offsets: Vec<usize>,
    array_offsets: Vec<usize>,
}

impl Layout {
    fn assign(heap: &RecordHeap, root_count: usize) -> Self {
        let mut cursor = 4 + 8 * root_count;

        let mut string_offsets = Vec::with_capacity(heap.strings.len());
        for s in &heap.strings {
            string_offsets.push(cursor);
            cursor += s.len() + 1;
        }
        let mut record_offsets = Vec::with_capacity(heap.records.len());
        for r in &heap.records {
            record_offsets.push(cursor);
            cursor += r.byte_size();
        }
        let mut array_offsets = Vec::with_capacity(heap.arrays.len());
        for a in &heap.arrays {
            array_offsets.push(cursor);
            cursor += a.byte_size();
        }

        Self {
            string_offsets,
            record_offsets,
            array_offsets,
        }
    }

    fn resolve(&self, slot: RefSlot) -> u32 {
        let offset = match slot {
            RefSlot::Null => 0,
            RefSlot::String(id) => self.string_offsets[id],
            RefSlot::Record(id) => self.record_offsets[id],
            RefSlot::Array(id) => self.array_offsets[id],
        };
        u32::try_from(offset).expect("BUG: metadata blob exceeds 4 GiB")
    }

    fn write_field(&self, writer: &mut BinaryWriter, field: &Field) {
        match field {
            Field::U16(v) => writer.write_u16(*v),
            Field::U32(v) => writer.write_u32(*v),
            Field::I64(v) => writer.write_i64(*v),
            Field::Ref(slot) => writer.write_u32(self.resolve(*slot)),
        }
    }
}

/// Serialize the heap. `roots` maps each top-level external name to its
/// record; entries land in the root table sorted by name bytes.
pub fn linearize(heap: &RecordHeap, roots: &[(StringId, RecordId)]) -> Vec<u8> {
    let mut roots: Vec<(StringId, RecordId)> = roots.to_vec();
    roots.sort_by(|a, b| heap.strings[a.0].cmp(&heap.strings[b.0]));

    let layout = Layout::assign(heap, roots.len());
    let mut writer = BinaryWriter::new();

    writer.write_u32(roots.len() as u32);
    for (name, record) in &roots {
        writer.write_u32(layout.resolve(RefSlot::String(*name)));
        writer.write_u32(layout.resolve(RefSlot::Record(*record)));
    }
    for s in &heap.strings {
        writer.write_str(s);
    }
    for (id, record) in heap.records.iter().enumerate() {
        debug_assert_eq!(writer.position(), layout.record_offsets[id]);
        writer.write_u8(record.kind as u8);
        for field in &record.fields {
            layout.write_field(&mut writer, field);
        }
    }
    for (id, array) in heap.arrays.iter().enumerate() {
        debug_assert_eq!(writer.position(), layout.array_offsets[id]);
        writer.write_u32(array.count);
        for field in &array.fields {
            layout.write_field(&mut writer, field);
        }
    }
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ArrayData, MetaRecord, RecordKind};

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn read_cstr(bytes: &[u8], at: usize) -> &str {
        let end = bytes[at..].iter().position(|&b| b == 0).unwrap();
        std::str::from_utf8(&bytes[at..at + end]).unwrap()
    }

    #[test]
    fn root_table_is_sorted_and_offsets_resolve() {
        let mut heap = RecordHeap::new();
        let zebra = heap.intern("Zebra");
        let apple = heap.intern("Apple");
        let r0 = heap.add_record(MetaRecord {
            kind: RecordKind::Var,
            fields: vec![Field::U16(0)],
        });
        let r1 = heap.add_record(MetaRecord {
            kind: RecordKind::Var,
            fields: vec![Field::U16(1)],
        });

        let bytes = linearize(&heap, &[(zebra, r0), (apple, r1)]);
        assert_eq!(read_u32(&bytes, 0), 2);
        // First entry is Apple despite insertion order.
        let first_name = read_u32(&bytes, 4) as usize;
        assert_eq!(read_cstr(&bytes, first_name), "Apple");
        let first_record = read_u32(&bytes, 8) as usize;
        assert_eq!(bytes[first_record], RecordKind::Var as u8);
        let second_name = read_u32(&bytes, 12) as usize;
        assert_eq!(read_cstr(&bytes, second_name), "Zebra");
    }

    #[test]
    fn shared_strings_resolve_to_one_offset() {
        let mut heap = RecordHeap::new();
        let name = heap.string_ref("NSString");
        let again = heap.string_ref("NSString");
        assert_eq!(name, again);
        let r = heap.add_record(MetaRecord {
            kind: RecordKind::Typedef,
            fields: vec![Field::Ref(name), Field::Ref(again)],
        });
        let root = heap.intern("NSString");
        let bytes = linearize(&heap, &[(root, r)]);

        let record_offset = read_u32(&bytes, 8) as usize;
        let first = read_u32(&bytes, record_offset + 1);
        let second = read_u32(&bytes, record_offset + 5);
        assert_eq!(first, second);
        assert_eq!(read_cstr(&bytes, first as usize), "NSString");
    }

    #[test]
    fn arrays_are_count_prefixed() {
        let mut heap = RecordHeap::new();
        let a = heap.add_array(ArrayData {
            count: 3,
            fields: vec![Field::U32(7), Field::U32(8), Field::U32(9)],
        });
        let r = heap.add_record(MetaRecord {
            kind: RecordKind::Enum,
            fields: vec![Field::Ref(RefSlot::Array(a))],
        });
        let root = heap.intern("Numbers");
        let bytes = linearize(&heap, &[(root, r)]);

        let record_offset = read_u32(&bytes, 8) as usize;
        let array_offset = read_u32(&bytes, record_offset + 1) as usize;
        assert_eq!(read_u32(&bytes, array_offset), 3);
        assert_eq!(read_u32(&bytes, array_offset + 4), 7);
        assert_eq!(read_u32(&bytes, array_offset + 12), 9);
    }
}
