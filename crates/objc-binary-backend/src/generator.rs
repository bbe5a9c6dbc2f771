// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Output emission.

use crate::builder::HeapBuilder;
use crate::layout::linearize;
use anyhow::{Context, Result};
use log::info;
use objc_model::MetadataGraph;
use objc_type_encoding::ArchLayout;
use std::fs;
use std::path::Path;

/// Serialize a fully processed graph to its binary form. Pure; the same
/// graph always yields the same bytes.
pub fn serialize_graph(graph: &MetadataGraph, layout: ArchLayout) -> Vec<u8> {
    let (heap, roots) = HeapBuilder::new(graph, layout).build();
    linearize(&heap, &roots)
}

/// Write the metadata blob to `path`, creating missing parent directories.
/// Idempotent for an unchanged graph.
pub fn save_metadata(graph: &MetadataGraph, layout: ArchLayout, path: &Path) -> Result<()> {
    let bytes = serialize_graph(graph, layout);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    fs::write(path, &bytes)
        .with_context(|| format!("failed to write metadata to {}", path.display()))?;
    info!("wrote {} bytes of metadata to {}", bytes.len(), path.display());
    Ok(())
}
