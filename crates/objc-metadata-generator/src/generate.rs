// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The end-to-end pipeline: dump in, metadata blob out.

use crate::Args;
use anyhow::{Context, Result};
use log::info;
use objc_binary_backend::save_metadata;
use objc_graph_passes::default_pipeline;
use objc_model::{default_denylist, GraphBuilder, GraphDump, SymbolDenylist};
use objc_type_encoding::ArchLayout;
use std::fs;
use std::path::Path;

pub fn execute(args: &Args) -> Result<()> {
    let denylist = load_denylist(args.denylist.as_deref())?;

    let dump = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let dump: GraphDump = toml::from_str(&dump)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    let mut graph = GraphBuilder::build(dump);
    info!(
        "constructed {} declaration(s) across {} module(s)",
        graph.decl_count(),
        graph.module_ids().count()
    );

    default_pipeline(denylist).run(&mut graph);

    let layout = ArchLayout {
        pointer_width: args.pointer_width,
    };
    save_metadata(&graph, layout, &args.output)
}

/// The built-in denylist, extended by a user-supplied TOML table when one
/// is given.
fn load_denylist(path: Option<&Path>) -> Result<SymbolDenylist> {
    let mut denylist = default_denylist().clone();
    if let Some(path) = path {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read denylist {}", path.display()))?;
        let extra: SymbolDenylist = toml::from_str(&text)
            .with_context(|| format!("failed to parse denylist {}", path.display()))?;
        denylist.extend(extra);
    }
    Ok(denylist)
}
