// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The pass pipeline.

use log::debug;
use objc_model::{MetadataGraph, SymbolDenylist};

/// A single full-graph transformation.
pub trait GraphPass {
    fn run(&self, graph: &mut MetadataGraph);

    fn name(&self) -> String;
}

/// Runs passes in order. Passes mutate the shared graph in place; the
/// pipeline never runs two of them concurrently.
#[derive(Default)]
pub struct GraphPipeline {
    passes: Vec<Box<dyn GraphPass>>,
}

impl GraphPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: Box<dyn GraphPass>) {
        self.passes.push(pass);
    }

    pub fn run(&self, graph: &mut MetadataGraph) {
        for pass in &self.passes {
            debug!("running graph pass `{}`", pass.name());
            pass.run(graph);
        }
    }
}

/// The standard pipeline: resolve, fix up, filter, rename, dedup, order.
pub fn default_pipeline(denylist: SymbolDenylist) -> GraphPipeline {
    let mut pipeline = GraphPipeline::new();
    pipeline.add_pass(crate::FinalizeReferencesPass::new());
    pipeline.add_pass(crate::CategoryAttachmentPass::new());
    pipeline.add_pass(crate::ParameterDisambiguationPass::new());
    pipeline.add_pass(crate::AccessorSynthesisPass::new());
    pipeline.add_pass(crate::InertRecordSweepPass::new());
    pipeline.add_pass(crate::ModuleReinsertionPass::new());
    pipeline.add_pass(crate::SupportFilterPass::new(denylist));
    pipeline.add_pass(crate::NamingPass::new());
    pipeline.add_pass(crate::DeduplicationPass::new());
    pipeline.add_pass(crate::MemberOrderingPass::new());
    pipeline
}
