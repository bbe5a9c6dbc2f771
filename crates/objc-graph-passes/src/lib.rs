// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Graph transformation passes.
//!
//! Everything between construction and serialization happens here, as a
//! sequence of full-graph passes over shared declaration objects: reference
//! finalization and structural fix-ups, supportability filtering, external
//! naming, hierarchy-aware de-duplication and the deterministic member
//! ordering the binary layout depends on. No two passes ever run
//! concurrently over the same graph.

mod dedup;
mod fixups;
mod naming;
mod ordering;
mod pipeline;
mod support_filter;

pub use dedup::DeduplicationPass;
pub use fixups::{
    AccessorSynthesisPass, CategoryAttachmentPass, FinalizeReferencesPass, InertRecordSweepPass,
    ModuleReinsertionPass, ParameterDisambiguationPass,
};
pub use naming::NamingPass;
pub use ordering::MemberOrderingPass;
pub use pipeline::{default_pipeline, GraphPass, GraphPipeline};
pub use support_filter::SupportFilterPass;
