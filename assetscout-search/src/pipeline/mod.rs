//! The aggregation and ranking pipeline.
//!
//! Retrieval → extraction → canonicalisation → classification → tagging →
//! aggregation. Only [`retrieval`] awaits; every other stage is synchronous.

pub mod aggregate;
pub mod canonical;
pub mod classify;
pub mod dedup;
pub mod retrieval;
pub mod scoring;
pub mod search;
pub mod tagger;
