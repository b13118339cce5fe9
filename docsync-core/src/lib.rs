#![doc = "docsync-core: orchestration and reconciliation logic for docsync."]

//! This crate holds everything docsync does that is independent of a concrete git
//! hosting platform or text-generation service: the action orchestrator, the
//! branch and pull request reconcilers, documentation discovery, the quality gate
//! and the persisted change-link store.
//!
//! Platform access goes through the traits in [`contract`]; the `docsync` CLI crate
//! provides the HTTP implementations.
//!
//! # Usage
//! Build an [`action::ActionContext`] from a gateway and a generator, then call
//! [`pipeline::run_reconciliation_pipeline`], or drive individual actions through an
//! [`orchestrator::Orchestrator`].

pub mod action;
pub mod actions;
pub mod branch;
pub mod config;
pub mod contract;
pub mod discovery;
pub mod error;
pub mod links;
pub mod matching;
pub mod orchestrator;
pub mod pipeline;
pub mod pull_request;
pub mod quality;
pub mod state;
pub mod targeting;

pub use error::PipelineError;
