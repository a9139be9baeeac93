//! WebStack Cloud Declarations
//!
//! This crate provides the provider-neutral model that stack definitions are
//! assembled into before being handed to a provisioning engine.
//!
//! A stack is a set of resources keyed by logical ID. Dependencies between
//! resources are kept as an explicit graph (declared `DependsOn` edges plus the
//! edges implied by `Ref` / `Fn::GetAtt`), so the creation and teardown order can
//! be computed and checked without provisioning anything.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  webstack CLI                    │
//! │            (synth / plan / validate)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               webstack-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   App ─► Stack ─► Resource / Output       │   │
//! │  │   trait Construct { ... }                 │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Dep. Graph   │  │  Template    │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼──────────┐
//! │ webstack-cloud-  │
//! │ aws (constructs) │
//! └──────────────────┘
//! ```

pub mod action;
pub mod app;
pub mod error;
pub mod graph;
pub mod intrinsic;
pub mod logical_id;
pub mod resource;
pub mod stack;
pub mod template;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use app::{App, Environment, MANIFEST_FILE};
pub use error::{CloudError, Result};
pub use graph::DependencyGraph;
pub use logical_id::LogicalId;
pub use resource::{Construct, Output, Parameter, Resource, Tag};
pub use stack::{MAX_STACK_NAME_LEN, Stack, validate_stack_name};
pub use template::Template;
