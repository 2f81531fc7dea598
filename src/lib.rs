//! # Repertoire
//!
//! Category-tree core for an opening repertoire: identity-preserving
//! reconciliation of incoming (possibly partial) trees, cascading `aiConfig`
//! inheritance, and filter/sort/paginate queries over the flattened tree.
//!
//! Persistence stays behind the [`CategoryStore`] trait; [`SyncCoordinator`]
//! drives the pure pieces ([`Reconciler`], [`Forest`], [`ConfigResolver`],
//! [`GridQueryEngine`]) against it.

pub mod config;
pub mod error;
pub mod grid;
pub mod inherit;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod node;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod tree;

pub use config::TaxonomyConfig;
pub use error::{StoreError, TreeError};
pub use grid::{GridPage, GridQuery, GridQueryEngine, GridRow};
pub use inherit::{ConfigResolver, ConfigSchema, MergePolicy};
pub use node::{CategoryInput, CategoryNode, ConfigMap, NodeId};
pub use reconcile::{MergeStats, Reconciler};
pub use store::{CategoryStore, MemoryStore, SubtreeWrite};
pub use sync::{parse_batch, BatchFailure, BatchReport, Ensured, SyncCoordinator};
pub use tree::{flatten, FlatRow, Forest, NodeIndex, TreeLimits};
