//! Reconciles loosely-structured restaurant spreadsheet exports into
//! analysis-ready tables and scalar business-health metrics: a unified daily
//! sales/ads/context series, a break-even + runway snapshot, and
//! lifetime-value customer segments.
//!
//! The pipeline is a single-threaded batch: fetch grids through the
//! [`fetch::GridSource`] collaborator, normalize them in [`loader`], then run
//! the pure computations in [`master`], [`finance`], [`segment`] and
//! [`marketing`]. Every pass is idempotent for identical grids and holds no
//! state between invocations.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod finance;
pub mod loader;
pub mod marketing;
pub mod master;
pub mod normalize;
pub mod segment;
