//! Batch Comprehensive Test Suite
//!
//! End-to-end tests of the public API against the in-memory engine.
//!
//! ## Test Tiers
//!
//! - **Tier 1**: Shorthand forms: equivalent inputs run the same batch
//! - **Tier 2**: Worked scenarios: the documented example batches
//! - **Tier 3**: Ordering: serial total order, parallel dispatch
//! - **Tier 4**: Failure: first failure wins, transaction outcomes
//! - **Tier 5**: Options: TOML configuration
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test batch_comprehensive
//! ```

// Test modules
mod test_utils;

mod tier1_shorthand_forms;
mod tier2_scenarios;
mod tier3_ordering;
mod tier4_failures;
mod tier5_options;
