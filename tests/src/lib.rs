//! # Web3 Bridge Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs        # host harness, mock upstream, provider fixtures
//!     ├── flows.rs          # single-provider request flows
//!     └── cross_context.rs  # sibling providers sharing one directory
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p wb-tests
//!
//! # By category
//! cargo test -p wb-tests integration::flows::
//! cargo test -p wb-tests integration::cross_context::
//!
//! # Benchmarks
//! cargo bench -p wb-tests
//! ```

#![allow(dead_code)]
