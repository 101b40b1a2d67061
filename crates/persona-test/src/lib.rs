//! Persona Test - Shared test utilities for the persona runtime.
//!
//! This crate provides mock collaborators and test helpers that can be
//! used across the workspace as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! persona-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use persona_test::prelude::*;
//!
//! #[tokio::test]
//! async fn test_text_turn() {
//!     let model = MockModelProvider::new(vec![MockTurn::text("hello")]);
//!     let response = model.chat(&[], &ChatOptions::default()).await.unwrap();
//!     assert_eq!(response.content, "hello");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mock_llm;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mock_llm::*;
pub use mocks::*;
