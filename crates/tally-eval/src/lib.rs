//! # tally-eval
//!
//! Operation interpreter for the tally report engine.
//!
//! This crate provides:
//! - The built-in op interpreter ([`ExecutionContext::evaluate`])
//! - Pull-based derivation of cell values, availability, validation and
//!   operation outcomes, with circular reference detection
//! - Validation and availability check step pipelines
//! - Protocol dispatch for extension ops ([`Protocol`], [`ProtocolFactory`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_eval::{Evaluator, ProtocolRegistry};
//!
//! let protocols = ProtocolRegistry::new();
//! let evaluator = Evaluator::new(&cache, &protocols);
//! let outcome = evaluator.execute_operation(cell).await?;
//! ```

pub mod context;
pub mod error;
pub mod evaluator;
pub mod protocol;
mod pull;
mod steps;

pub use context::{ExecutionContext, DEFAULT_MAX_DEPTH};
pub use error::{OpError, OpResult, SoftOutcome};
pub use evaluator::Evaluator;
pub use protocol::{Protocol, ProtocolFactory, ProtocolFactoryChain, ProtocolRegistry};
pub use pull::CellRead;

// Protocol implementations need the same macro
pub use async_trait::async_trait;
