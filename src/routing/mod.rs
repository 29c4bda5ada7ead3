//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at provider construction):
//!     (verb, template, params, handler)
//!     → rule.rs (split template, check slots and body binding)
//!     → router.rs (ordered table, frozen)
//!
//! Incoming Request (method, segments, query, body)
//!     → router.rs (collect every applicable rule)
//!     → rule.rs (positional match, bind, coerce)
//!     → handler.rs (await each handler in declaration order)
//!     → Return: merged partial, authoritative response, or no-match
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex: literal segments compare exactly
//! - Deterministic: declaration order is invocation order

pub mod handler;
pub mod router;
pub mod rule;

pub use handler::{handler, sync_handler, Args, Call, Handler};
pub use router::{Outcome, Router};
pub use rule::{Param, ParamType, Rule, RuleBuilder, RuleError};
