//! Domain models for rsk.
//!
//! # Core Concepts
//!
//! - [`Project`]: top-level container owned by one login; every other record
//!   is scoped to exactly one project.
//! - [`Cause`], [`Risk`], [`Effect`], [`Plan`]: the four user-authored record
//!   kinds, linked into cause→risk→effect→plan chains.
//! - [`Triple`]: a materialized cause-risk-effect association; rank is
//!   derived from it as `probability × sum(impact)`.
//! - [`Link`]: a raw directed pair of chunk identifiers (`C12` → `R3`).
//! - [`Task`]: the promoted form of a due plan, carrying a deadline.

mod cause;
mod effect;
mod plan;
mod project;
mod risk;
mod task;
mod triple;

pub use cause::*;
pub use effect::*;
pub use plan::*;
pub use project::*;
pub use risk::*;
pub use task::*;
pub use triple::*;
