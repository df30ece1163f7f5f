//! # Repositories
//!
//! One repository per table. Repositories own plain reads and single-row
//! writes; anything that must touch several tables atomically (stock
//! decrement + sale insert, stock restore + sale rewrite, period purges)
//! lives in [`crate::engine`] and uses the `pub(crate)` transaction-scoped
//! helpers exposed here.

pub mod cash;
pub mod inventory;
pub mod membership;
pub mod register;
pub mod sale;
