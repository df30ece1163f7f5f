//! # ludo-store: Persistence + Transactional Engine for Ludo POS
//!
//! SQLite-backed storage for the register: repositories for plain reads
//! and writes, plus the [`engine::RegisterEngine`] - the only component
//! allowed to mutate sales, stock, and the register state together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ludo-store                                     │
//! │                                                                         │
//! │  ┌──────────┐   ┌─────────────────────┐   ┌──────────────────────┐    │
//! │  │  pool    │──►│   repositories      │◄──│      engine          │    │
//! │  │ DbConfig │   │ inventory, sale,    │   │ finalize, reversal,  │    │
//! │  │ Database │   │ cash, register,     │   │ period consolidation │    │
//! │  │ WAL mode │   │ membership          │   │ (transactions)       │    │
//! │  └──────────┘   └─────────────────────┘   └──────────┬───────────┘    │
//! │                                                      │                 │
//! │  ┌──────────────┐   ┌────────────┐                   │                 │
//! │  │  migrations  │   │   notify   │◄──────────────────┘                 │
//! │  │  (embedded)  │   │ ChangeFeed │  best-effort, keyed by table       │
//! │  └──────────────┘   └────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Two Atomic Operations
//!
//! Multiple terminals share one store. Exactly two code paths need
//! cross-terminal atomicity, and both live in the engine as single
//! SQLite transactions built on conditional updates:
//!
//! 1. **Finalize**: `UPDATE inventory SET stock = stock - q WHERE id = ?
//!    AND stock >= q` per line, plus the sale insert. A failed guard
//!    rolls everything back.
//! 2. **Reversal**: the stock restore and the adjusted-sale rewrite
//!    commit together; a reader never sees one without the other.
//!
//! Everything else is a snapshot read, freely recomputable.

pub mod engine;
pub mod error;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use engine::RegisterEngine;
pub use error::{StoreError, StoreResult};
pub use notify::{ChangeEvent, ChangeFeed, EntityTable};
pub use pool::{Database, DbConfig};
