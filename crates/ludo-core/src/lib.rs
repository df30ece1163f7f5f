//! # ludo-core: Pure Business Logic for Ludo POS
//!
//! This crate is the **heart** of Ludo POS: the transaction and
//! cash-reconciliation rules for a small multi-service venue (retail
//! goods plus timed/membership services), expressed as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ludo POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      UI Shell (external)                        │   │
//! │  │    Scan UI ──► Cart UI ──► Tender UI ──► Admin / Day Close     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed API                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ludo-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │  ledger   │  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │  totals   │  │   │
//! │  │   │   Sale    │  │ discounts │  │  debounce │  │ summaries │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CAMERA • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   ludo-store (Database Layer)                   │   │
//! │  │        SQLite, repositories, the transactional engine           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, CashMovement, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`cart`] - Cart session: manual adds, scan adds, debounce
//! - [`qr`] - Product QR payload encode/decode and resolution
//! - [`ledger`] - The single authority for the drawer balance
//! - [`report`] - Export row builders for the day-close / month reports
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Explicit Clock**: Functions that care about time take `now` as an argument

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod ledger;
pub mod money;
pub mod qr;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use ludo_core::Money` instead of
// `use ludo_core::money::Money`

pub use cart::{Cart, CartLine, ScanOutcome};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Identifier of the singleton register-state row.
///
/// There is exactly one physical drawer per store, so the register state
/// is a single well-known row rather than a table of registers.
pub const REGISTER_ID: &str = "default";

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in a cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Minimum interval between accepting two identical raw scan payloads.
///
/// A camera held over a printed code reports the same decode many times
/// per second; repeats inside this window are a single scan event.
pub const SCAN_DEBOUNCE_MS: i64 = 700;
