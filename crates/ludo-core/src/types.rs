//! # Domain Types
//!
//! Core domain types used throughout Ludo POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  CashMovement   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  method         │   │  kind           │       │
//! │  │  price_cents    │   │  total_cents    │   │  concept        │       │
//! │  │  stock          │   │  change_cents   │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  RegisterState  │   │ PaymentMethod   │   │  MovementKind   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  start_cash     │   │  Drawer         │   │  Inflow         │       │
//! │  │  opened_at      │   │  Transfer       │   │  Outflow        │       │
//! │  └─────────────────┘   └─────────────────┘   │  Purchase       │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Sale lines freeze the product name and unit price at the moment of sale.
//! Later price edits or product deletions never alter historical totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product tracked by inventory and available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier and printed next to the QR code.
    pub name: String,

    /// Price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Current stock level. Never negative; the store layer enforces this
    /// with a conditional decrement at sale commit time.
    pub stock: i64,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units could be sold at current stock.
    ///
    /// This is the client-side view; the authoritative check is the
    /// conditional decrement at finalize time.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.stock
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was settled.
///
/// Only `Drawer` sales affect the physical cash in the register;
/// `Transfer` sales are tracked but never touch the drawer balance.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash into the physical drawer.
    Drawer,
    /// Bank transfer settled outside the drawer.
    Transfer,
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale.
///
/// Immutable once created; the only mutations allowed are the admin
/// reversal operations, which rewrite totals and restore stock in a
/// single storage transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,

    /// When the sale was finalized.
    #[ts(as = "String")]
    pub ts: DateTime<Utc>,

    pub method: PaymentMethod,

    /// Sum of line subtotals, recomputed by the engine - never
    /// caller-supplied.
    pub total_cents: i64,

    /// Amount the customer tendered. Invariant: `paid >= total`.
    pub paid_cents: i64,

    /// Change returned. Invariant: `change = paid - total >= 0`.
    pub change_cents: i64,

    /// Free-form note; carries the discount reason for discounted
    /// service sales.
    pub note: Option<String>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the tendered amount as Money.
    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    /// Returns the change due as Money.
    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line item within a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,

    /// Product reference; `None` for service (non-inventory) lines.
    /// Intentionally not a foreign key: deleting a product must not
    /// disturb historical sales.
    pub product_id: Option<String>,

    /// Product or service name at time of sale (frozen).
    pub name: String,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Quantity sold. Positive.
    pub quantity: i64,

    /// Line subtotal (unit_price × quantity).
    pub subtotal_cents: i64,
}

impl SaleLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A sale together with its lines, as read back for admin and reports.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleWithLines {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

// =============================================================================
// Cash Movement
// =============================================================================

/// Classification of a manual cash movement.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Cash added to the drawer outside a sale.
    Inflow,
    /// Cash taken from the drawer.
    Outflow,
    /// Cash spent restocking inventory. Counted with outflows in the
    /// drawer balance regardless of how the purchase was settled.
    Purchase,
}

impl MovementKind {
    /// Whether this kind reduces the drawer balance.
    #[inline]
    pub fn is_outflow(&self) -> bool {
        matches!(self, MovementKind::Outflow | MovementKind::Purchase)
    }
}

/// A manual cash movement (drawer adjustment outside of sales).
///
/// Append-only; the only deletions happen during period consolidation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub kind: MovementKind,

    /// What the movement was for ("Change float", "Inventory purchase", ...).
    pub concept: String,

    /// Amount in cents. Always positive; the kind carries the sign.
    pub amount_cents: i64,

    #[ts(as = "String")]
    pub ts: DateTime<Utc>,
}

impl CashMovement {
    /// Returns the movement amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Register State
// =============================================================================

/// The drawer's last reset point. Singleton row; mutated only by day close.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RegisterState {
    /// Always [`crate::REGISTER_ID`].
    pub id: String,

    /// Opening balance in cents at the start of the current day.
    pub start_cash_cents: i64,

    /// When the current day was opened.
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
}

impl RegisterState {
    /// Returns the opening balance as Money.
    #[inline]
    pub fn opening_balance(&self) -> Money {
        Money::from_cents(self.start_cash_cents)
    }
}

// =============================================================================
// Services & Membership Prices
// =============================================================================

/// The venue's timed/membership service categories.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    /// Supervised playroom visits and visit packages.
    Playroom,
    /// Tutoring visits and monthly packs.
    Tutoring,
    /// Speech therapy sessions.
    SpeechTherapy,
}

/// One priced tier of a service category ("v12" visit, "m12" monthly pack, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MembershipPrice {
    pub service: ServiceCategory,
    pub tier: String,
    pub price_cents: i64,
}

impl MembershipPrice {
    /// Returns the tier price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// The full membership price list, as shown on the service-sale buttons.
///
/// Not transactional with sales: the price at time of sale is copied into
/// the sale's lines, so later edits never alter historical totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MembershipPriceTable {
    pub entries: Vec<MembershipPrice>,
}

impl MembershipPriceTable {
    /// Looks up the price for a (service, tier) pair.
    pub fn price_of(&self, service: ServiceCategory, tier: &str) -> Option<Money> {
        self.entries
            .iter()
            .find(|e| e.service == service && e.tier == tier)
            .map(MembershipPrice::price)
    }
}

/// An item of a service sale: a named concept with a price and quantity,
/// never backed by inventory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceItem {
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl ServiceItem {
    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
