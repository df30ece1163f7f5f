//! # Cart Session
//!
//! Assembles a pending sale from scan events or manual selections.
//!
//! ## Design Notes
//! The cart is an explicit session object handed to each call - there is
//! no module-level cart and no process-wide singleton. One terminal owns
//! one `Cart`; the store layer never sees it until finalize.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cart Operations                                    │
//! │                                                                         │
//! │  UI Action                 Cart call                 Validation         │
//! │  ─────────                 ─────────                 ──────────         │
//! │  Tap product ────────────► add_product()       qty > 0, stock check    │
//! │  Camera decode ──────────► add_from_scan()     debounce + same check   │
//! │  Edit quantity ──────────► set_quantity()      none (finalize checks)  │
//! │  Remove line ────────────► remove_line()       none                    │
//! │  Clear ──────────────────► clear()             none                    │
//! │                                                                         │
//! │  Stock validation counts what is ALREADY in the cart: adding 3 then    │
//! │  3 of a stock-5 product rejects the second add and leaves the cart     │
//! │  at 3 - rejections never mutate the cart.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scan Debounce
//! A camera pointed at a printed code reports the same decode many times
//! per second. Identical raw payloads inside [`crate::SCAN_DEBOUNCE_MS`]
//! are one scan event: repeats are dropped silently, not treated as
//! additional units.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::qr;
use crate::types::Product;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY, SCAN_DEBOUNCE_MS};

// =============================================================================
// Cart Line
// =============================================================================

/// A pending line in the cart.
///
/// Price is frozen at the moment of adding (snapshot pattern): if the
/// product price changes while the cart is open, the cart keeps the price
/// the customer saw.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Product reference; `None` for service (non-inventory) lines.
    pub product_id: Option<String>,

    /// Name at time of adding (frozen).
    pub name: String,

    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Quantity in cart. May be edited to 0 locally; zero-quantity lines
    /// are dropped at finalize.
    pub quantity: i64,
}

impl CartLine {
    /// Creates a cart line from a product and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: Some(product.id.clone()),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
        }
    }

    /// Line subtotal (unit price × quantity).
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

// =============================================================================
// Scan Outcome
// =============================================================================

/// Result of feeding a scan event to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan added units to the cart.
    Added,
    /// Duplicate of a recent identical payload; dropped without effect.
    Debounced,
}

// =============================================================================
// Cart
// =============================================================================

/// The pending sale being assembled on one terminal.
///
/// ## Invariants
/// - Lines are unique by product id (adding the same product merges)
/// - An addition that would exceed stock is rejected without mutation
/// - At most [`MAX_CART_LINES`] lines, [`MAX_LINE_QUANTITY`] per line
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    /// Lines in the cart.
    pub lines: Vec<CartLine>,

    /// Last-seen time per raw scan payload, for the debounce window.
    /// Session-local working state, not part of the cart's value.
    #[serde(skip)]
    #[ts(skip)]
    scan_seen: HashMap<String, DateTime<Utc>>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product to the cart or merges into its existing line.
    ///
    /// ## Validation
    /// - `quantity <= 0` → [`CoreError::InvalidQuantity`]
    /// - cart quantity + `quantity` > stock → [`CoreError::InsufficientStock`]
    ///
    /// Repeated additions of the same product accumulate; the stock check
    /// runs against the accumulated quantity, so a rejection leaves the
    /// cart exactly as it was.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            });
        }

        let in_cart = self
            .lines
            .iter()
            .find(|l| l.product_id.as_deref() == Some(product.id.as_str()))
            .map(|l| l.quantity)
            .unwrap_or(0);

        let requested = in_cart + quantity;

        if requested > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            }
            .into());
        }

        if !product.can_sell(requested) {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
                requested,
            });
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id.as_deref() == Some(product.id.as_str()))
        {
            line.quantity = requested;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(ValidationError::OutOfRange {
                field: "cart lines".to_string(),
                min: 0,
                max: MAX_CART_LINES as i64,
            }
            .into());
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Applies a scan event to the cart.
    ///
    /// ## Pipeline
    /// 1. Debounce: an identical raw payload within the window is dropped
    ///    silently ([`ScanOutcome::Debounced`], no mutation, no error)
    /// 2. Decode the payload ([`qr::decode`])
    /// 3. Resolve against live inventory ([`qr::resolve`])
    /// 4. Same accumulation/validation rule as [`Cart::add_product`]
    ///
    /// `now` is passed in explicitly so the debounce window is testable
    /// and the engine stays clock-free.
    pub fn add_from_scan(
        &mut self,
        raw: &str,
        products: &[Product],
        quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<ScanOutcome> {
        if let Some(last) = self.scan_seen.get(raw) {
            if now.signed_duration_since(*last) < Duration::milliseconds(SCAN_DEBOUNCE_MS) {
                return Ok(ScanOutcome::Debounced);
            }
        }
        self.scan_seen.insert(raw.to_string(), now);

        let payload = qr::decode(raw)?;
        let product = qr::resolve(&payload, products)?;
        self.add_product(product, quantity)?;

        Ok(ScanOutcome::Added)
    }

    /// Sets the quantity of an existing line directly.
    ///
    /// No inventory check here: the cashier may type a quantity that
    /// temporarily exceeds stock; only finalize rejects it. Zero is
    /// allowed and the line is kept until finalize filters it.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity < 0 {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            });
        }

        match self
            .lines
            .iter_mut()
            .find(|l| l.product_id.as_deref() == Some(product_id))
        {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ProductNotFound(product_id.to_string())),
        }
    }

    /// Removes a line from the cart by product id.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines
            .retain(|l| l.product_id.as_deref() != Some(product_id));

        if self.lines.len() == before {
            Err(CoreError::ProductNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all lines and the debounce history.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.scan_seen.clear();
    }

    /// Lines that will actually be sold: quantity > 0.
    pub fn effective_lines(&self) -> Vec<CartLine> {
        self.lines
            .iter()
            .filter(|l| l.quantity > 0)
            .cloned()
            .collect()
    }

    /// Cart total over effective lines.
    pub fn total(&self) -> Money {
        self.lines
            .iter()
            .filter(|l| l.quantity > 0)
            .map(CartLine::subtotal)
            .sum()
    }

    /// Whether the cart has no effective lines.
    pub fn is_empty(&self) -> bool {
        !self.lines.iter().any(|l| l.quantity > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
