//! # QR Payload Codec
//!
//! Encodes and decodes the product-reference payload printed as a QR code
//! next to each product. Camera access and image decoding live in the UI
//! shell; this module only sees the decoded text.
//!
//! ## Payload Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The QR encodes ONLY the product id:                                   │
//! │                                                                         │
//! │      {"v":1,"id":"550e8400-..."}                                       │
//! │                                                                         │
//! │  Name and price are re-resolved from live inventory at decode time,    │
//! │  so a printed code stays valid across price changes and renames.       │
//! │                                                                         │
//! │  Decode priority (fixed order):                                        │
//! │    1. Versioned shape  {"v":1,"id":...}                                │
//! │    2. Legacy shape     {"id":...} / {"name":...} (no version tag)      │
//! │    3. Anything else    → ScanParseFailure (soft, typed)                │
//! │                                                                         │
//! │  A payload with an unrecognized "v" tag is rejected outright - it is   │
//! │  a future format, not a legacy one.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Current payload schema version.
pub const QR_PAYLOAD_VERSION: u64 = 1;

// =============================================================================
// Payload
// =============================================================================

/// A parsed scan payload, before resolution against inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    /// The current versioned shape; carries the product id only.
    Versioned { id: String },

    /// Pre-versioning printed codes carried the whole product record.
    /// Only the id and name are usable; price is always re-resolved.
    Legacy {
        id: Option<String>,
        name: Option<String>,
    },
}

/// Serialized form of the versioned payload.
#[derive(Serialize)]
struct VersionedPayload<'a> {
    v: u64,
    id: &'a str,
}

// =============================================================================
// Encode / Decode
// =============================================================================

/// Encodes a product reference for printing.
///
/// ## Example
/// ```rust
/// use ludo_core::qr;
/// # use chrono::Utc;
/// # let product = ludo_core::Product {
/// #     id: "abc".to_string(), name: "Agua".to_string(), price_cents: 1200,
/// #     stock: 3, created_at: Utc::now(), updated_at: Utc::now(),
/// # };
/// let text = qr::encode(&product);
/// assert_eq!(text, r#"{"v":1,"id":"abc"}"#);
/// ```
pub fn encode(product: &Product) -> String {
    let payload = VersionedPayload {
        v: QR_PAYLOAD_VERSION,
        id: &product.id,
    };
    // Serializing a two-field struct of plain values cannot fail
    serde_json::to_string(&payload).expect("QR payload serialization")
}

/// Decodes scanned text into a payload.
///
/// Fails softly: every malformed input maps to
/// [`CoreError::ScanParseFailure`], never a panic. The scanner keeps
/// running and the UI shows a brief message.
pub fn decode(text: &str) -> CoreResult<ScanPayload> {
    let value: Value =
        serde_json::from_str(text).map_err(|_| parse_failure(text))?;

    let obj = value.as_object().ok_or_else(|| parse_failure(text))?;

    // Versioned shape first. An unrecognized version is a parse failure,
    // not a legacy fallback.
    if let Some(v) = obj.get("v") {
        let id = obj.get("id").and_then(Value::as_str);
        return match (v.as_u64(), id) {
            (Some(QR_PAYLOAD_VERSION), Some(id)) => Ok(ScanPayload::Versioned {
                id: id.to_string(),
            }),
            _ => Err(parse_failure(text)),
        };
    }

    // Legacy shapes: {id,...} then {name,...}, no version tag.
    let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
    let name = obj.get("name").and_then(Value::as_str).map(str::to_string);

    if id.is_some() || name.is_some() {
        return Ok(ScanPayload::Legacy { id, name });
    }

    Err(parse_failure(text))
}

fn parse_failure(text: &str) -> CoreError {
    // Cap what we echo back: scanned garbage can be arbitrarily long
    let mut shown: String = text.chars().take(64).collect();
    if shown.len() < text.len() {
        shown.push('…');
    }
    CoreError::ScanParseFailure(shown)
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves a payload against live inventory.
///
/// ## Resolution Order
/// 1. Exact match on product id
/// 2. Case-insensitive exact match on product name (legacy codes printed
///    before ids were stable)
///
/// No match yields [`CoreError::ProductNotFound`].
pub fn resolve<'a>(payload: &ScanPayload, products: &'a [Product]) -> CoreResult<&'a Product> {
    let (id, name) = match payload {
        ScanPayload::Versioned { id } => (Some(id.as_str()), None),
        ScanPayload::Legacy { id, name } => (id.as_deref(), name.as_deref()),
    };

    if let Some(id) = id {
        if let Some(product) = products.iter().find(|p| p.id == id) {
            return Ok(product);
        }
    }

    if let Some(name) = name {
        if let Some(product) = products
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            return Ok(product);
        }
    }

    Err(CoreError::ProductNotFound(
        id.or(name).unwrap_or("<empty>").to_string(),
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================
