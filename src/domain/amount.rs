//! Money and posting direction
//!
//! Domain primitives for signed ledger amounts. Amounts are kept at two
//! decimal places; the sign of a stored posting is derived from its
//! direction, never trusted from the caller.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places every stored amount is rescaled to.
pub const MONEY_SCALE: u32 = 2;

/// Direction of a posting.
///
/// Serialized with the single-letter wire codes existing clients send
/// (`"I"` / `"O"`), which are also what the `type` column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "I")]
    Inflow,
    #[serde(rename = "O")]
    Outflow,
}

/// Raised when a direction code is neither `I` nor `O`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid type")]
pub struct InvalidDirection(pub String);

impl Direction {
    pub fn code(&self) -> &'static str {
        match self {
            Direction::Inflow => "I",
            Direction::Outflow => "O",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(Direction::Inflow),
            "O" => Ok(Direction::Outflow),
            other => Err(InvalidDirection(other.to_string())),
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Direction::from_str(value.trim())
    }
}

/// Round to cents and pin the scale, so `100` is stored and echoed as `100.00`.
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Normalize a signed amount so its sign matches the direction.
///
/// Inflows are non-negative, outflows non-positive, whatever sign the
/// caller supplied.
pub fn normalize_amount(amount: Decimal, direction: Direction) -> Decimal {
    let magnitude = to_money(amount).abs();
    if magnitude.is_zero() {
        return magnitude;
    }
    match direction {
        Direction::Inflow => magnitude,
        Direction::Outflow => -magnitude,
    }
}

/// Fixed two-decimal textual form used by balance results (`"-100.00"`).
pub fn format_money(value: Decimal) -> String {
    let mut money = to_money(value);
    if money.is_zero() {
        money.set_sign_positive(true);
    }
    money.to_string()
}
