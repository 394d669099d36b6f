//! Canonical position records.
//!
//! A `Position` is produced by the normalizer once per poll cycle and is
//! only ever modified by repricing, which re-derives PnL and ROE from the
//! new mark price. The derived metrics are never mutated independently.

use crate::error::{CoreError, Result};
use crate::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Sign applied to the price move when computing PnL.
    #[inline]
    pub fn direction(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Derive the side from a signed size field (negative = short).
    #[inline]
    pub fn from_signed_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::Short
        } else {
            Self::Long
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// An open position as reported by the venue, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Trading pair symbol (e.g., "BTCUSDT"). Unique key within a snapshot.
    pub symbol: String,
    /// Position direction.
    pub side: PositionSide,
    /// Leverage multiplier.
    pub leverage: Decimal,
    /// Position magnitude (contract or quote units, always non-negative).
    pub size: Size,
    /// Average entry price.
    pub entry_price: Price,
    /// Current mark price. Updated only via `reprice`.
    pub mark_price: Price,
    /// Unrealized PnL, derived from the fields above.
    pub pnl: Decimal,
    /// Return on equity in percent, derived from the fields above.
    pub roe: Decimal,
}

impl Position {
    /// Create a position, validating field constraints and deriving
    /// PnL and ROE from the mark price.
    pub fn new(
        symbol: impl Into<String>,
        side: PositionSide,
        leverage: Decimal,
        size: Size,
        entry_price: Price,
        mark_price: Price,
    ) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(CoreError::InvalidSymbol("empty symbol".to_string()));
        }
        if leverage <= Decimal::ZERO {
            return Err(CoreError::InvalidLeverage(leverage.to_string()));
        }
        if size.inner().is_sign_negative() {
            return Err(CoreError::InvalidSize(size.to_string()));
        }
        if !entry_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("entry {entry_price}")));
        }
        if !mark_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("mark {mark_price}")));
        }

        let mut position = Self {
            symbol,
            side,
            leverage,
            size,
            entry_price,
            mark_price,
            pnl: Decimal::ZERO,
            roe: Decimal::ZERO,
        };
        position.pnl = position.derive_pnl(mark_price);
        position.roe = position.derive_roe(position.pnl);
        Ok(position)
    }

    /// Margin backing this position: `size * entry / leverage`.
    #[must_use]
    pub fn margin(&self) -> Decimal {
        self.size.notional(self.entry_price) / self.leverage
    }

    /// Check if the position is currently in profit.
    #[must_use]
    pub fn is_profit(&self) -> bool {
        self.pnl >= Decimal::ZERO
    }

    /// Return a copy repriced at a new mark price, with PnL and ROE
    /// re-derived. All other fields are unchanged.
    #[must_use]
    pub fn reprice(&self, mark_price: Price) -> Self {
        let mut repriced = self.clone();
        repriced.mark_price = mark_price;
        repriced.pnl = repriced.derive_pnl(mark_price);
        repriced.roe = repriced.derive_roe(repriced.pnl);
        repriced
    }

    fn derive_pnl(&self, mark_price: Price) -> Decimal {
        (mark_price - self.entry_price).inner() * self.size.inner() * self.side.direction()
    }

    fn derive_roe(&self, pnl: Decimal) -> Decimal {
        let margin = self.margin();
        if margin.is_zero() {
            return Decimal::ZERO;
        }
        pnl / margin * Decimal::ONE_HUNDRED
    }
}

/// One live mark-price update from the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTick {
    /// Trading pair symbol.
    pub symbol: String,
    /// New mark price.
    pub price: Price,
}
