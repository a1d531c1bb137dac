use crate::models::trade::TradeDirection;

/// Unleveraged return of a round trip in percent. Positive when the
/// position made money in its own direction.
pub fn spot_return_pct(direction: TradeDirection, entry_price: f64, exit_price: f64) -> f64 {
    if entry_price == 0.0 {
        return 0.0;
    }
    let raw = (exit_price - entry_price) / entry_price * 100.0;
    match direction {
        TradeDirection::Long => raw,
        TradeDirection::Short => -raw,
    }
}

/// Linear leverage model: the spot return scaled by the multiplier.
pub fn leveraged_return_pct(spot_return_pct: f64, leverage: f64) -> f64 {
    spot_return_pct * leverage
}

/// Currency amount for a percentage return on the invested notional.
pub fn profit_amount(investment_amount: f64, return_pct: f64) -> f64 {
    investment_amount * (return_pct / 100.0)
}

/// Theoretical liquidation price: the spot move that wipes out the margin.
/// `None` for unleveraged positions.
pub fn liquidation_price(direction: TradeDirection, entry_price: f64, leverage: f64) -> Option<f64> {
    if leverage <= 1.0 {
        return None;
    }
    let buffer = 1.0 / leverage;
    Some(match direction {
        TradeDirection::Long => entry_price * (1.0 - buffer),
        TradeDirection::Short => entry_price * (1.0 + buffer),
    })
}
