use super::types::{OpenOrder, UserState};
use crate::core::types::{
    Account, MarginMode, Order, OrderKind, OrderStatus, Position, Side,
};
use chrono::Utc;
use rust_decimal::Decimal;

/// Parse a numeric string from the exchange, falling back to zero.
#[inline]
fn parse_decimal(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

/// Convert the exchange's user state into the account summary record.
#[must_use]
pub fn account_from_user_state(address: &str, state: &UserState) -> Account {
    let total_pnl = state
        .asset_positions
        .iter()
        .map(|p| parse_decimal(&p.position.unrealized_pnl))
        .sum();

    Account {
        address: address.to_string(),
        balance: parse_decimal(&state.margin_summary.account_value),
        margin_used: parse_decimal(&state.margin_summary.total_margin_used),
        margin_available: parse_decimal(&state.withdrawable),
        total_pnl,
    }
}

/// Convert the exchange's user state into position records.
///
/// Entries with zero size are absent positions and produce no record.
#[must_use]
pub fn positions_from_user_state(state: &UserState) -> Vec<Position> {
    let now = Utc::now().timestamp_millis();
    state
        .asset_positions
        .iter()
        .filter_map(|entry| {
            let data = &entry.position;
            let signed_size = parse_decimal(&data.szi);
            if signed_size.is_zero() {
                return None;
            }
            let size = signed_size.abs();
            let notional = parse_decimal(&data.position_value);
            Some(Position {
                symbol: data.coin.clone(),
                side: if signed_size > Decimal::ZERO {
                    Side::Long
                } else {
                    Side::Short
                },
                size,
                entry_price: data.entry_px.as_deref().map_or(Decimal::ZERO, parse_decimal),
                current_price: notional / size,
                leverage: data.leverage.value,
                margin_mode: if data.leverage.leverage_type == "isolated" {
                    MarginMode::Isolated
                } else {
                    MarginMode::Cross
                },
                pnl: parse_decimal(&data.unrealized_pnl),
                pnl_percentage: parse_decimal(&data.return_on_equity) * Decimal::ONE_HUNDRED,
                liquidation_price: data.liquidation_px.as_deref().map(parse_decimal),
                timestamp: now,
            })
        })
        .collect()
}

/// Convert a resting order into the tracked order record.
#[must_use]
pub fn order_from_open_order(open: &OpenOrder) -> Order {
    Order {
        id: open.oid.to_string(),
        symbol: open.coin.clone(),
        side: if open.side == "B" { Side::Long } else { Side::Short },
        kind: OrderKind::Limit,
        price: Some(parse_decimal(&open.limit_px)),
        size: parse_decimal(&open.sz),
        leverage: 1,
        status: OrderStatus::Open,
        timestamp: open.timestamp as i64,
    }
}
