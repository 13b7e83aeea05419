use fnv::FnvHashMap;
use formosa_store::entity::{TradeAction, TransactionStatus, transaction::Transaction};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// One open BUY lot awaiting FIFO matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    pub quantity: i64,
    pub price: Decimal,
}

/// Result of FIFO lot-matching an agent's executed trade history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FifoReport {
    /// Realized P&L across all matched SELLs, before commissions.
    pub realized_pnl: Decimal,
    /// SELL trades whose FIFO-matched proceeds exceeded their matched cost.
    pub winning_sells: i64,
    /// Open lots per ticker remaining after matching, oldest first.
    pub open_lots: FnvHashMap<String, VecDeque<Lot>>,
}

impl FifoReport {
    /// Remaining position in one ticker: total quantity and lot-weighted average cost.
    pub fn remaining_position(&self, ticker: &str) -> Option<(i64, Decimal)> {
        let lots = self.open_lots.get(ticker)?;
        let quantity: i64 = lots.iter().map(|lot| lot.quantity).sum();
        if quantity == 0 {
            return None;
        }

        let cost: Decimal = lots
            .iter()
            .map(|lot| Decimal::from(lot.quantity) * lot.price)
            .sum();
        Some((quantity, cost / Decimal::from(quantity)))
    }
}

/// Strict FIFO matching: each SELL consumes the oldest remaining BUY lots of its ticker.
///
/// Only EXECUTED transactions participate. A SELL exceeding the open lots (impossible
/// through the validated trade path) matches what is available and ignores the excess.
pub fn match_trades<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> FifoReport {
    let mut report = FifoReport::default();

    for transaction in transactions {
        if transaction.status != TransactionStatus::Executed {
            continue;
        }

        let lots = report
            .open_lots
            .entry(transaction.ticker.clone())
            .or_default();

        match transaction.action {
            TradeAction::Buy => lots.push_back(Lot {
                quantity: transaction.quantity,
                price: transaction.price,
            }),
            TradeAction::Sell => {
                let mut unmatched = transaction.quantity;
                let mut matched_cost = Decimal::ZERO;
                let mut matched_quantity = 0i64;

                while unmatched > 0 {
                    let Some(lot) = lots.front_mut() else { break };
                    let take = unmatched.min(lot.quantity);

                    matched_cost += Decimal::from(take) * lot.price;
                    matched_quantity += take;
                    unmatched -= take;
                    lot.quantity -= take;

                    if lot.quantity == 0 {
                        lots.pop_front();
                    }
                }

                let proceeds = Decimal::from(matched_quantity) * transaction.price;
                let pnl = proceeds - matched_cost;
                report.realized_pnl += pnl;
                if matched_quantity > 0 && pnl > Decimal::ZERO {
                    report.winning_sells += 1;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formosa_store::entity::{AgentId, TransactionId};
    use rust_decimal_macros::dec;

    fn trade(action: TradeAction, quantity: i64, price: Decimal) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::random(),
            agent_id: AgentId::new("agent_fifo"),
            session_id: None,
            ticker: "2330".into(),
            company_name: "TSMC".into(),
            action,
            quantity,
            price,
            total_amount: Decimal::from(quantity) * price,
            commission: Decimal::from(quantity) * price * dec!(0.001425),
            status: TransactionStatus::Executed,
            execution_time: Some(now),
            decision_reason: String::new(),
            created_at: now,
        }
    }

    #[test]
    fn test_fifo_realized_pnl_across_two_lots() {
        // BUY 1000 @ 500, BUY 1000 @ 520, SELL 1500 @ 530
        let trades = vec![
            trade(TradeAction::Buy, 1000, dec!(500)),
            trade(TradeAction::Buy, 1000, dec!(520)),
            trade(TradeAction::Sell, 1500, dec!(530)),
        ];

        let report = match_trades(&trades);

        // (530-500)·1000 + (530-520)·500 = 35,000 before commissions
        assert_eq!(report.realized_pnl, dec!(35_000));
        assert_eq!(report.winning_sells, 1);

        // Remaining 500 shares all come from the 520 lot
        let (quantity, average_cost) = report.remaining_position("2330").unwrap();
        assert_eq!(quantity, 500);
        assert_eq!(average_cost, dec!(520));
    }

    #[test]
    fn test_losing_sell_is_not_a_winner() {
        let trades = vec![
            trade(TradeAction::Buy, 1000, dec!(500)),
            trade(TradeAction::Sell, 1000, dec!(480)),
        ];

        let report = match_trades(&trades);
        assert_eq!(report.realized_pnl, dec!(-20_000));
        assert_eq!(report.winning_sells, 0);
        assert!(report.remaining_position("2330").is_none());
    }

    #[test]
    fn test_non_executed_rows_are_ignored() {
        let mut pending = trade(TradeAction::Buy, 1000, dec!(500));
        pending.status = TransactionStatus::Pending;

        let report = match_trades(&[pending]);
        assert_eq!(report, FifoReport::default());
    }

    #[test]
    fn test_tickers_match_independently() {
        let mut other = trade(TradeAction::Buy, 1000, dec!(100));
        other.ticker = "2454".into();

        let trades = vec![
            trade(TradeAction::Buy, 1000, dec!(500)),
            other,
            trade(TradeAction::Sell, 1000, dec!(510)),
        ];

        let report = match_trades(&trades);
        assert_eq!(report.realized_pnl, dec!(10_000));
        let (quantity, _) = report.remaining_position("2454").unwrap();
        assert_eq!(quantity, 1000);
    }
}
