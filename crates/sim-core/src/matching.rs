//! Matching engine implementing price-time priority.
//!
//! The engine resolves the crossed region of the book in a loop: while the
//! best bid meets or exceeds the best ask, the two head orders trade at
//! the maker's resting price. Maker and taker are identified purely by
//! `(timestamp, order_id)` — the older order is the maker — so the result
//! is deterministic for a given book state. A crossed pair owned by the
//! same trader never executes: the newer of the two orders is removed.

use types::{MatchEvent, Order, OrderId, Price, Quantity, Side, Tick, TradePrint, TraderId};

use crate::order_book::OrderBook;

/// Head-of-queue fields copied out to avoid holding borrows across
/// book mutation.
#[derive(Clone, Copy)]
struct Head {
    id: OrderId,
    trader_id: TraderId,
    price: Price,
    remaining: Quantity,
    key: (Tick, OrderId),
}

impl Head {
    fn of(order: &Order) -> Self {
        Self {
            id: order.id,
            trader_id: order.trader_id,
            price: order.price,
            remaining: order.remaining_qty,
            key: order.priority_key(),
        }
    }
}

/// Price-time-priority matching engine.
///
/// Holds only cumulative counters for the session summary; the emitted
/// event sequence is a pure function of the book state and `now`.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    total_matches: u64,
    total_volume: u64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative number of match events emitted this session.
    pub fn total_matches(&self) -> u64 {
        self.total_matches
    }

    /// Cumulative matched quantity this session.
    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    /// Resolve every crossing in the book, emitting events in order.
    ///
    /// `now` is only the tick label on events; the engine performs no time
    /// movement. After return, `best_bid < best_ask` or a side is empty.
    pub fn match_book(&mut self, book: &mut OrderBook, now: Tick) -> Vec<MatchEvent> {
        let mut events = Vec::new();

        loop {
            let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) else {
                break;
            };
            if bid < ask {
                break;
            }

            let bo = Head::of(book.best_order(Side::Bid).expect("bid level is populated"));
            let ao = Head::of(book.best_order(Side::Ask).expect("ask level is populated"));

            // Self-trade prevention: drop the newer order and keep going.
            if bo.trader_id == ao.trader_id {
                let newer = if bo.key > ao.key { Side::Bid } else { Side::Ask };
                book.pop_best(newer);
                continue;
            }

            // Older order is the maker; execution at the maker's price.
            let (maker, taker, aggressor_side) = if bo.key <= ao.key {
                (bo, ao, Side::Ask)
            } else {
                (ao, bo, Side::Bid)
            };

            let qty = bo.remaining.min(ao.remaining);
            let event = MatchEvent {
                maker_order_id: maker.id,
                taker_order_id: taker.id,
                maker_trader_id: maker.trader_id,
                taker_trader_id: taker.trader_id,
                price: maker.price,
                qty,
                aggressor_side,
                tick: now,
            };

            book.fill_best(Side::Bid, qty);
            book.fill_best(Side::Ask, qty);
            book.set_last_trade(TradePrint::from(&event));

            self.total_matches += 1;
            self.total_volume += qty.raw();
            events.push(event);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::TimeInForce;

    fn make_order(id: u64, trader: u64, side: Side, price: f64, qty: u64, ts: Tick) -> Order {
        Order::new(
            OrderId(id),
            TraderId(trader),
            side,
            Price::from_float(price),
            Quantity(qty),
            ts,
            TimeInForce::Gtc,
            None,
        )
    }

    fn book_with(orders: Vec<Order>) -> OrderBook {
        let mut book = OrderBook::new(Price::from_float(1.0));
        for order in orders {
            book.insert(order).unwrap();
        }
        book
    }

    #[test]
    fn test_no_cross_no_events() {
        let mut book = book_with(vec![
            make_order(1, 1, Side::Bid, 99.0, 10, 1),
            make_order(2, 2, Side::Ask, 101.0, 10, 1),
        ]);
        let mut engine = MatchingEngine::new();
        assert!(engine.match_book(&mut book, 2).is_empty());
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_execution_at_maker_price() {
        // Resting ask at 100 (older), incoming bid at 102 (newer).
        let mut book = book_with(vec![
            make_order(1, 1, Side::Ask, 100.0, 10, 1),
            make_order(2, 2, Side::Bid, 102.0, 10, 2),
        ]);
        let mut engine = MatchingEngine::new();
        let events = engine.match_book(&mut book, 2);

        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.price, Price::from_float(100.0));
        assert_eq!(ev.maker_trader_id, TraderId(1));
        assert_eq!(ev.taker_trader_id, TraderId(2));
        assert_eq!(ev.aggressor_side, Side::Bid);
        assert!(book.is_empty());
    }

    #[test]
    fn test_price_priority_across_levels() {
        let mut book = book_with(vec![
            make_order(1, 1, Side::Bid, 101.0, 5, 1),
            make_order(2, 2, Side::Bid, 100.0, 10, 1),
            make_order(3, 3, Side::Ask, 100.0, 7, 2),
        ]);
        let mut engine = MatchingEngine::new();
        let events = engine.match_book(&mut book, 2);

        assert_eq!(events.len(), 2);
        // Best bid (101) is the older maker: executes at 101.
        assert_eq!(events[0].price, Price::from_float(101.0));
        assert_eq!(events[0].qty, Quantity(5));
        assert_eq!(events[0].maker_trader_id, TraderId(1));
        // Then the 100 bid takes the remainder at its own (maker) price.
        assert_eq!(events[1].price, Price::from_float(100.0));
        assert_eq!(events[1].qty, Quantity(2));
        assert_eq!(events[1].maker_trader_id, TraderId(2));

        assert_eq!(book.best_bid(), Some(Price::from_float(100.0)));
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.total_quantity(Side::Bid), Quantity(8));
    }

    #[test]
    fn test_fifo_time_priority() {
        let mut book = book_with(vec![
            make_order(1, 1, Side::Ask, 100.0, 30, 1),
            make_order(2, 2, Side::Ask, 100.0, 30, 2),
            make_order(3, 3, Side::Bid, 100.0, 40, 3),
        ]);
        let mut engine = MatchingEngine::new();
        let events = engine.match_book(&mut book, 3);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].maker_trader_id, TraderId(1));
        assert_eq!(events[0].qty, Quantity(30));
        assert_eq!(events[1].maker_trader_id, TraderId(2));
        assert_eq!(events[1].qty, Quantity(10));
    }

    #[test]
    fn test_self_trade_prevention_removes_newer() {
        let mut book = book_with(vec![
            make_order(1, 1, Side::Bid, 100.0, 5, 1),
            make_order(2, 1, Side::Ask, 100.0, 3, 2),
        ]);
        let mut engine = MatchingEngine::new();
        let events = engine.match_book(&mut book, 2);

        assert!(events.is_empty());
        // The newer order (the ask) is gone, the resting bid intact.
        assert!(book.contains(OrderId(1)));
        assert!(!book.contains(OrderId(2)));
        assert_eq!(book.total_quantity(Side::Bid), Quantity(5));
    }

    #[test]
    fn test_self_trade_then_continue_matching() {
        // Trader 1's newer ask blocks, then trader 2's older ask trades.
        let mut book = book_with(vec![
            make_order(1, 1, Side::Bid, 100.0, 5, 1),
            make_order(2, 2, Side::Ask, 100.0, 5, 2),
            make_order(3, 1, Side::Ask, 100.0, 5, 3),
        ]);
        let mut engine = MatchingEngine::new();
        let events = engine.match_book(&mut book, 3);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].maker_trader_id, TraderId(1));
        assert_eq!(events[0].taker_trader_id, TraderId(2));
        assert!(book.contains(OrderId(3)));
    }

    #[test]
    fn test_events_labeled_with_now() {
        let mut book = book_with(vec![
            make_order(1, 1, Side::Ask, 100.0, 5, 1),
            make_order(2, 2, Side::Bid, 100.0, 5, 2),
        ]);
        let mut engine = MatchingEngine::new();
        let events = engine.match_book(&mut book, 42);
        assert_eq!(events[0].tick, 42);
        assert_eq!(book.last_trade().unwrap().tick, 42);
    }

    #[test]
    fn test_deterministic_replay_of_same_book() {
        let build = || {
            book_with(vec![
                make_order(1, 1, Side::Bid, 101.0, 8, 1),
                make_order(2, 2, Side::Bid, 100.0, 4, 1),
                make_order(3, 3, Side::Ask, 99.0, 6, 2),
                make_order(4, 4, Side::Ask, 100.0, 9, 2),
            ])
        };
        let mut a = build();
        let mut b = build();
        let ev_a = MatchingEngine::new().match_book(&mut a, 5);
        let ev_b = MatchingEngine::new().match_book(&mut b, 5);
        assert_eq!(ev_a, ev_b);
    }
}
