//! Order book with price-time priority.
//!
//! Price levels live in `BTreeMap` ladders so best-bid/best-ask lookup and
//! in-order level iteration are cheap. Within a level, orders queue FIFO
//! by `(timestamp, order_id)`. Two indices are maintained alongside the
//! ladders: `by_id` for cancels and `by_trader` for mass-cancel; both are
//! kept consistent with the level queues by every public operation.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use types::{BookLevel, Order, OrderId, Price, Quantity, Side, Tick, TradePrint, TraderId};

use crate::error::{BookError, Result};

/// Orders resting at a single price, in time priority.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Cached total open quantity at this price.
    pub total_qty: Quantity,
    /// Orders at this price, FIFO.
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    /// Append an order to the back of the queue.
    fn push(&mut self, order: Order) {
        self.total_qty += order.remaining_qty;
        self.orders.push_back(order);
    }

    /// Peek at the head order without removing it.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

/// The central limit order book.
#[derive(Debug, Clone)]
pub struct OrderBook {
    tick_size: Price,
    /// Bid ladder; best bid is the greatest key.
    bids: BTreeMap<Price, PriceLevel>,
    /// Ask ladder; best ask is the smallest key.
    asks: BTreeMap<Price, PriceLevel>,
    /// order_id -> (side, price, owner) for O(1) cancels.
    by_id: HashMap<OrderId, (Side, Price, TraderId)>,
    /// trader -> resting order ids, ordered for deterministic mass-cancel.
    by_trader: HashMap<TraderId, BTreeSet<OrderId>>,
    /// Most recent execution print.
    last_trade: Option<TradePrint>,
}

impl OrderBook {
    /// Create an empty book on the given tick grid.
    pub fn new(tick_size: Price) -> Self {
        Self {
            tick_size,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            by_id: HashMap::new(),
            by_trader: HashMap::new(),
            last_trade: None,
        }
    }

    pub fn tick_size(&self) -> Price {
        self.tick_size
    }

    fn side_map(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn index_add(&mut self, order: &Order) {
        self.by_id
            .insert(order.id, (order.side, order.price, order.trader_id));
        self.by_trader
            .entry(order.trader_id)
            .or_default()
            .insert(order.id);
    }

    fn index_remove(&mut self, order_id: OrderId) {
        if let Some((_, _, trader)) = self.by_id.remove(&order_id)
            && let Some(ids) = self.by_trader.get_mut(&trader)
        {
            ids.remove(&order_id);
            if ids.is_empty() {
                self.by_trader.remove(&trader);
            }
        }
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Append an order to the tail of its price level.
    ///
    /// Preconditions: `remaining_qty == original_qty > 0`, price is a
    /// positive tick multiple, and the id is not already resting.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.remaining_qty.is_zero() || order.remaining_qty != order.original_qty {
            return Err(BookError::BadQuantity);
        }
        if !order.price.is_positive() || !order.price.is_on_tick(self.tick_size) {
            return Err(BookError::BadPrice(order.price));
        }
        if self.by_id.contains_key(&order.id) {
            return Err(BookError::DuplicateOrder(order.id));
        }

        self.index_add(&order);
        self.side_map_mut(order.side)
            .entry(order.price)
            .or_default()
            .push(order);
        Ok(())
    }

    /// Remove an order by id, returning it.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order> {
        let (side, price, _) = *self
            .by_id
            .get(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;

        let ladder = self.side_map_mut(side);
        let level = ladder
            .get_mut(&price)
            .ok_or(BookError::OrderNotFound(order_id))?;
        let pos = level
            .orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;

        let order = level.orders.remove(pos).expect("position just found");
        level.total_qty = level.total_qty.saturating_sub(order.remaining_qty);
        if level.is_empty() {
            ladder.remove(&price);
        }
        self.index_remove(order_id);
        Ok(order)
    }

    /// Cancel every resting order owned by `trader`, in id order.
    pub fn cancel_all(&mut self, trader: TraderId) -> Vec<Order> {
        let ids: Vec<OrderId> = self
            .by_trader
            .get(&trader)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| self.cancel(id).ok())
            .collect()
    }

    /// Remove every GTC order whose `expires_at` has passed. IOC orders are
    /// never expired here; the simulator cleans them up within their tick.
    pub fn expire(&mut self, now: Tick) -> Vec<Order> {
        let stale: Vec<OrderId> = self
            .iter_orders()
            .filter(|o| o.is_expired(now))
            .map(|o| o.id)
            .collect();

        stale
            .into_iter()
            .filter_map(|id| self.cancel(id).ok())
            .collect()
    }

    /// Highest populated bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest populated ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Arithmetic mean of best bid and best ask.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price::midpoint(bid, ask)),
            _ => None,
        }
    }

    /// Peek at the head order of the best level on `side`.
    pub fn best_order(&self, side: Side) -> Option<&Order> {
        match side {
            Side::Bid => self.bids.values().next_back(),
            Side::Ask => self.asks.values().next(),
        }
        .and_then(|level| level.front())
    }

    /// Reduce the head order of the best level on `side` by `qty`,
    /// removing it (and an emptied level) on full fill.
    pub fn fill_best(&mut self, side: Side, qty: Quantity) {
        let ladder = self.side_map_mut(side);
        let Some((&price, level)) = (match side {
            Side::Bid => ladder.iter_mut().next_back(),
            Side::Ask => ladder.iter_mut().next(),
        }) else {
            return;
        };

        let mut filled_id = None;
        if let Some(order) = level.orders.front_mut() {
            order.remaining_qty = order.remaining_qty.saturating_sub(qty);
            if order.remaining_qty.is_zero() {
                filled_id = Some(order.id);
            }
        }
        level.total_qty = level.total_qty.saturating_sub(qty);

        if filled_id.is_some() {
            level.orders.pop_front();
        }
        let level_empty = level.is_empty();
        if level_empty {
            ladder.remove(&price);
        }
        if let Some(id) = filled_id {
            self.index_remove(id);
        }
    }

    /// Remove and return the head order of the best level on `side`.
    pub fn pop_best(&mut self, side: Side) -> Option<Order> {
        let ladder = self.side_map_mut(side);
        let (&price, level) = match side {
            Side::Bid => ladder.iter_mut().next_back(),
            Side::Ask => ladder.iter_mut().next(),
        }?;

        let order = level.orders.pop_front()?;
        level.total_qty = level.total_qty.saturating_sub(order.remaining_qty);
        if level.is_empty() {
            ladder.remove(&price);
        }
        self.index_remove(order.id);
        Some(order)
    }

    /// Top `n` populated levels per side with aggregated quantity.
    /// Bids descend from the best; asks ascend from the best.
    pub fn depth(&self, n: usize) -> (Vec<BookLevel>, Vec<BookLevel>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(n)
            .map(|(&price, level)| BookLevel { price, qty: level.total_qty })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(n)
            .map(|(&price, level)| BookLevel { price, qty: level.total_qty })
            .collect();
        (bids, asks)
    }

    /// Total open quantity on one side.
    pub fn total_quantity(&self, side: Side) -> Quantity {
        self.side_map(side).values().map(|l| l.total_qty).sum()
    }

    /// Resting order ids for a trader, in id order.
    pub fn orders_of(&self, trader: TraderId) -> Vec<OrderId> {
        self.by_trader
            .get(&trader)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Owner of a resting order, if present.
    pub fn owner_of(&self, order_id: OrderId) -> Option<TraderId> {
        self.by_id.get(&order_id).map(|&(_, _, trader)| trader)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.by_id.contains_key(&order_id)
    }

    /// Record the most recent execution.
    pub fn set_last_trade(&mut self, print: TradePrint) {
        self.last_trade = Some(print);
    }

    pub fn last_trade(&self) -> Option<TradePrint> {
        self.last_trade
    }

    /// Total number of resting orders.
    pub fn order_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Iterate over every resting order, bids then asks, ladder order.
    pub fn iter_orders(&self) -> impl Iterator<Item = &Order> {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.orders.iter())
    }

    // =========================================================================
    // Invariant verification
    // =========================================================================

    /// Verify structural invariants: index agreement, no empty levels,
    /// level quantity caches, per-order quantity bounds, FIFO key order.
    /// Used by the simulator's poisoning check and by tests.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        let mut seen = 0usize;
        for (side, ladder) in [(Side::Bid, &self.bids), (Side::Ask, &self.asks)] {
            for (&price, level) in ladder {
                if level.is_empty() {
                    return Err(format!("empty level at {price} on {side}"));
                }
                let mut sum = Quantity::ZERO;
                let mut prev_key = None;
                for order in &level.orders {
                    seen += 1;
                    if order.remaining_qty.is_zero() || order.remaining_qty > order.original_qty {
                        return Err(format!("quantity bounds violated on {}", order.id));
                    }
                    if order.side != side || order.price != price {
                        return Err(format!("order {} filed under wrong level", order.id));
                    }
                    if let Some(prev) = prev_key
                        && order.priority_key() < prev
                    {
                        return Err(format!("FIFO order violated at {price} on {side}"));
                    }
                    prev_key = Some(order.priority_key());
                    sum += order.remaining_qty;

                    match self.by_id.get(&order.id) {
                        Some(&(s, p, t))
                            if s == side && p == price && t == order.trader_id => {}
                        _ => return Err(format!("by_id inconsistent for {}", order.id)),
                    }
                    let indexed = self
                        .by_trader
                        .get(&order.trader_id)
                        .is_some_and(|ids| ids.contains(&order.id));
                    if !indexed {
                        return Err(format!("by_trader missing {}", order.id));
                    }
                }
                if sum != level.total_qty {
                    return Err(format!("level quantity cache wrong at {price} on {side}"));
                }
            }
        }
        if seen != self.by_id.len() {
            return Err(format!(
                "by_id covers {} orders but ladders hold {seen}",
                self.by_id.len()
            ));
        }
        let trader_total: usize = self.by_trader.values().map(|s| s.len()).sum();
        if trader_total != seen {
            return Err("by_trader order count disagrees with ladders".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::TimeInForce;

    fn tick() -> Price {
        Price::from_float(1.0)
    }

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

    fn checked(book: &OrderBook) {
        book.check_consistency().unwrap();
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new(tick());
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.mid_price(), None);
        checked(&book);
    }

    #[test]
    fn test_insert_and_best_prices() {
        let mut book = OrderBook::new(tick());
        book.insert(make_order(1, 1, Side::Bid, 99.0, 10, 1)).unwrap();
        book.insert(make_order(2, 1, Side::Bid, 100.0, 5, 1)).unwrap();
        book.insert(make_order(3, 2, Side::Ask, 102.0, 7, 1)).unwrap();

        assert_eq!(book.best_bid(), Some(Price::from_float(100.0)));
        assert_eq!(book.best_ask(), Some(Price::from_float(102.0)));
        assert_eq!(book.mid_price(), Some(Price::from_float(101.0)));
        assert_eq!(book.order_count(), 3);
        checked(&book);
    }

    #[test]
    fn test_insert_rejects_bad_orders() {
        let mut book = OrderBook::new(tick());

        // Off-grid price.
        let off = make_order(1, 1, Side::Bid, 99.5, 10, 1);
        assert_eq!(book.insert(off), Err(BookError::BadPrice(Price::from_float(99.5))));

        // Non-positive price.
        let zero = make_order(2, 1, Side::Bid, 0.0, 10, 1);
        assert!(matches!(book.insert(zero), Err(BookError::BadPrice(_))));

        // Partially filled order cannot be inserted.
        let mut partial = make_order(3, 1, Side::Bid, 99.0, 10, 1);
        partial.remaining_qty = Quantity(5);
        assert_eq!(book.insert(partial), Err(BookError::BadQuantity));

        // Duplicate id.
        book.insert(make_order(4, 1, Side::Bid, 99.0, 10, 1)).unwrap();
        assert_eq!(
            book.insert(make_order(4, 2, Side::Ask, 101.0, 10, 1)),
            Err(BookError::DuplicateOrder(OrderId(4)))
        );
        checked(&book);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = OrderBook::new(tick());
        book.insert(make_order(1, 1, Side::Bid, 100.0, 10, 1)).unwrap();
        book.insert(make_order(2, 2, Side::Bid, 100.0, 20, 2)).unwrap();
        book.insert(make_order(3, 3, Side::Bid, 100.0, 30, 2)).unwrap();

        let head = book.best_order(Side::Bid).unwrap();
        assert_eq!(head.id, OrderId(1));

        book.fill_best(Side::Bid, Quantity(10));
        assert_eq!(book.best_order(Side::Bid).unwrap().id, OrderId(2));
        checked(&book);
    }

    #[test]
    fn test_cancel_removes_empty_level() {
        let mut book = OrderBook::new(tick());
        book.insert(make_order(1, 1, Side::Ask, 101.0, 10, 1)).unwrap();

        let cancelled = book.cancel(OrderId(1)).unwrap();
        assert_eq!(cancelled.id, OrderId(1));
        assert!(book.is_empty());
        assert_eq!(book.cancel(OrderId(1)), Err(BookError::OrderNotFound(OrderId(1))));
        checked(&book);
    }

    #[test]
    fn test_cancel_all() {
        let mut book = OrderBook::new(tick());
        book.insert(make_order(1, 1, Side::Bid, 99.0, 10, 1)).unwrap();
        book.insert(make_order(2, 1, Side::Ask, 103.0, 10, 1)).unwrap();
        book.insert(make_order(3, 2, Side::Bid, 98.0, 10, 1)).unwrap();

        let cancelled = book.cancel_all(TraderId(1));
        assert_eq!(cancelled.len(), 2);
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.orders_of(TraderId(1)), Vec::<OrderId>::new());
        assert_eq!(book.orders_of(TraderId(2)), vec![OrderId(3)]);
        checked(&book);
    }

    #[test]
    fn test_expire_gtc_only() {
        let mut book = OrderBook::new(tick());
        let mut gtc = make_order(1, 1, Side::Bid, 99.0, 10, 1);
        gtc.expires_at = Some(3);
        book.insert(gtc).unwrap();

        let mut ioc = make_order(2, 1, Side::Bid, 98.0, 10, 1);
        ioc.time_in_force = TimeInForce::Ioc;
        book.insert(ioc).unwrap();

        assert!(book.expire(2).is_empty());
        let expired = book.expire(3);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, OrderId(1));
        // IOC orders survive expiry; the simulator removes them.
        assert!(book.contains(OrderId(2)));
        checked(&book);
    }

    #[test]
    fn test_depth_aggregation() {
        let mut book = OrderBook::new(tick());
        book.insert(make_order(1, 1, Side::Bid, 100.0, 10, 1)).unwrap();
        book.insert(make_order(2, 2, Side::Bid, 100.0, 15, 2)).unwrap();
        book.insert(make_order(3, 3, Side::Bid, 99.0, 20, 1)).unwrap();
        book.insert(make_order(4, 4, Side::Ask, 101.0, 5, 1)).unwrap();

        let (bids, asks) = book.depth(2);
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].price, Price::from_float(100.0));
        assert_eq!(bids[0].qty, Quantity(25));
        assert_eq!(bids[1].price, Price::from_float(99.0));
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].qty, Quantity(5));

        assert_eq!(book.total_quantity(Side::Bid), Quantity(45));
        assert_eq!(book.total_quantity(Side::Ask), Quantity(5));
    }

    #[test]
    fn test_pop_best() {
        let mut book = OrderBook::new(tick());
        book.insert(make_order(1, 1, Side::Ask, 101.0, 10, 1)).unwrap();
        book.insert(make_order(2, 2, Side::Ask, 101.0, 20, 2)).unwrap();

        let popped = book.pop_best(Side::Ask).unwrap();
        assert_eq!(popped.id, OrderId(1));
        assert_eq!(book.total_quantity(Side::Ask), Quantity(20));
        assert!(!book.contains(OrderId(1)));
        checked(&book);
    }
}
