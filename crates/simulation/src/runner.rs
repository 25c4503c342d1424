//! The simulator: owns all mutable session state and advances it one tick
//! at a time.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use agents::{Bot, BotView, Decision, standard_roster};
use journal::{Journal, JournalError, Record};
use ledger::Trader;
use risk::RiskManager;
use sim_core::{BookError, MatchingEngine, OrderBook};
use types::{
    Command, CommandResult, ExchangeConfig, MarketSnapshot, MatchEvent, Order, OrderId, Price,
    Quantity, RejectKind, SessionEvent, Side, Tick, TimeInForce, TradePrint, TraderId, TraderStat,
    USER_TRADER_ID,
};

use crate::fair_value::FairValueSchedule;

/// Ticks past the opposite best used to price aggressive IOC orders.
const CROSS_TICKS: i64 = 2;

/// Interval between informational snapshot records in the journal.
const SNAPSHOT_RECORD_INTERVAL: Tick = 64;

/// A command plus an optional reply channel for its synchronous result.
pub struct CommandEnvelope {
    pub command: Command,
    pub reply: Option<Sender<CommandResult>>,
}

impl From<Command> for CommandEnvelope {
    fn from(command: Command) -> Self {
        Self { command, reply: None }
    }
}

/// Fatal simulator errors. Rejections are not errors; they are results.
#[derive(Debug)]
pub enum SimError {
    /// An invariant violation poisoned the simulator; no further ticks run.
    Poisoned(String),
    /// Journal I/O failed; the current tick is not acknowledged.
    Journal(JournalError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Poisoned(reason) => write!(f, "simulator poisoned: {reason}"),
            SimError::Journal(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<JournalError> for SimError {
    fn from(err: JournalError) -> Self {
        SimError::Journal(err)
    }
}

/// What one tick produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: Tick,
    pub events: Vec<MatchEvent>,
    pub snapshot: MarketSnapshot,
}

/// A taker fill awaiting its toxicity evaluation one tick later.
#[derive(Debug, Clone, Copy)]
struct PendingToxicity {
    trader_id: TraderId,
    fill_price: Price,
    aggressor_sign: i64,
}

/// The exchange simulator. Single-threaded cooperative: one `step()` call
/// runs one complete tick; nothing observable escapes mid-tick.
pub struct Simulator {
    config: ExchangeConfig,
    seed: u64,
    now: Tick,
    book: OrderBook,
    engine: MatchingEngine,
    traders: BTreeMap<TraderId, Trader>,
    bots: Vec<Bot>,
    risk: RiskManager,
    rng: StdRng,
    schedule: FairValueSchedule,
    fair_value: f64,
    uncertainty: f64,
    volatility: f64,
    last_mid: Option<Price>,
    tape: VecDeque<TradePrint>,
    next_order_id: u64,
    command_tx: Sender<CommandEnvelope>,
    command_rx: Receiver<CommandEnvelope>,
    local_queue: VecDeque<CommandEnvelope>,
    subscribers: Vec<Sender<MarketSnapshot>>,
    journal: Option<Journal>,
    /// Taker fills from the current tick; mature next tick.
    pending_toxicity: Vec<PendingToxicity>,
    /// Taker fills from the previous tick; resolved at this tick's end mid.
    maturing_toxicity: Vec<PendingToxicity>,
    /// Forced liquidations to inject at the start of the next tick.
    pending_flatten: Vec<risk::FlattenDirective>,
    paused: bool,
    poisoned: Option<String>,
}

impl Simulator {
    /// Build a session with the standard bot roster.
    pub fn new(config: ExchangeConfig, seed: u64) -> Self {
        Self::with_bots(config, seed, standard_roster(1))
    }

    /// Build a session with no bots: only user commands move the market.
    pub fn bare(config: ExchangeConfig, seed: u64) -> Self {
        Self::with_bots(config, seed, Vec::new())
    }

    /// Build a session with an explicit roster. Roster order is part of
    /// the deterministic contract.
    pub fn with_bots(config: ExchangeConfig, seed: u64, mut bots: Vec<Bot>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule = FairValueSchedule::draw(&mut rng);

        let mut traders = BTreeMap::new();
        traders.insert(USER_TRADER_ID, Trader::new(USER_TRADER_ID, "you", false));
        for bot in &bots {
            let id = bot.handle.trader_id();
            traders.insert(id, Trader::new(id, bot.handle.name(), true));
        }

        // Initial latency draws, in roster order.
        for bot in &mut bots {
            bot.handle.reschedule(0, config.bot_latency_multiplier, &mut rng);
        }

        let fair_value = schedule.fair_value(0);
        let uncertainty = schedule.uncertainty(0);
        let (command_tx, command_rx) = unbounded();

        Self {
            book: OrderBook::new(config.tick()),
            engine: MatchingEngine::new(),
            risk: RiskManager::new(&config),
            config,
            seed,
            now: 0,
            traders,
            bots,
            rng,
            schedule,
            fair_value,
            uncertainty,
            volatility: 1.0,
            last_mid: None,
            tape: VecDeque::new(),
            next_order_id: 1,
            command_tx,
            command_rx,
            local_queue: VecDeque::new(),
            subscribers: Vec::new(),
            journal: None,
            pending_toxicity: Vec::new(),
            maturing_toxicity: Vec::new(),
            pending_flatten: Vec::new(),
            paused: false,
            poisoned: None,
        }
    }

    // =========================================================================
    // Wiring
    // =========================================================================

    /// Open a journal at `path` and write the header line.
    pub fn attach_journal(&mut self, path: impl AsRef<Path>) -> Result<(), JournalError> {
        let mut journal = Journal::create(path)?;
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        journal.append(&Record::Header {
            tick: 0,
            seed: self.seed,
            config: self.config.clone(),
            started_at,
        })?;
        journal.flush()?;
        self.journal = Some(journal);
        Ok(())
    }

    /// Clone of the MPSC sender external threads use to queue commands.
    pub fn command_sender(&self) -> Sender<CommandEnvelope> {
        self.command_tx.clone()
    }

    /// Queue a command locally (same drain point as the channel).
    pub fn queue_command(&mut self, command: Command) {
        self.local_queue.push_back(command.into());
    }

    /// Register a snapshot subscriber; it receives a value copy per tick.
    pub fn subscribe(&mut self) -> Receiver<MarketSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn trader(&self, id: TraderId) -> Option<&Trader> {
        self.traders.get(&id)
    }

    /// All trader ledgers in id order.
    pub fn traders(&self) -> impl Iterator<Item = &Trader> {
        self.traders.values()
    }

    pub fn total_matches(&self) -> u64 {
        self.engine.total_matches()
    }

    pub fn total_volume(&self) -> u64 {
        self.engine.total_volume()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn poisoned(&self) -> Option<&str> {
        self.poisoned.as_deref()
    }

    pub fn fair_value(&self) -> f64 {
        self.fair_value
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Build a snapshot of the current state on demand.
    pub fn snapshot(&self) -> MarketSnapshot {
        self.build_snapshot()
    }

    // =========================================================================
    // Tick pipeline
    // =========================================================================

    /// Run one complete tick. See the crate docs for the phase order.
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        if let Some(reason) = &self.poisoned {
            return Err(SimError::Poisoned(reason.clone()));
        }

        self.now += 1;
        let now = self.now;

        // Phase 2: expire stale GTC quotes.
        self.book.expire(now);

        // Phase 3: fair value and uncertainty from the session schedule.
        self.fair_value = self.schedule.fair_value(now);
        self.uncertainty = self.schedule.uncertainty(now);

        let mut ioc_ids: Vec<OrderId> = Vec::new();
        let mut session_events: Vec<SessionEvent> = Vec::new();
        let mut accepted_commands: Vec<(Command, Option<OrderId>)> = Vec::new();

        // Phase 4: inject forced liquidations deferred from the last tick.
        let directives = std::mem::take(&mut self.pending_flatten);
        for d in directives {
            self.book.cancel_all(d.trader_id);
            let id = self.allocate_order_id();
            let order =
                Order::new(id, d.trader_id, d.side, d.price, d.qty, now, TimeInForce::Ioc, None);
            match self.book.insert(order) {
                Ok(()) => {
                    ioc_ids.push(id);
                    session_events.push(SessionEvent::ForcedLiquidation {
                        trader_id: d.trader_id,
                        side: d.side,
                        qty: d.qty,
                        price: d.price,
                        tick: now,
                    });
                    warn!(trader = %d.trader_id, qty = %d.qty, price = %d.price,
                          "forced liquidation injected");
                }
                Err(err) => warn!(trader = %d.trader_id, %err, "forced liquidation not placeable"),
            }
        }

        // Phase 5: consult bots in roster order behind their latency gates.
        let latency_mult = self.config.bot_latency_multiplier;
        let user_toxicity = self
            .traders
            .get(&USER_TRADER_ID)
            .map(|t| t.toxicity())
            .unwrap_or(0.0);
        let tape_snapshot: Vec<TradePrint> = self.tape.iter().copied().collect();
        let depth_n = self.config.snapshot_depth_n;
        let position_limit = self.config.position_limit;
        let tick_size = self.book.tick_size();

        for i in 0..self.bots.len() {
            if !self.bots[i].handle.ready(now) {
                continue;
            }
            let trader_id = self.bots[i].handle.trader_id();
            let (bids, asks) = self.book.depth(depth_n);
            let open_orders = self.book.orders_of(trader_id);
            let mark = self.mark_price();
            let (position, pnl, toxicity) = {
                let t = &self.traders[&trader_id];
                (t.position(), t.mark_to_market(mark), t.toxicity())
            };
            let decision = {
                let view = BotView {
                    now,
                    bids: &bids,
                    asks: &asks,
                    tape: &tape_snapshot,
                    fair_value: self.fair_value,
                    uncertainty: self.uncertainty,
                    volatility: self.volatility,
                    position,
                    pnl,
                    toxicity,
                    user_toxicity,
                    open_orders: &open_orders,
                    position_limit,
                    tick_size,
                };
                self.bots[i].consult(&view, latency_mult, &mut self.rng)
            };
            self.apply_decision(trader_id, decision, now, &mut ioc_ids, &mut session_events);
        }

        // Phase 6: drain queued user commands; same shape as bot output.
        let mut envelopes: Vec<CommandEnvelope> = self.local_queue.drain(..).collect();
        while let Ok(env) = self.command_rx.try_recv() {
            envelopes.push(env);
        }
        for env in envelopes {
            let result = self.apply_command(&env.command, now, &mut ioc_ids, &mut session_events);
            if result.is_accepted() {
                accepted_commands.push((env.command, result.order_id()));
            }
            if let Some(reply) = env.reply {
                let _ = reply.send(result);
            }
        }

        // Phase 7: match once.
        let events = self.engine.match_book(&mut self.book, now);

        // Phase 8: apply fills, maker first, with per-side fees.
        for ev in &events {
            let maker_side = ev.aggressor_side.opposite();
            let maker_fee = self.config.maker_fee_for(ev.qty);
            let taker_fee = self.config.taker_fee_for(ev.qty);
            if let Some(maker) = self.traders.get_mut(&ev.maker_trader_id) {
                maker.apply_fill(maker_side, ev.price, ev.qty, maker_fee, now);
            }
            if let Some(taker) = self.traders.get_mut(&ev.taker_trader_id) {
                taker.apply_fill(ev.aggressor_side, ev.price, ev.qty, taker_fee, now);
            }
            self.pending_toxicity.push(PendingToxicity {
                trader_id: ev.taker_trader_id,
                fill_price: ev.price,
                aggressor_sign: ev.aggressor_side.sign(),
            });
            self.tape.push_back(TradePrint::from(ev));
            session_events.push(SessionEvent::Match(ev.clone()));
        }
        while self.tape.len() > self.config.tape_window {
            self.tape.pop_front();
        }

        // Phase 9: IOC remainders never rest past their tick.
        for id in &ioc_ids {
            let _ = self.book.cancel(*id);
        }

        // Phase 10: volatility feedback and deferred toxicity resolution.
        let mid = self.book.mid_price();
        let mid_move_ticks = match (self.last_mid, mid) {
            (Some(prev), Some(cur)) => {
                (cur - prev).abs().raw() as f64 / tick_size.raw() as f64
            }
            _ => 0.0,
        };
        let mut vol = self.volatility;
        if !events.is_empty() && mid_move_ticks > 0.0 {
            vol *= 1.0 + 0.01 * mid_move_ticks.min(3.0);
        }
        if events.len() > 2 {
            vol *= 1.03;
        } else {
            vol *= 0.999;
        }
        self.volatility = vol.clamp(1.0, self.config.volatility_cap);
        if mid.is_some() {
            self.last_mid = mid;
        }

        let matured = std::mem::take(&mut self.maturing_toxicity);
        if let Some(mid) = mid {
            let mid_f = mid.to_float();
            let alpha = self.config.toxicity_alpha;
            for p in matured {
                let delta = mid_f - p.fill_price.to_float();
                let adverse = delta * p.aggressor_sign as f64 > 0.0;
                if let Some(trader) = self.traders.get_mut(&p.trader_id) {
                    trader.observe_toxicity(adverse, alpha);
                }
            }
        }
        self.maturing_toxicity = std::mem::take(&mut self.pending_toxicity);

        if let Some(mid) = mid {
            self.risk.observe_mid(mid.to_float());
        }

        // Phase 11: post-tick risk. Directives run next tick, never now.
        let mark = self.mark_price();
        let mut flatten = Vec::new();
        for trader in self.traders.values() {
            if let Some(directive) = self.risk.post_tick_check(trader, &self.book, mark) {
                flatten.push(directive);
            }
        }
        self.pending_flatten = flatten;

        // Phase 12: invariants, snapshot, journal, publish.
        if let Err(violation) = self.verify_invariants() {
            warn!(%violation, "invariant violation: poisoning simulator");
            self.poisoned = Some(violation);
        }

        let snapshot = self.build_snapshot();

        if let Some(journal) = self.journal.as_mut() {
            for (command, order_id) in &accepted_commands {
                journal.append(&Record::Command {
                    tick: now,
                    command: command.clone(),
                    order_id: *order_id,
                })?;
            }
            for event in &session_events {
                journal.append(&Record::Event { tick: now, event: event.clone() })?;
            }
            if now % SNAPSHOT_RECORD_INTERVAL == 0 {
                journal.append(&Record::Snapshot { tick: now, snapshot: snapshot.clone() })?;
            }
            if self.poisoned.is_some() {
                journal.flush()?;
            }
        }

        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());

        debug!(tick = now, matches = events.len(), "tick complete");
        Ok(TickReport { tick: now, events, snapshot })
    }

    /// Drain only control commands (used while paused, when `step` is not
    /// running and the queue would otherwise never move). Returns whether
    /// a manual `Tick` was requested.
    pub fn poll_control(&mut self) -> bool {
        let mut manual_tick = false;
        while let Ok(env) = self.command_rx.try_recv() {
            let result = match &env.command {
                Command::Pause => {
                    self.paused = true;
                    CommandResult::Accepted(None)
                }
                Command::Resume => {
                    self.paused = false;
                    CommandResult::Accepted(None)
                }
                Command::Tick => {
                    manual_tick = true;
                    CommandResult::Accepted(None)
                }
                _ => {
                    // Trading commands wait for the next tick's drain.
                    self.local_queue.push_back(env);
                    continue;
                }
            };
            if let Some(reply) = env.reply {
                let _ = reply.send(result);
            }
        }
        manual_tick
    }

    /// Step `ticks` times, honoring pause/resume between ticks.
    pub fn run(&mut self, ticks: u64) -> Result<(), SimError> {
        let mut done = 0;
        while done < ticks {
            let manual_tick = self.poll_control();
            if self.paused && !manual_tick {
                std::thread::sleep(std::time::Duration::from_millis(5));
                continue;
            }
            self.step()?;
            done += 1;
        }
        if let Some(journal) = self.journal.as_mut() {
            journal.flush()?;
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn allocate_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    /// Risk mark: the mid when the book is two-sided, else fair value.
    fn mark_price(&self) -> Price {
        self.book.mid_price().unwrap_or_else(|| {
            Price::from_float(self.fair_value).snap_to_tick(self.book.tick_size())
        })
    }

    fn default_expiry(&self, now: Tick) -> Option<Tick> {
        (self.config.quote_lifetime > 0).then(|| now + self.config.quote_lifetime)
    }

    /// Price an aggressive order to cross the opposite best.
    fn crossing_price(&self, side: Side) -> Option<Price> {
        let tick = self.book.tick_size();
        match side {
            Side::Bid => self.book.best_ask().map(|p| p.offset_ticks(tick, CROSS_TICKS)),
            Side::Ask => self
                .book
                .best_bid()
                .map(|p| p.offset_ticks(tick, -CROSS_TICKS))
                .filter(|p| p.is_positive()),
        }
    }

    /// Apply one bot decision: cancels first, then risk-gated quotes,
    /// then risk-gated IOC placements.
    fn apply_decision(
        &mut self,
        trader_id: TraderId,
        decision: Decision,
        now: Tick,
        ioc_ids: &mut Vec<OrderId>,
        session_events: &mut Vec<SessionEvent>,
    ) {
        for id in decision.cancels {
            if self.book.owner_of(id) == Some(trader_id) {
                let _ = self.book.cancel(id);
            }
        }

        let mark = self.mark_price();
        for quote in decision.quotes {
            if quote.qty.is_zero() {
                continue;
            }
            let trader = &self.traders[&trader_id];
            if let Err(reason) =
                self.risk
                    .check_order(trader, quote.side, quote.qty, TimeInForce::Gtc, &self.book, mark)
            {
                session_events.push(SessionEvent::RiskRejected { trader_id, reason, tick: now });
                continue;
            }
            let expires_at = quote.expires_at.or_else(|| self.default_expiry(now));
            let id = self.allocate_order_id();
            let order = Order::new(
                id,
                trader_id,
                quote.side,
                quote.price,
                quote.qty,
                now,
                TimeInForce::Gtc,
                expires_at,
            );
            if let Err(err) = self.book.insert(order) {
                debug!(trader = %trader_id, %err, "quote rejected by book");
            }
        }

        for ioc in decision.ioc {
            if ioc.qty.is_zero() {
                continue;
            }
            let Some(price) = self.crossing_price(ioc.side) else {
                continue;
            };
            let trader = &self.traders[&trader_id];
            if let Err(reason) =
                self.risk
                    .check_order(trader, ioc.side, ioc.qty, TimeInForce::Ioc, &self.book, mark)
            {
                session_events.push(SessionEvent::RiskRejected { trader_id, reason, tick: now });
                continue;
            }
            let id = self.allocate_order_id();
            let order =
                Order::new(id, trader_id, ioc.side, price, ioc.qty, now, TimeInForce::Ioc, None);
            match self.book.insert(order) {
                Ok(()) => ioc_ids.push(id),
                Err(err) => debug!(trader = %trader_id, %err, "ioc rejected by book"),
            }
        }
    }

    fn apply_command(
        &mut self,
        command: &Command,
        now: Tick,
        ioc_ids: &mut Vec<OrderId>,
        session_events: &mut Vec<SessionEvent>,
    ) -> CommandResult {
        match command {
            Command::Submit { trader, side, price, qty, tif } => {
                self.apply_submit(*trader, *side, *price, *qty, *tif, now, ioc_ids, session_events)
            }
            Command::Cancel { trader, order_id } => {
                if self.book.owner_of(*order_id) != Some(*trader) {
                    return CommandResult::Rejected(RejectKind::UnknownOrder);
                }
                match self.book.cancel(*order_id) {
                    Ok(_) => CommandResult::Accepted(None),
                    Err(_) => CommandResult::Rejected(RejectKind::UnknownOrder),
                }
            }
            Command::CancelAll { trader } => {
                self.book.cancel_all(*trader);
                CommandResult::Accepted(None)
            }
            Command::SetParam { key, value } => {
                if self.config.set_param(key, *value).is_err() {
                    return CommandResult::Rejected(RejectKind::UnknownParam);
                }
                self.risk.refresh(&self.config);
                CommandResult::Accepted(None)
            }
            Command::Pause => {
                self.paused = true;
                CommandResult::Accepted(None)
            }
            Command::Resume => {
                self.paused = false;
                CommandResult::Accepted(None)
            }
            Command::Tick => CommandResult::Accepted(None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_submit(
        &mut self,
        trader_id: TraderId,
        side: Side,
        price: Option<Price>,
        qty: Quantity,
        tif: TimeInForce,
        now: Tick,
        ioc_ids: &mut Vec<OrderId>,
        session_events: &mut Vec<SessionEvent>,
    ) -> CommandResult {
        if qty.is_zero() {
            return CommandResult::Rejected(RejectKind::BadQty);
        }
        let tick = self.book.tick_size();
        let price = match price {
            Some(p) if p.is_positive() && p.is_on_tick(tick) => p,
            Some(_) => return CommandResult::Rejected(RejectKind::BadPrice),
            None => {
                // Priceless submissions are market-style IOC orders.
                if tif != TimeInForce::Ioc {
                    return CommandResult::Rejected(RejectKind::BadPrice);
                }
                match self.crossing_price(side) {
                    Some(p) => p,
                    None => return CommandResult::Rejected(RejectKind::BadPrice),
                }
            }
        };

        self.traders
            .entry(trader_id)
            .or_insert_with(|| Trader::new(trader_id, format!("trader-{}", trader_id.0), false));

        let mark = self.mark_price();
        let trader = &self.traders[&trader_id];
        if let Err(reason) = self.risk.check_order(trader, side, qty, tif, &self.book, mark) {
            session_events.push(SessionEvent::RiskRejected { trader_id, reason, tick: now });
            return CommandResult::Rejected(RejectKind::Risk(reason));
        }

        let expires_at = match tif {
            TimeInForce::Gtc => self.default_expiry(now),
            TimeInForce::Ioc => None,
        };
        let id = self.allocate_order_id();
        let order = Order::new(id, trader_id, side, price, qty, now, tif, expires_at);
        match self.book.insert(order) {
            Ok(()) => {
                if tif == TimeInForce::Ioc {
                    ioc_ids.push(id);
                }
                CommandResult::Accepted(Some(id))
            }
            Err(BookError::BadPrice(_)) => CommandResult::Rejected(RejectKind::BadPrice),
            Err(_) => CommandResult::Rejected(RejectKind::BadQty),
        }
    }

    /// Book-structure and no-crossed-book invariants. A violation is
    /// fatal: the simulator stops ticking and surfaces the reason in the
    /// snapshot's `fatal` field.
    fn verify_invariants(&self) -> Result<(), String> {
        self.book.check_consistency()?;
        if let (Some(bid), Some(ask)) = (self.book.best_bid(), self.book.best_ask())
            && bid >= ask
        {
            return Err(format!("crossed book after tick: bid {bid} >= ask {ask}"));
        }
        Ok(())
    }

    fn build_snapshot(&self) -> MarketSnapshot {
        let (bids, asks) = self.book.depth(self.config.snapshot_depth_n);
        let mark = self.mark_price();
        let traders = self
            .traders
            .values()
            .map(|t| TraderStat {
                trader_id: t.trader_id(),
                name: t.name().to_owned(),
                position: t.position(),
                cash: t.cash(),
                realized_pnl: t.realized_pnl(),
                unrealized_pnl: t.unrealized_pnl(mark),
                vwap: t.vwap(),
                toxicity: t.toxicity(),
                value_at_risk: self.risk.value_at_risk(t.position()),
            })
            .collect();

        MarketSnapshot {
            tick: self.now,
            bids,
            asks,
            best_bid: self.book.best_bid(),
            best_ask: self.book.best_ask(),
            mid: self.book.mid_price(),
            last_trade: self.book.last_trade(),
            fair_value: self.fair_value,
            uncertainty: self.uncertainty,
            volatility: self.volatility,
            traders,
            fatal: self.poisoned.clone(),
        }
    }
}
