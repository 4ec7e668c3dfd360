use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::TraderConfig;
use crate::risk::{PositionState, RiskDecision, RiskGate};
use crate::signal::{Signal, SignalEvaluator};
use crate::spread_window::RollingSpreadWindow;
use crate::trade::execution::venue::Venue;
use crate::trade::hedge::HedgeExecutor;
use crate::trade::orders::{OrderLifecycleManager, Quotes};
use crate::types::{BookLevels, Instrument, Lifespan, Side, VenueEvent, LOT_SIZE};

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineCounters {
    pub events: u64,
    pub ratio_samples: u64,
    pub orders_submitted: u64,
    pub cancels_sent: u64,
    pub risk_rejections: u64,
    pub degenerate_windows: u64,
    pub sequence_gaps: u64,
    pub handler_errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub positions: PositionState,
    pub bid_id: u64,
    pub ask_id: u64,
    pub open_orders: usize,
    pub last_ratio: Option<f64>,
    pub hedges_sent: u64,
    pub lots_hedged: u64,
    pub counters: EngineCounters,
}

/// Strategy state for one ETF/FUTURE pair. Every inbound event goes through
/// exactly one handler, in delivery order, on a single task.
pub struct PairTradeEngine<V: Venue> {
    venue: V,
    observe_only: bool,
    window: RollingSpreadWindow,
    signals: SignalEvaluator,
    risk: RiskGate,
    orders: OrderLifecycleManager,
    hedger: HedgeExecutor,
    positions: PositionState,
    etf_book: Option<BookLevels>,
    etf_mid: Option<f64>,
    future_mid: Option<f64>,
    last_sequence: HashMap<Instrument, u64>,
    counters: EngineCounters,
}

impl<V: Venue> PairTradeEngine<V> {
    pub fn new(cfg: &TraderConfig, venue: V) -> Self {
        Self {
            venue,
            observe_only: cfg.observe_only,
            window: RollingSpreadWindow::new(cfg.spread_window, cfg.lookback_mode),
            signals: SignalEvaluator::new(cfg.short_entry_z, cfg.long_entry_z),
            risk: RiskGate::default(),
            orders: OrderLifecycleManager::new(),
            hedger: HedgeExecutor::new(),
            positions: PositionState::default(),
            etf_book: None,
            etf_mid: None,
            future_mid: None,
            last_sequence: HashMap::new(),
            counters: EngineCounters::default(),
        }
    }

    /// Drains the queue until every sender is gone.
    pub async fn run(&mut self, mut events: UnboundedReceiver<VenueEvent>) -> EngineSnapshot {
        log::info!(
            "[CONFIG] window={} lookback={:?} observe_only={}",
            self.window.window(),
            self.window.mode(),
            self.observe_only
        );
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        let snapshot = self.snapshot();
        log::info!(
            "[ENGINE] done: events={} orders={} cancels={} hedges={} etf={} future={}",
            snapshot.counters.events,
            snapshot.counters.orders_submitted,
            snapshot.counters.cancels_sent,
            snapshot.hedges_sent,
            snapshot.positions.primary,
            snapshot.positions.hedge
        );
        snapshot
    }

    /// Processes one event. Failures are logged and never reach the caller.
    pub fn handle(&mut self, event: VenueEvent) {
        self.counters.events += 1;
        let result = match event {
            VenueEvent::OrderBookUpdate {
                instrument,
                sequence_number,
                levels,
            } => self.on_order_book_update(instrument, sequence_number, &levels),
            VenueEvent::TradeTicks {
                instrument,
                sequence_number,
                levels,
            } => {
                self.on_trade_ticks(instrument, sequence_number, &levels);
                Ok(())
            }
            VenueEvent::OrderFilled {
                order_id,
                price,
                volume,
            } => self.on_order_filled(order_id, price, volume),
            VenueEvent::HedgeFilled {
                order_id,
                price,
                volume,
            } => {
                self.on_hedge_filled(order_id, price, volume);
                Ok(())
            }
            VenueEvent::OrderStatus {
                order_id,
                fill_volume,
                remaining_volume,
                fees,
            } => {
                self.on_order_status(order_id, fill_volume, remaining_volume, fees);
                Ok(())
            }
            VenueEvent::Error { order_id, message } => {
                self.on_error(order_id, &message);
                Ok(())
            }
        };
        if let Err(e) = result {
            self.counters.handler_errors += 1;
            log::error!("[ENGINE] event handling failed: {:?}", e);
        }
    }

    fn track_sequence(&mut self, instrument: Instrument, sequence_number: u64) {
        if let Some(prev) = self.last_sequence.insert(instrument, sequence_number) {
            if sequence_number <= prev {
                self.counters.sequence_gaps += 1;
                log::warn!(
                    "[FEED] {:?} book out of order: {} after {}",
                    instrument,
                    sequence_number,
                    prev
                );
            } else if sequence_number > prev + 1 {
                self.counters.sequence_gaps += 1;
                log::warn!(
                    "[FEED] {:?} book missed {} update(s) before {}",
                    instrument,
                    sequence_number - prev - 1,
                    sequence_number
                );
            }
        }
    }

    pub fn on_order_book_update(
        &mut self,
        instrument: Instrument,
        sequence_number: u64,
        levels: &BookLevels,
    ) -> Result<()> {
        log::debug!(
            "[BOOK] {:?} seq={} bid={} ask={}",
            instrument,
            sequence_number,
            levels.best_bid(),
            levels.best_ask()
        );
        self.track_sequence(instrument, sequence_number);

        let mid = levels.mid_price();
        match instrument {
            Instrument::Etf => {
                self.etf_book = Some(*levels);
                if mid.is_some() {
                    self.etf_mid = mid;
                }
            }
            Instrument::Future => {
                if mid.is_some() {
                    self.future_mid = mid;
                }
            }
        }
        let ratio = match (self.etf_mid, self.future_mid) {
            (Some(etf), Some(future)) => etf / future,
            _ => return Ok(()),
        };
        self.window.append(ratio);
        self.counters.ratio_samples += 1;
        if !self.window.is_ready() {
            return Ok(());
        }

        let quotes = self
            .etf_book
            .as_ref()
            .map(Quotes::from_levels)
            .unwrap_or_default();
        let cancelled = self
            .orders
            .cancel_stale(&quotes, &mut self.venue)
            .context("failed to send cancel")?;
        if cancelled.is_some() {
            self.counters.cancels_sent += 1;
            return Ok(());
        }

        let stats = match self.window.stats() {
            Some(stats) => stats,
            None => return Ok(()),
        };
        let (z, signal) = match self.signals.evaluate(ratio, &stats) {
            Ok(v) => v,
            Err(e) => {
                self.counters.degenerate_windows += 1;
                log::warn!("[SIGNAL] {}; no decision this tick", e);
                return Ok(());
            }
        };
        log::debug!(
            "[SIGNAL] ratio={:.6} mean={:.6} std={:.6} z={:.3} {:?}",
            ratio,
            stats.mean,
            stats.stddev,
            z,
            signal
        );
        // both entries require a live ETF ask; an empty bid level still quotes one tick
        if quotes.ask == 0 {
            if signal != Signal::None {
                log::debug!("[SIGNAL] {:?} skipped: ETF ask side is empty", signal);
            }
            return Ok(());
        }
        match signal {
            Signal::ShortEtf => self.try_enter(Side::Ask, quotes.ask),
            Signal::LongEtf => self.try_enter(Side::Bid, quotes.bid),
            Signal::None => Ok(()),
        }
    }

    fn try_enter(&mut self, side: Side, price: i64) -> Result<()> {
        if self.orders.slot_id(side) != 0 {
            return Ok(());
        }
        let outstanding = self.orders.outstanding_volume(side);
        if let RiskDecision::Reject(reason) =
            self.risk
                .check(side, LOT_SIZE, &self.positions, outstanding)
        {
            self.counters.risk_rejections += 1;
            log::debug!("[RISK] skip {} ETF: {}", side.label(), reason);
            return Ok(());
        }
        if self.observe_only {
            log::info!(
                "[OBSERVE] would {} {} ETF @ {}",
                side.label(),
                LOT_SIZE,
                price
            );
            return Ok(());
        }
        self.orders
            .submit(side, price, LOT_SIZE, Lifespan::FillAndKill, &mut self.venue)
            .with_context(|| format!("failed to insert {} order at {}", side.label(), price))?;
        self.counters.orders_submitted += 1;
        Ok(())
    }

    pub fn on_trade_ticks(&mut self, instrument: Instrument, sequence_number: u64, levels: &BookLevels) {
        log::debug!(
            "[TICKS] {:?} seq={} best_bid_traded={} best_ask_traded={}",
            instrument,
            sequence_number,
            levels.best_bid(),
            levels.best_ask()
        );
    }

    pub fn on_order_filled(&mut self, order_id: u64, price: i64, volume: u32) -> Result<()> {
        log::info!(
            "[FILL] order {} price={} volume={}",
            order_id,
            price,
            volume
        );
        let side = match self.orders.on_fill(order_id, volume) {
            Some(side) => side,
            None => {
                log::warn!("[FILL] order {} is not tracked; no hedge", order_id);
                return Ok(());
            }
        };
        let hedge_id = self.orders.next_order_id();
        self.hedger
            .on_fill(side, volume, hedge_id, &mut self.positions, &mut self.venue)
            .with_context(|| format!("failed to hedge fill of order {}", order_id))?;
        Ok(())
    }

    pub fn on_hedge_filled(&mut self, order_id: u64, price: i64, volume: u32) {
        log::info!(
            "[HEDGE] filled order {} avg_price={} volume={}",
            order_id,
            price,
            volume
        );
    }

    pub fn on_order_status(
        &mut self,
        order_id: u64,
        fill_volume: u32,
        remaining_volume: u32,
        fees: i64,
    ) {
        log::info!(
            "[STATUS] order {} filled={} remaining={} fees={}",
            order_id,
            fill_volume,
            remaining_volume,
            fees
        );
        if let Some(closed) = self
            .orders
            .on_status(order_id, fill_volume, remaining_volume)
        {
            log::info!(
                "[ORDER] {} id={} closed as {:?}",
                closed.side.label(),
                closed.id,
                closed.status
            );
        }
    }

    pub fn on_error(&mut self, order_id: u64, message: &str) {
        log::warn!("[ERROR] order {}: {}", order_id, message);
        if order_id == 0 {
            return;
        }
        match self.orders.on_error(order_id) {
            Some(closed) => log::info!(
                "[ORDER] {} id={} released after error",
                closed.side.label(),
                closed.id
            ),
            None => log::debug!("[ERROR] order {} not open; nothing to release", order_id),
        }
    }

    pub fn positions(&self) -> PositionState {
        self.positions
    }

    pub fn orders(&self) -> &OrderLifecycleManager {
        &self.orders
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            positions: self.positions,
            bid_id: self.orders.slot_id(Side::Bid),
            ask_id: self.orders.slot_id(Side::Ask),
            open_orders: self.orders.open_orders().count(),
            last_ratio: self.window.latest(),
            hedges_sent: self.hedger.hedges_sent(),
            lots_hedged: self.hedger.lots_hedged(),
            counters: self.counters.clone(),
        }
    }
}
