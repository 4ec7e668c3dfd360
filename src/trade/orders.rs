use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::trade::execution::venue::{Venue, VenueError};
use crate::types::{BookLevels, Lifespan, Side, TICK_SIZE_IN_CENTS};

/// Closed orders stay resolvable for late fills until this many newer ones closed.
const RETIRED_ORDER_RETENTION: usize = 256;

/// Rounds a bid onto the tick grid, one tick up when already aligned. An empty
/// level rounds to one tick.
pub fn quantize_bid(price: i64) -> i64 {
    (price + TICK_SIZE_IN_CENTS) / TICK_SIZE_IN_CENTS * TICK_SIZE_IN_CENTS
}

/// Floors an ask onto the tick grid. Empty stays 0.
pub fn quantize_ask(price: i64) -> i64 {
    if price <= 0 {
        return 0;
    }
    price / TICK_SIZE_IN_CENTS * TICK_SIZE_IN_CENTS
}

/// Tick-aligned prices the strategy would quote right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quotes {
    pub bid: i64,
    pub ask: i64,
}

impl Quotes {
    pub fn from_levels(levels: &BookLevels) -> Self {
        Self {
            bid: quantize_bid(levels.best_bid()),
            ask: quantize_ask(levels.best_ask()),
        }
    }

    pub fn price(&self, side: Side) -> i64 {
        match side {
            Side::Bid => self.bid,
            Side::Ask => self.ask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    /// At least one fill received, fully or partially.
    Filled,
    Cancelled,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOrder {
    pub id: u64,
    pub side: Side,
    pub price: i64,
    pub volume: u32,
    /// Volume applied through fill notifications.
    pub filled: u32,
    /// Highest fill volume announced by a status notification.
    pub reported_fill: u32,
    pub status: OrderStatus,
    pub cancel_requested: bool,
    pub closed: bool,
}

impl TrackedOrder {
    fn new(id: u64, side: Side, price: i64, volume: u32) -> Self {
        Self {
            id,
            side,
            price,
            volume,
            filled: 0,
            reported_fill: 0,
            status: OrderStatus::Pending,
            cancel_requested: false,
            closed: false,
        }
    }

    /// Volume that may still move the position through future fill notifications.
    pub fn unapplied_volume(&self) -> u32 {
        if self.closed {
            self.reported_fill.saturating_sub(self.filled)
        } else {
            self.volume.saturating_sub(self.filled)
        }
    }
}

/// Owns the bid and ask slots and every order the strategy has sent.
#[derive(Debug)]
pub struct OrderLifecycleManager {
    next_order_id: u64,
    bid_slot: Option<u64>,
    ask_slot: Option<u64>,
    orders: HashMap<u64, TrackedOrder>,
    retired: VecDeque<u64>,
}

impl Default for OrderLifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderLifecycleManager {
    pub fn new() -> Self {
        Self {
            next_order_id: 1,
            bid_slot: None,
            ask_slot: None,
            orders: HashMap::new(),
            retired: VecDeque::with_capacity(RETIRED_ORDER_RETENTION),
        }
    }

    /// Ids are shared with hedge orders and never reused.
    pub fn next_order_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    fn slot_mut(&mut self, side: Side) -> &mut Option<u64> {
        match side {
            Side::Bid => &mut self.bid_slot,
            Side::Ask => &mut self.ask_slot,
        }
    }

    /// Id of the pending order on `side`, 0 when the slot is empty.
    pub fn slot_id(&self, side: Side) -> u64 {
        match side {
            Side::Bid => self.bid_slot,
            Side::Ask => self.ask_slot,
        }
        .unwrap_or(0)
    }

    pub fn slot(&self, side: Side) -> Option<&TrackedOrder> {
        match side {
            Side::Bid => self.bid_slot,
            Side::Ask => self.ask_slot,
        }
        .and_then(|id| self.orders.get(&id))
    }

    pub fn order(&self, id: u64) -> Option<&TrackedOrder> {
        self.orders.get(&id)
    }

    /// Orders the venue has not closed yet, including those with a cancel in flight.
    pub fn open_orders(&self) -> impl Iterator<Item = &TrackedOrder> + '_ {
        self.orders.values().filter(|o| !o.closed)
    }

    pub fn outstanding_volume(&self, side: Side) -> u32 {
        self.orders
            .values()
            .filter(|o| o.side == side)
            .map(TrackedOrder::unapplied_volume)
            .sum()
    }

    /// Cancels the first pending order whose side of the book moved away from
    /// its price. Bid is checked before ask; at most one cancel per call.
    pub fn cancel_stale<V: Venue + ?Sized>(
        &mut self,
        quotes: &Quotes,
        venue: &mut V,
    ) -> Result<Option<u64>, VenueError> {
        for side in [Side::Bid, Side::Ask] {
            let fresh = quotes.price(side);
            let stale = match self.slot(side) {
                Some(order) if fresh != 0 && fresh != order.price => order.id,
                _ => continue,
            };
            *self.slot_mut(side) = None;
            if let Some(order) = self.orders.get_mut(&stale) {
                order.cancel_requested = true;
            }
            log::info!(
                "[ORDER] cancel {} id={} placed_at={} now={}",
                side.label(),
                stale,
                self.orders.get(&stale).map(|o| o.price).unwrap_or_default(),
                fresh
            );
            venue.cancel_order(stale)?;
            return Ok(Some(stale));
        }
        Ok(None)
    }

    pub fn submit<V: Venue + ?Sized>(
        &mut self,
        side: Side,
        price: i64,
        volume: u32,
        lifespan: Lifespan,
        venue: &mut V,
    ) -> Result<u64, VenueError> {
        debug_assert!(self.slot_id(side) == 0, "slot already occupied");
        let id = self.next_order_id();
        venue.insert_order(id, side, price, volume, lifespan)?;
        self.orders
            .insert(id, TrackedOrder::new(id, side, price, volume));
        *self.slot_mut(side) = Some(id);
        log::info!(
            "[ORDER] insert {} id={} price={} volume={} lifespan={:?}",
            side.label(),
            id,
            price,
            volume,
            lifespan
        );
        Ok(id)
    }

    /// Records a fill and returns the side of the order it belongs to.
    pub fn on_fill(&mut self, id: u64, volume: u32) -> Option<Side> {
        let order = self.orders.get_mut(&id)?;
        order.filled = order.filled.saturating_add(volume);
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Filled;
        }
        if order.filled > order.volume {
            log::warn!(
                "[ORDER] id={} filled {} beyond its volume {}",
                id,
                order.filled,
                order.volume
            );
        }
        Some(order.side)
    }

    /// Handles a status notification; returns the order when this closed it.
    pub fn on_status(
        &mut self,
        id: u64,
        fill_volume: u32,
        remaining_volume: u32,
    ) -> Option<TrackedOrder> {
        let order = self.orders.get_mut(&id)?;
        order.reported_fill = order.reported_fill.max(fill_volume);
        if remaining_volume > 0 || order.closed {
            return None;
        }
        order.closed = true;
        order.status = if order.reported_fill == 0 && order.filled == 0 {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Filled
        };
        let closed = order.clone();
        self.release(id);
        Some(closed)
    }

    /// An error for a tracked order closes it exactly like a zero-remaining status.
    pub fn on_error(&mut self, id: u64) -> Option<TrackedOrder> {
        let reported = self.orders.get(&id)?.reported_fill;
        self.on_status(id, reported, 0)?;
        let order = self.orders.get_mut(&id)?;
        order.status = OrderStatus::Errored;
        Some(order.clone())
    }

    fn release(&mut self, id: u64) {
        for side in [Side::Bid, Side::Ask] {
            if self.slot_id(side) == id {
                *self.slot_mut(side) = None;
            }
        }
        self.retired.push_back(id);
        while self.retired.len() > RETIRED_ORDER_RETENTION {
            if let Some(old) = self.retired.pop_front() {
                self.orders.remove(&old);
            }
        }
    }
}
