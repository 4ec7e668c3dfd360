use serde::{Deserialize, Serialize};

pub const LOT_SIZE: u32 = 10;
pub const POSITION_LIMIT: i64 = 100;
pub const FUTURE_LIMIT: i64 = 100;
pub const TICK_SIZE_IN_CENTS: i64 = 100;
pub const MINIMUM_BID: i64 = 1;
pub const MAXIMUM_ASK: i64 = (1 << 31) - 1;
pub const MIN_BID_NEAREST_TICK: i64 =
    (MINIMUM_BID + TICK_SIZE_IN_CENTS) / TICK_SIZE_IN_CENTS * TICK_SIZE_IN_CENTS;
pub const MAX_ASK_NEAREST_TICK: i64 = MAXIMUM_ASK / TICK_SIZE_IN_CENTS * TICK_SIZE_IN_CENTS;

/// Depth of every book / trade-ticks message.
pub const BOOK_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Etf,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Bid => "BUY",
            Side::Ask => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifespan {
    /// Executes against resting liquidity up to the limit, remainder is cancelled.
    FillAndKill,
    GoodForDay,
}

/// Five price levels per side, best first. Missing levels are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookLevels {
    pub ask_prices: [i64; BOOK_DEPTH],
    pub ask_volumes: [i64; BOOK_DEPTH],
    pub bid_prices: [i64; BOOK_DEPTH],
    pub bid_volumes: [i64; BOOK_DEPTH],
}

impl BookLevels {
    pub fn best_bid(&self) -> i64 {
        self.bid_prices[0]
    }

    pub fn best_ask(&self) -> i64 {
        self.ask_prices[0]
    }

    /// Mean of best bid and best ask, only when both sides are populated.
    pub fn mid_price(&self) -> Option<f64> {
        let (bid, ask) = (self.best_bid(), self.best_ask());
        if bid <= 0 || ask <= 0 {
            return None;
        }
        Some((bid + ask) as f64 / 2.0)
    }
}

/// Inbound notifications from the venue, in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VenueEvent {
    OrderBookUpdate {
        instrument: Instrument,
        sequence_number: u64,
        #[serde(flatten)]
        levels: BookLevels,
    },
    TradeTicks {
        instrument: Instrument,
        sequence_number: u64,
        #[serde(flatten)]
        levels: BookLevels,
    },
    OrderFilled {
        order_id: u64,
        price: i64,
        volume: u32,
    },
    HedgeFilled {
        order_id: u64,
        price: i64,
        volume: u32,
    },
    OrderStatus {
        order_id: u64,
        fill_volume: u32,
        remaining_volume: u32,
        fees: i64,
    },
    Error {
        order_id: u64,
        message: String,
    },
}

/// Outbound requests to the venue. Acknowledgement arrives later as a `VenueEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VenueCommand {
    InsertOrder {
        order_id: u64,
        side: Side,
        price: i64,
        volume: u32,
        lifespan: Lifespan,
    },
    HedgeOrder {
        order_id: u64,
        side: Side,
        price: i64,
        volume: u32,
    },
    CancelOrder {
        order_id: u64,
    },
}

impl VenueCommand {
    pub fn order_id(&self) -> u64 {
        match self {
            VenueCommand::InsertOrder { order_id, .. }
            | VenueCommand::HedgeOrder { order_id, .. }
            | VenueCommand::CancelOrder { order_id } => *order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggressive_hedge_prices_are_tick_aligned() {
        assert_eq!(MIN_BID_NEAREST_TICK, 100);
        assert_eq!(MAX_ASK_NEAREST_TICK, 2_147_483_600);
        assert_eq!(MAX_ASK_NEAREST_TICK % TICK_SIZE_IN_CENTS, 0);
    }

    #[test]
    fn mid_price_requires_both_sides() {
        let mut levels = BookLevels::default();
        levels.bid_prices[0] = 19_950;
        assert_eq!(levels.mid_price(), None);
        levels.ask_prices[0] = 20_050;
        assert_eq!(levels.mid_price(), Some(20_000.0));
    }

    #[test]
    fn book_update_parses_from_flat_json() {
        let raw = r#"{"type":"order_book_update","instrument":"etf","sequence_number":3,
            "ask_prices":[20100,20200,0,0,0],"ask_volumes":[5,7,0,0,0],
            "bid_prices":[19900,19800,0,0,0],"bid_volumes":[4,2,0,0,0]}"#;
        let event: VenueEvent = serde_json::from_str(raw).unwrap();
        match event {
            VenueEvent::OrderBookUpdate {
                instrument,
                sequence_number,
                levels,
            } => {
                assert_eq!(instrument, Instrument::Etf);
                assert_eq!(sequence_number, 3);
                assert_eq!(levels.best_ask(), 20_100);
                assert_eq!(levels.best_bid(), 19_900);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn command_serializes_with_snake_case_tag() {
        let cmd = VenueCommand::InsertOrder {
            order_id: 1,
            side: Side::Ask,
            price: 20_000,
            volume: LOT_SIZE,
            lifespan: Lifespan::FillAndKill,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""type":"insert_order""#));
        assert!(json.contains(r#""lifespan":"fill_and_kill""#));
    }

    #[test]
    fn recorded_commands_accept_both_lifespans() {
        let raw = r#"{"type":"insert_order","order_id":4,"side":"bid","price":19900,"volume":10,"lifespan":"good_for_day"}"#;
        let cmd: VenueCommand = serde_json::from_str(raw).unwrap();
        assert_eq!(
            cmd,
            VenueCommand::InsertOrder {
                order_id: 4,
                side: Side::Bid,
                price: 19_900,
                volume: LOT_SIZE,
                lifespan: Lifespan::GoodForDay,
            }
        );
    }
}
