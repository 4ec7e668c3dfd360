use crate::risk::PositionState;
use crate::trade::execution::venue::{Venue, VenueError};
use crate::types::{Side, MAX_ASK_NEAREST_TICK, MIN_BID_NEAREST_TICK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HedgeOrder {
    pub order_id: u64,
    pub side: Side,
    pub price: i64,
    pub volume: u32,
}

/// Offsets every ETF fill with a marketable FUTURE order of the same size.
#[derive(Debug, Default)]
pub struct HedgeExecutor {
    hedges_sent: u64,
    lots_hedged: u64,
}

impl HedgeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side and price of the hedge for a fill on `fill_side`: the far end of the
    /// valid price range, so the hedge always crosses.
    pub fn hedge_for(fill_side: Side) -> (Side, i64) {
        match fill_side {
            Side::Bid => (Side::Ask, MIN_BID_NEAREST_TICK),
            Side::Ask => (Side::Bid, MAX_ASK_NEAREST_TICK),
        }
    }

    /// Books the fill on the primary counter and sends the hedge. The hedge
    /// counter moves only once the hedge has actually been sent.
    pub fn on_fill<V: Venue + ?Sized>(
        &mut self,
        fill_side: Side,
        volume: u32,
        hedge_order_id: u64,
        positions: &mut PositionState,
        venue: &mut V,
    ) -> Result<Option<HedgeOrder>, VenueError> {
        if volume == 0 {
            return Ok(None);
        }
        positions.apply_primary_fill(fill_side, volume);
        let (side, price) = Self::hedge_for(fill_side);
        // on a failed send the FUTURE position stays where it was while the ETF fill is booked
        venue.hedge_order(hedge_order_id, side, price, volume)?;
        positions.apply_hedge(side, volume);
        self.hedges_sent += 1;
        self.lots_hedged += u64::from(volume);
        log::info!(
            "[HEDGE] {} FUTURE id={} price={} volume={} positions etf={} future={}",
            side.label(),
            hedge_order_id,
            price,
            volume,
            positions.primary,
            positions.hedge
        );
        Ok(Some(HedgeOrder {
            order_id: hedge_order_id,
            side,
            price,
            volume,
        }))
    }

    pub fn hedges_sent(&self) -> u64 {
        self.hedges_sent
    }

    pub fn lots_hedged(&self) -> u64 {
        self.lots_hedged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::execution::venue::ChannelVenue;
    use crate::types::VenueCommand;
    use tokio::sync::mpsc;

    #[test]
    fn bid_fill_sells_future_at_minimum_tick() {
        let mut hedger = HedgeExecutor::new();
        let mut positions = PositionState::default();
        let mut venue = Vec::new();
        let hedge = hedger
            .on_fill(Side::Bid, 10, 7, &mut positions, &mut venue)
            .unwrap()
            .unwrap();
        assert_eq!(hedge.side, Side::Ask);
        assert_eq!(hedge.price, MIN_BID_NEAREST_TICK);
        assert_eq!(positions, PositionState { primary: 10, hedge: -10 });
        assert_eq!(
            venue,
            vec![VenueCommand::HedgeOrder {
                order_id: 7,
                side: Side::Ask,
                price: MIN_BID_NEAREST_TICK,
                volume: 10,
            }]
        );
    }

    #[test]
    fn ask_fill_buys_future_at_maximum_tick() {
        let mut hedger = HedgeExecutor::new();
        let mut positions = PositionState::default();
        let mut venue = Vec::new();
        hedger
            .on_fill(Side::Ask, 4, 3, &mut positions, &mut venue)
            .unwrap();
        assert_eq!(positions, PositionState { primary: -4, hedge: 4 });
        assert_eq!(
            venue[0],
            VenueCommand::HedgeOrder {
                order_id: 3,
                side: Side::Bid,
                price: MAX_ASK_NEAREST_TICK,
                volume: 4,
            }
        );
        assert_eq!(hedger.hedges_sent(), 1);
        assert_eq!(hedger.lots_hedged(), 4);
    }

    #[test]
    fn empty_fill_sends_nothing() {
        let mut hedger = HedgeExecutor::new();
        let mut positions = PositionState::default();
        let mut venue: Vec<VenueCommand> = Vec::new();
        assert!(hedger
            .on_fill(Side::Ask, 0, 1, &mut positions, &mut venue)
            .unwrap()
            .is_none());
        assert!(venue.is_empty());
    }

    #[test]
    fn failed_hedge_send_leaves_future_position_unchanged() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut venue = ChannelVenue::new(tx);
        let mut hedger = HedgeExecutor::new();
        let mut positions = PositionState::default();
        assert!(hedger
            .on_fill(Side::Bid, 10, 2, &mut positions, &mut venue)
            .is_err());
        assert_eq!(positions, PositionState { primary: 10, hedge: 0 });
        assert_eq!(hedger.hedges_sent(), 0);
    }
}
