use serde::Serialize;

use crate::types::{Side, FUTURE_LIMIT, POSITION_LIMIT};

/// Net lots held in the quoted instrument (ETF) and the hedge instrument (FUTURE).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionState {
    pub primary: i64,
    pub hedge: i64,
}

impl PositionState {
    /// Applies a fill on the quoted instrument.
    pub fn apply_primary_fill(&mut self, side: Side, volume: u32) {
        match side {
            Side::Bid => self.primary += i64::from(volume),
            Side::Ask => self.primary -= i64::from(volume),
        }
    }

    /// Books a hedge order as if already filled.
    pub fn apply_hedge(&mut self, hedge_side: Side, volume: u32) {
        match hedge_side {
            Side::Bid => self.hedge += i64::from(volume),
            Side::Ask => self.hedge -= i64::from(volume),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Allow,
    Reject(String),
}

#[derive(Debug, Clone)]
pub struct RiskGate {
    position_limit: i64,
    future_limit: i64,
}

impl Default for RiskGate {
    fn default() -> Self {
        Self::new(POSITION_LIMIT, FUTURE_LIMIT)
    }
}

impl RiskGate {
    pub fn new(position_limit: i64, future_limit: i64) -> Self {
        Self {
            position_limit,
            future_limit,
        }
    }

    /// `outstanding` is the same-side volume that may still fill from orders already sent.
    pub fn check(
        &self,
        side: Side,
        volume: u32,
        positions: &PositionState,
        outstanding: u32,
    ) -> RiskDecision {
        if volume == 0 {
            return RiskDecision::Reject("volume must be > 0".to_string());
        }
        let worst = i64::from(volume) + i64::from(outstanding);
        match side {
            Side::Ask => {
                let primary = positions.primary - worst;
                if primary < -self.position_limit {
                    return RiskDecision::Reject(format!(
                        "projected ETF position {} below -{}",
                        primary, self.position_limit
                    ));
                }
                let hedge = positions.hedge + worst;
                if hedge >= self.future_limit {
                    return RiskDecision::Reject(format!(
                        "projected FUTURE position {} reaches {}",
                        hedge, self.future_limit
                    ));
                }
            }
            Side::Bid => {
                let primary = positions.primary + worst;
                if primary > self.position_limit {
                    return RiskDecision::Reject(format!(
                        "projected ETF position {} above {}",
                        primary, self.position_limit
                    ));
                }
                let hedge = positions.hedge - worst;
                if hedge <= -self.future_limit {
                    return RiskDecision::Reject(format!(
                        "projected FUTURE position {} reaches -{}",
                        hedge, self.future_limit
                    ));
                }
            }
        }
        RiskDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LOT_SIZE;

    fn pos(primary: i64, hedge: i64) -> PositionState {
        PositionState { primary, hedge }
    }

    #[test]
    fn sell_may_reach_but_not_pass_the_primary_limit() {
        let gate = RiskGate::default();
        assert_eq!(gate.check(Side::Ask, LOT_SIZE, &pos(-90, 0), 0), RiskDecision::Allow);
        assert!(matches!(gate.check(Side::Ask, LOT_SIZE, &pos(-95, 0), 0), RiskDecision::Reject(_)));
    }

    #[test]
    fn buy_may_reach_but_not_pass_the_primary_limit() {
        let gate = RiskGate::default();
        assert_eq!(gate.check(Side::Bid, LOT_SIZE, &pos(90, 0), 0), RiskDecision::Allow);
        assert!(matches!(gate.check(Side::Bid, LOT_SIZE, &pos(91, 0), 0), RiskDecision::Reject(_)));
    }

    #[test]
    fn hedge_limit_is_strict() {
        let gate = RiskGate::default();
        assert!(matches!(gate.check(Side::Ask, LOT_SIZE, &pos(0, 90), 0), RiskDecision::Reject(_)));
        assert_eq!(gate.check(Side::Ask, LOT_SIZE, &pos(0, 89), 0), RiskDecision::Allow);
        assert!(matches!(gate.check(Side::Bid, LOT_SIZE, &pos(0, -90), 0), RiskDecision::Reject(_)));
        assert_eq!(gate.check(Side::Bid, LOT_SIZE, &pos(0, -89), 0), RiskDecision::Allow);
    }

    #[test]
    fn outstanding_volume_counts_against_the_limit() {
        let gate = RiskGate::default();
        assert_eq!(gate.check(Side::Ask, LOT_SIZE, &pos(-80, 0), 0), RiskDecision::Allow);
        assert!(matches!(gate.check(Side::Ask, LOT_SIZE, &pos(-80, 0), 20), RiskDecision::Reject(_)));
        // opposite-side exposure never blocks
        assert_eq!(gate.check(Side::Bid, LOT_SIZE, &pos(-80, 80), 0), RiskDecision::Allow);
    }

    #[test]
    fn rejects_empty_orders() {
        let gate = RiskGate::default();
        assert!(matches!(
            gate.check(Side::Bid, 0, &pos(0, 0), 0),
            RiskDecision::Reject(_)
        ));
    }

    #[test]
    fn fills_and_hedges_move_independent_counters() {
        let mut p = PositionState::default();
        p.apply_primary_fill(Side::Ask, 10);
        assert_eq!(p, pos(-10, 0));
        p.apply_hedge(Side::Bid, 10);
        assert_eq!(p, pos(-10, 10));
        p.apply_primary_fill(Side::Bid, 4);
        p.apply_hedge(Side::Ask, 4);
        assert_eq!(p, pos(-6, 6));
    }
}
