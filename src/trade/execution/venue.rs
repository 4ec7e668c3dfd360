use std::error::Error;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

use crate::types::{Lifespan, Side, VenueCommand};

#[derive(Debug)]
pub enum VenueError {
    Disconnected,
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for VenueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VenueError::Disconnected => write!(f, "venue connection closed"),
            VenueError::Io(e) => write!(f, "venue io error: {}", e),
            VenueError::Encode(e) => write!(f, "venue encode error: {}", e),
        }
    }
}

impl Error for VenueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            VenueError::Disconnected => None,
            VenueError::Io(e) => Some(e),
            VenueError::Encode(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for VenueError {
    fn from(err: std::io::Error) -> VenueError {
        VenueError::Io(err)
    }
}

impl From<serde_json::Error> for VenueError {
    fn from(err: serde_json::Error) -> VenueError {
        VenueError::Encode(err)
    }
}

/// Outbound side of the venue. Every call is fire-and-forget: `Ok` means the
/// request left the strategy, not that the venue accepted it.
pub trait Venue {
    fn send(&mut self, command: VenueCommand) -> Result<(), VenueError>;

    fn insert_order(
        &mut self,
        order_id: u64,
        side: Side,
        price: i64,
        volume: u32,
        lifespan: Lifespan,
    ) -> Result<(), VenueError> {
        self.send(VenueCommand::InsertOrder {
            order_id,
            side,
            price,
            volume,
            lifespan,
        })
    }

    fn hedge_order(
        &mut self,
        order_id: u64,
        side: Side,
        price: i64,
        volume: u32,
    ) -> Result<(), VenueError> {
        self.send(VenueCommand::HedgeOrder {
            order_id,
            side,
            price,
            volume,
        })
    }

    fn cancel_order(&mut self, order_id: u64) -> Result<(), VenueError> {
        self.send(VenueCommand::CancelOrder { order_id })
    }
}

/// Hands commands to an in-process transport task.
#[derive(Debug, Clone)]
pub struct ChannelVenue {
    tx: UnboundedSender<VenueCommand>,
}

impl ChannelVenue {
    pub fn new(tx: UnboundedSender<VenueCommand>) -> Self {
        Self { tx }
    }
}

impl Venue for ChannelVenue {
    fn send(&mut self, command: VenueCommand) -> Result<(), VenueError> {
        self.tx.send(command).map_err(|_| VenueError::Disconnected)
    }
}

/// Keeps every command in memory, oldest first.
impl Venue for Vec<VenueCommand> {
    fn send(&mut self, command: VenueCommand) -> Result<(), VenueError> {
        self.push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn channel_venue_forwards_commands_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut venue = ChannelVenue::new(tx);
        venue
            .insert_order(1, Side::Bid, 20_000, 10, Lifespan::FillAndKill)
            .unwrap();
        venue.cancel_order(1).unwrap();
        assert_eq!(rx.try_recv().unwrap().order_id(), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            VenueCommand::CancelOrder { order_id: 1 }
        );
    }

    #[test]
    fn channel_venue_reports_closed_transport() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut venue = ChannelVenue::new(tx);
        let err = venue.hedge_order(2, Side::Ask, 100, 10).unwrap_err();
        assert!(matches!(err, VenueError::Disconnected));
    }
}
