use std::io::Write;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::trade::execution::venue::{Venue, VenueError};
use crate::types::VenueCommand;

/// Writes every outbound command as one JSON line and flushes immediately.
pub struct JsonlCommandWriter<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonlCommandWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes queued commands until every sender is gone. Blocks the calling
    /// thread, so run it under `spawn_blocking`.
    pub fn drain(&mut self, mut commands: UnboundedReceiver<VenueCommand>) -> Result<u64, VenueError> {
        while let Some(command) = commands.blocking_recv() {
            self.send(command)?;
        }
        Ok(self.written)
    }
}

impl<W: Write> Venue for JsonlCommandWriter<W> {
    fn send(&mut self, command: VenueCommand) -> Result<(), VenueError> {
        serde_json::to_writer(&mut self.writer, &command)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::execution::venue::ChannelVenue;
    use crate::types::{Lifespan, Side};
    use tokio::sync::mpsc;

    #[test]
    fn commands_are_newline_delimited_json() {
        let mut writer = JsonlCommandWriter::new(Vec::new());
        writer
            .insert_order(1, Side::Ask, 20_000, 10, Lifespan::FillAndKill)
            .unwrap();
        writer.cancel_order(1).unwrap();
        assert_eq!(writer.written(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let parsed: Vec<VenueCommand> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], VenueCommand::CancelOrder { order_id: 1 });
    }

    #[test]
    fn drain_writes_channel_commands_until_senders_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut venue = ChannelVenue::new(tx);
        venue.hedge_order(2, Side::Bid, 100, 10).unwrap();
        venue.cancel_order(1).unwrap();
        drop(venue);

        let mut writer = JsonlCommandWriter::new(Vec::new());
        assert_eq!(writer.drain(rx).unwrap(), 2);
        let out = String::from_utf8(writer.into_inner()).unwrap();
        let last: VenueCommand = serde_json::from_str(out.lines().last().unwrap()).unwrap();
        assert_eq!(last, VenueCommand::CancelOrder { order_id: 1 });
    }
}
