//! Wireless control link over standard input and output.
//!
//! Each input line is one JSON control message; each handled message is
//! answered with a `{"ack":<id>}` line on standard output.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use lampstate::{AckSink, Acknowledgement, StatePublisher, WirelessAdapter};

pub const CONTROL_THREAD_NAME: &str = "trafficlight-control";
pub const ACK_THREAD_NAME: &str = "trafficlight-ack";

/// Reader and writer threads for the stdin/stdout link.
pub struct ControlLink {
    reader: JoinHandle<Result<u64>>,
    writer: JoinHandle<Result<()>>,
}

impl ControlLink {
    pub fn spawn(publisher: StatePublisher) -> Result<Self> {
        let (ack_tx, ack_rx) = unbounded::<Acknowledgement>();

        let writer = thread::Builder::new()
            .name(ACK_THREAD_NAME.into())
            .spawn(move || write_acks(ack_rx, io::stdout().lock()))
            .map_err(|err| anyhow!("failed to spawn ack writer: {err}"))?;

        let reader = thread::Builder::new()
            .name(CONTROL_THREAD_NAME.into())
            .spawn(move || {
                let mut adapter = WirelessAdapter::new(publisher, ack_tx);
                pump_lines(io::stdin().lock(), &mut adapter)
            })
            .map_err(|err| anyhow!("failed to spawn control reader: {err}"))?;

        Ok(Self { reader, writer })
    }

    /// Joins the writer after the reader has seen end of input.
    ///
    /// The reader is left running if stdin is still open; the process exit
    /// takes care of it.
    pub fn finish(self) -> Result<()> {
        if !self.reader.is_finished() {
            tracing::debug!("control input still open at shutdown");
            return Ok(());
        }
        let handled = self
            .reader
            .join()
            .map_err(|err| anyhow!("control reader panicked: {err:?}"))??;
        self.writer
            .join()
            .map_err(|err| anyhow!("ack writer panicked: {err:?}"))??;
        tracing::debug!(handled, "control link closed");
        Ok(())
    }
}

/// Feeds every non-blank line to the adapter until end of input.
///
/// Returns the number of messages the adapter handled.
pub fn pump_lines<R, S>(reader: R, adapter: &mut WirelessAdapter<S>) -> Result<u64>
where
    R: BufRead,
    S: AckSink,
{
    for line in reader.lines() {
        let line = line.context("failed to read control input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Failures are logged by the adapter; the link keeps going.
        let _ = adapter.handle_line(line);
    }
    Ok(adapter.received())
}

/// Writes one JSON ack per line until every sender is gone.
pub fn write_acks<W: Write>(acks: Receiver<Acknowledgement>, mut out: W) -> Result<()> {
    for ack in acks {
        serde_json::to_writer(&mut out, &ack).context("failed to encode acknowledgment")?;
        out.write_all(b"\n")
            .and_then(|()| out.flush())
            .context("failed to write acknowledgment")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampstate::{LampState, SignalController, StateChannel, TrafficLight};
    use std::io::Cursor;

    #[test]
    fn pumps_lines_into_channel_and_acks() {
        let (publisher, consumer) = StateChannel::new();
        let mut controller = SignalController::new(TrafficLight::new(), consumer);
        let (ack_tx, ack_rx) = unbounded();
        let mut adapter = WirelessAdapter::new(publisher, ack_tx);

        let input = "{\"transaction_id\":4,\"data\":{\"0\":3}}\n\n garbage \n{\"transaction_id\":5,\"data\":{\"0\":9}}\n";
        let handled = pump_lines(Cursor::new(input), &mut adapter).expect("pump");
        assert_eq!(handled, 2);

        let acks: Vec<_> = ack_rx.try_iter().map(|ack| ack.transaction_id).collect();
        assert_eq!(acks, vec![4, 5]);

        let tick = controller.tick(0);
        assert_eq!(tick.state, LampState::Green);
    }

    #[test]
    fn writes_acks_as_json_lines() {
        let (tx, rx) = unbounded();
        tx.send(Acknowledgement { transaction_id: 7 }).expect("send");
        tx.send(Acknowledgement { transaction_id: 8 }).expect("send");
        drop(tx);

        let mut out = Vec::new();
        write_acks(rx, &mut out).expect("write");
        assert_eq!(String::from_utf8(out).expect("utf8"), "{\"ack\":7}\n{\"ack\":8}\n");
    }
}
