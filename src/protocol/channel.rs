use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::envelope::Envelope;

/// One side of the frame/host boundary.
///
/// Delivery is fire-and-forget: nothing is acknowledged and `send` never
/// reports failure. Envelopes are FIFO per sender only.
pub struct ChannelEnd {
    label: &'static str,
    outbound: UnboundedSender<String>,
    inbound: UnboundedReceiver<String>,
}

/// Create the two connected ends of a channel: `(frame, host)`.
pub fn channel_pair() -> (ChannelEnd, ChannelEnd) {
    let (to_host, from_frame) = unbounded_channel();
    let (to_frame, from_host) = unbounded_channel();
    (
        ChannelEnd {
            label: "frame",
            outbound: to_host,
            inbound: from_host,
        },
        ChannelEnd {
            label: "host",
            outbound: to_frame,
            inbound: from_frame,
        },
    )
}

impl ChannelEnd {
    pub fn send(&self, envelope: &Envelope) {
        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target = "channel", side = self.label, kind = envelope.kind(), error = %err, "failed to encode envelope; dropped");
                return;
            }
        };
        if self.outbound.send(frame).is_err() {
            debug!(target = "channel", side = self.label, kind = envelope.kind(), "peer is gone; envelope dropped");
        }
    }

    /// Push a raw text frame, bypassing the encoder.
    pub fn send_raw(&self, frame: impl Into<String>) {
        if self.outbound.send(frame.into()).is_err() {
            debug!(target = "channel", side = self.label, "peer is gone; raw frame dropped");
        }
    }

    /// Take every envelope currently queued for this side. Frames that fail
    /// to decode are logged and skipped.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut received = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(frame) => match Envelope::decode(&frame) {
                    Ok(envelope) => received.push(envelope),
                    Err(err) => {
                        warn!(target = "channel", side = self.label, error = %err, "malformed envelope dropped");
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        received
    }

    /// Deliver every queued envelope to `dispatch`; returns how many were
    /// delivered.
    pub fn pump(&mut self, mut dispatch: impl FnMut(Envelope)) -> usize {
        let received = self.drain();
        let count = received.len();
        for envelope in received {
            dispatch(envelope);
        }
        count
    }

    pub fn peer_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
