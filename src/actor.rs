//! Message plumbing shared by the launcher and its helper threads. Every
//! message travels with the span it was sent from, so whatever the receiver
//! logs is nested under the originating toggle, keypress or launch.

use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::Span;

pub mod drag_drop;
pub mod launcher;

pub struct Sender<Event>(UnboundedSender<(Span, Event)>);
pub type Receiver<Event> = UnboundedReceiver<(Span, Event)>;

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = unbounded_channel();
    (Sender(tx), rx)
}

impl<Event> Sender<Event> {
    /// Send errors only mean the receiving side has shut down.
    pub fn send(&self, event: Event) { _ = self.try_send(event) }

    pub fn try_send(&self, event: Event) -> Result<(), SendError<(Span, Event)>> {
        self.0.send((Span::current(), event))
    }

    pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Event> std::fmt::Debug for Sender<Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("actor::Sender(...)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_sending_span() {
        let (tx, mut rx) = channel::<u32>();
        let span = tracing::info_span!("toggle");
        span.in_scope(|| tx.send(7));
        let (received_span, value) = rx.try_recv().unwrap();
        assert_eq!(value, 7);
        assert_eq!(received_span.id(), span.id());
    }

    #[test]
    fn send_after_receiver_dropped_is_ignored() {
        let (tx, rx) = channel::<u32>();
        drop(rx);
        tx.send(1);
        assert!(tx.is_closed());
        assert!(tx.try_send(2).is_err());
    }
}
