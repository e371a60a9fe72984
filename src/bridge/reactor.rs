//! Single-dispatcher event loop.
//!
//! All connection tasks feed one channel; the reactor takes one event at a
//! time and awaits its handler before taking the next, so handlers never run
//! concurrently with each other.

use super::events::{BridgeEvent, ClientHandle, DisconnectReason};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

/// Capacity of the event channel between connections and the reactor.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Receiver of bridge events.
#[async_trait]
pub trait EventHandler: Send {
    /// A client connected.
    async fn on_connect(&mut self, client: &ClientHandle);

    /// A client disconnected.
    async fn on_disconnect(&mut self, client: &ClientHandle, reason: &DisconnectReason);

    /// A chunk of bytes arrived from a client.
    async fn on_data(&mut self, client: &ClientHandle, payload: &[u8]);

    /// Periodic tick.
    async fn on_tick(&mut self) {}
}

/// Dispatches events to an `EventHandler`, one at a time.
pub struct Reactor<H> {
    handler: H,
    events: mpsc::Receiver<BridgeEvent>,
    tick: Option<Interval>,
}

impl<H: EventHandler> Reactor<H> {
    /// Create a reactor and the sender side connections publish to.
    pub fn new(handler: H, tick_every: Option<Duration>) -> (Self, mpsc::Sender<BridgeEvent>) {
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let tick = tick_every.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        (
            Self {
                handler,
                events,
                tick,
            },
            tx,
        )
    }

    /// Run until shutdown is signalled or every sender is dropped.
    ///
    /// Returns the handler so callers can inspect or drop it explicitly.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> H {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("reactor stopping on shutdown signal");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        debug!("reactor stopping: no more event sources");
                        break;
                    }
                },
                _ = next_tick(&mut self.tick) => self.handler.on_tick().await,
            }
        }
        self.handler
    }

    async fn dispatch(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Connected(client) => self.handler.on_connect(&client).await,
            BridgeEvent::Disconnected(client, reason) => {
                self.handler.on_disconnect(&client, &reason).await
            }
            BridgeEvent::Data(client, payload) => self.handler.on_data(&client, &payload).await,
        }
    }
}

async fn next_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
