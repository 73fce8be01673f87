//! Per-transport heartbeat: periodic probe and round-trip sampler.
//!
//! The ticker only posts `HeartbeatDue` into the session loop. The loop encodes
//! the heartbeat envelope and reports the id back through [`HeartbeatMonitor::record_sent`],
//! so sequence ids stay owned by the transport codec.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::event::{Channel, Event};

#[derive(Debug)]
pub struct HeartbeatMonitor {
    channel: Channel,
    interval: Duration,
    pending: Option<(u64, Instant)>,
    ping: Option<Duration>,
    ticker: Option<JoinHandle<()>>,
}

impl HeartbeatMonitor {
    pub fn new(channel: Channel, interval: Duration) -> Self {
        Self {
            channel,
            interval,
            pending: None,
            ping: None,
            ticker: None,
        }
    }

    /// (Re)start ticking. Any previous ticker is stopped first.
    pub fn start(&mut self, events: UnboundedSender<Event>, generation: u64) {
        self.stop();

        let channel = self.channel;
        let period = self.interval;
        self.ticker = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if events.send(Event::HeartbeatDue { channel, generation }).is_err() {
                    break;
                }
            }
        }));

        tracing::debug!(channel = channel.as_str(), generation, ?period, "heartbeat started");
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            tracing::debug!(channel = self.channel.as_str(), "heartbeat stopped");
        }
        self.pending = None;
        self.ping = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn record_sent(&mut self, id: u64) {
        self.pending = Some((id, Instant::now()));
    }

    /// Match an inbound envelope id against the outstanding probe.
    ///
    /// Returns the new round-trip sample on a match. Each sample replaces the
    /// previous one.
    pub fn observe(&mut self, id: u64) -> Option<Duration> {
        match self.pending {
            Some((sent_id, sent_at)) if sent_id == id => {
                self.pending = None;
                let rtt = sent_at.elapsed();
                self.ping = Some(rtt);
                Some(rtt)
            }
            _ => None,
        }
    }

    pub fn ping(&self) -> Option<Duration> {
        self.ping
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
