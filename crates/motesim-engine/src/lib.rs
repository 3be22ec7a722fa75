//! # motesim-engine
//!
//! An in-process reference implementation of the [`Engine`] capability set.
//!
//! The engine keeps a time-ordered queue of pending events and executes them
//! one at a time. It models the parts of a mote simulator that a driver can
//! observe from outside:
//! - Directed radio links with a gain per link
//! - Per-mote noise traces and a finalized noise model
//! - Scheduled boots and power state
//! - Delivery of injected packets, with the mote command handler's channel output
//!
//! It does not run firmware. Nothing is transmitted over the radio links and no
//! routing or neighbor discovery takes place.

pub mod channels;

pub use channels::ChannelRouter;

use motesim_common::channels::{COMMAND, GENERAL};
use motesim_common::{Engine, NodeId, SimPacket, Tick};
use motesim_packet::{CommandMsg, AM_COMMAND_MSG};
use serde::Serialize;
use std::collections::{BTreeMap, BinaryHeap};
use std::io::Write;
use tracing::{debug, trace, warn};

// ============================================================================
// Constants
// ============================================================================

/// Default clock resolution: one tick per microsecond.
pub const DEFAULT_TICKS_PER_SECOND: u64 = 1_000_000;

// ============================================================================
// Configuration
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Number of ticks in one simulated second.
    pub ticks_per_second: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone)]
enum EventKind {
    Boot,
    Deliver(SimPacket),
}

#[derive(Debug, Clone)]
struct ScheduledEvent {
    time: Tick,
    seq: u64,
    node: NodeId,
    kind: EventKind,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering for min-heap (earliest time first, then FIFO)
        other.time.cmp(&self.time).then_with(|| other.seq.cmp(&self.seq))
    }
}

// ============================================================================
// Mote State
// ============================================================================

/// Summary statistics of a mote's noise trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoiseModel {
    /// Number of readings the model was built from.
    pub samples: usize,
    /// Mean reading.
    pub mean: f64,
    /// Lowest reading.
    pub min: i32,
    /// Highest reading.
    pub max: i32,
}

impl NoiseModel {
    /// Build a model from a trace. Returns `None` for an empty trace.
    pub fn from_trace(trace: &[i32]) -> Option<Self> {
        let min = *trace.iter().min()?;
        let max = *trace.iter().max()?;
        let sum: i64 = trace.iter().map(|&r| i64::from(r)).sum();
        Some(NoiseModel {
            samples: trace.len(),
            mean: sum as f64 / trace.len() as f64,
            min,
            max,
        })
    }
}

#[derive(Debug, Default)]
struct Mote {
    noise_trace: Vec<i32>,
    noise_model: Option<NoiseModel>,
    booted: bool,
    powered: bool,
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters collected while executing events.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    /// Events executed.
    pub events_executed: u64,
    /// Boot events executed.
    pub boots: u64,
    /// Packets handed to a running mote.
    pub packets_delivered: u64,
    /// Packets addressed to a mote that was not running.
    pub packets_dropped: u64,
    /// Final simulated time in ticks.
    pub simulation_time_ticks: u64,
}

// ============================================================================
// Event Engine
// ============================================================================

/// Reference discrete-event engine.
#[derive(Debug)]
pub struct EventEngine {
    queue: BinaryHeap<ScheduledEvent>,
    clock: Tick,
    next_seq: u64,
    ticks_per_second: u64,
    links: BTreeMap<(NodeId, NodeId), f64>,
    motes: BTreeMap<NodeId, Mote>,
    channels: ChannelRouter,
    stats: EngineStats,
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EventEngine {
    /// Create an engine with an empty event queue at time zero.
    pub fn new(config: EngineConfig) -> Self {
        EventEngine {
            queue: BinaryHeap::new(),
            clock: Tick::ZERO,
            next_seq: 0,
            ticks_per_second: config.ticks_per_second.max(1),
            links: BTreeMap::new(),
            motes: BTreeMap::new(),
            channels: ChannelRouter::new(),
            stats: EngineStats::default(),
        }
    }

    /// Gain of the link from `src` to `dst`, if one was added.
    pub fn link_gain(&self, src: NodeId, dst: NodeId) -> Option<f64> {
        self.links.get(&(src, dst)).copied()
    }

    /// Number of registered links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Length of a mote's noise trace.
    pub fn noise_trace_len(&self, node: NodeId) -> usize {
        self.motes.get(&node).map_or(0, |m| m.noise_trace.len())
    }

    /// A mote's finalized noise model.
    pub fn noise_model(&self, node: NodeId) -> Option<NoiseModel> {
        self.motes.get(&node).and_then(|m| m.noise_model)
    }

    /// Whether a mote has booted.
    pub fn is_booted(&self, node: NodeId) -> bool {
        self.motes.get(&node).is_some_and(|m| m.booted)
    }

    /// Whether a mote is powered.
    pub fn is_powered(&self, node: NodeId) -> bool {
        self.motes.get(&node).is_some_and(|m| m.powered)
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Execution counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            simulation_time_ticks: self.clock.as_ticks(),
            ..self.stats.clone()
        }
    }

    /// Flush all channel output streams.
    pub fn flush_channels(&mut self) {
        self.channels.flush();
    }

    fn mote_mut(&mut self, node: NodeId) -> &mut Mote {
        self.motes.entry(node).or_default()
    }

    fn schedule(&mut self, time: Tick, node: NodeId, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent {
            time,
            seq,
            node,
            kind,
        });
    }

    fn execute(&mut self, event: ScheduledEvent) {
        match event.kind {
            EventKind::Boot => self.handle_boot(event.node),
            EventKind::Deliver(packet) => self.handle_delivery(event.node, packet),
        }
    }

    fn handle_boot(&mut self, node: NodeId) {
        let mote = self.mote_mut(node);
        if mote.booted && mote.powered {
            debug!(%node, "Boot requested for a running mote");
            return;
        }
        mote.booted = true;
        mote.powered = true;
        self.stats.boots += 1;
        self.channels.log(GENERAL, node, "Booted");
    }

    fn handle_delivery(&mut self, node: NodeId, packet: SimPacket) {
        let running = self.is_booted(node) && self.is_powered(node);
        if !running {
            debug!(%node, am_type = packet.am_type, "Dropping packet for a mote that is not running");
            self.stats.packets_dropped += 1;
            return;
        }
        self.stats.packets_delivered += 1;

        if packet.am_type != AM_COMMAND_MSG {
            trace!(%node, am_type = packet.am_type, "Delivered non-command packet");
            return;
        }

        let msg = match CommandMsg::decode(&packet.data) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(%node, error = %err, "Malformed command message");
                return;
            }
        };

        self.channels.log(COMMAND, node, "A Command has been Issued.");
        match msg.command() {
            Some(command) => {
                self.channels
                    .log(COMMAND, node, &format!("Command Type: {}", command));
            }
            None => {
                self.channels.log(
                    COMMAND,
                    node,
                    &format!("CMD_ERROR: \"{}\" does not match any known commands.", msg.id()),
                );
            }
        }
    }
}

impl Engine for EventEngine {
    fn add_link(&mut self, src: NodeId, dst: NodeId, gain_db: f64) {
        self.links.insert((src, dst), gain_db);
    }

    fn add_noise_reading(&mut self, node: NodeId, reading: i32) {
        self.mote_mut(node).noise_trace.push(reading);
    }

    fn create_noise_model(&mut self, node: NodeId) {
        let mote = self.mote_mut(node);
        mote.noise_model = NoiseModel::from_trace(&mote.noise_trace);
        if mote.noise_model.is_none() {
            warn!(%node, "Noise model requested with an empty noise trace");
        }
    }

    fn boot_at(&mut self, node: NodeId, at: Tick) {
        // Events cannot fire in the past.
        let time = at.max(self.clock);
        self.schedule(time, node, EventKind::Boot);
    }

    fn turn_on(&mut self, node: NodeId) {
        self.mote_mut(node).powered = true;
    }

    fn turn_off(&mut self, node: NodeId) {
        self.mote_mut(node).powered = false;
    }

    fn time(&self) -> Tick {
        self.clock
    }

    fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    fn run_next_event(&mut self) -> bool {
        let Some(event) = self.queue.pop() else {
            return false;
        };
        self.clock = event.time;
        self.stats.events_executed += 1;
        self.execute(event);
        true
    }

    fn deliver(&mut self, packet: SimPacket, node: NodeId, at: Tick) {
        let time = at.max(self.clock);
        self.schedule(time, node, EventKind::Deliver(packet));
    }

    fn add_channel(&mut self, name: &str, out: Box<dyn Write>) {
        self.channels.add(name, out);
    }
}
