//! # motesim-common
//!
//! Common types and traits shared by the motesim crates.
//!
//! This crate provides:
//! - Simulated time in engine ticks ([`Tick`])
//! - Mote identification ([`NodeId`])
//! - The generic packet handed to an engine for delivery ([`SimPacket`])
//! - The engine capability set the driver is written against ([`Engine`])
//! - Debug channel names shared by engines and drivers ([`channels`])

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

// ============================================================================
// Channels
// ============================================================================

/// Names of the debug channels motes log to.
pub mod channels {
    /// Command handler output.
    pub const COMMAND: &str = "command";
    /// General status output such as boot messages.
    pub const GENERAL: &str = "general";
    /// Neighbor discovery.
    pub const NEIGHBOR: &str = "neighbor";
    /// Flooding.
    pub const FLOODING: &str = "flooding";
    /// Routing table maintenance.
    pub const ROUTING: &str = "routing";
    /// Transport layer.
    pub const TRANSPORT: &str = "transport";
    /// Hashmap debugging.
    pub const HASHMAP: &str = "hashmap";
}

// ============================================================================
// Time Types
// ============================================================================

/// Simulated time, in engine ticks since simulation start.
///
/// The wall-clock length of a tick is engine specific; see
/// [`Engine::ticks_per_second`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// Simulation start.
    pub const ZERO: Tick = Tick(0);

    /// Create from a raw tick count.
    pub fn new(ticks: u64) -> Self {
        Tick(ticks)
    }

    /// Get the raw tick count.
    pub fn as_ticks(&self) -> u64 {
        self.0
    }

    /// Add a number of ticks, returning `None` on overflow.
    pub fn checked_add(&self, ticks: u64) -> Option<Tick> {
        self.0.checked_add(ticks).map(Tick)
    }

    /// Add a number of ticks, clamping at the end of representable time.
    pub fn saturating_add(&self, ticks: u64) -> Tick {
        Tick(self.0.saturating_add(ticks))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// Identifier of a simulated mote.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: u16) -> Self {
        NodeId(id)
    }

    /// Get the raw ID.
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Packet Types
// ============================================================================

/// A generic simulator packet carrying an encoded application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPacket {
    /// Active-message type of the carried message.
    pub am_type: u8,
    /// Node the packet is addressed to.
    pub destination: NodeId,
    /// Encoded message bytes.
    pub data: Vec<u8>,
}

impl SimPacket {
    /// Create a new packet.
    pub fn new(am_type: u8, destination: NodeId, data: Vec<u8>) -> Self {
        SimPacket {
            am_type,
            destination,
            data,
        }
    }
}

// ============================================================================
// Engine Trait
// ============================================================================

/// The capability set of a discrete-event mote simulator.
///
/// The driver issues one call at a time and assumes none of them fail. Node
/// handles are implicit: any [`NodeId`] may be addressed, and engines create
/// per-node state on first use.
pub trait Engine {
    // =========== Radio topology ===========

    /// Register a directed radio link from `src` to `dst` with the given gain in dB.
    fn add_link(&mut self, src: NodeId, dst: NodeId, gain_db: f64);

    // =========== Node control ===========

    /// Append one reading to a node's noise trace.
    fn add_noise_reading(&mut self, node: NodeId, reading: i32);

    /// Finalize the noise model of a node from its trace.
    fn create_noise_model(&mut self, node: NodeId);

    /// Schedule a node to boot at an absolute time.
    fn boot_at(&mut self, node: NodeId, at: Tick);

    /// Power a node on.
    fn turn_on(&mut self, node: NodeId);

    /// Power a node off.
    fn turn_off(&mut self, node: NodeId);

    // =========== Clock ===========

    /// Current simulated time.
    fn time(&self) -> Tick;

    /// Number of ticks in one simulated second.
    fn ticks_per_second(&self) -> u64;

    /// Execute the next pending event. Returns false if nothing was pending.
    fn run_next_event(&mut self) -> bool;

    // =========== Packet injection ===========

    /// Deliver a packet to `node` at an absolute time.
    fn deliver(&mut self, packet: SimPacket, node: NodeId, at: Tick);

    // =========== Logging ===========

    /// Route a named debug channel to an output stream.
    ///
    /// A channel may be added more than once; output then goes to every stream.
    fn add_channel(&mut self, name: &str, out: Box<dyn Write>);
}
