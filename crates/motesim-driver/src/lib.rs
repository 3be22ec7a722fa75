//! # motesim-driver
//!
//! Drives a mote simulator through a test session.
//!
//! A [`SimDriver`] owns an [`Engine`] and the topology loaded into it. It
//! loads topology and noise files, boots motes in a staggered order, advances
//! simulated time and injects command packets. Scenario files replay a fixed
//! sequence of those operations; see [`scenario`].
//!
//! ## Example
//!
//! ```no_run
//! use motesim_driver::{DriverConfig, SimDriver};
//! use motesim_engine::EventEngine;
//! use motesim_common::{channels, NodeId};
//!
//! let mut driver = SimDriver::new(EventEngine::default(), DriverConfig::default());
//! driver.load_topology("example.topo")?;
//! driver.load_noise("no_noise.txt")?;
//! driver.boot_all()?;
//! driver.add_channel_stdout(channels::COMMAND);
//! driver.run_time(1.0);
//! driver.ping(NodeId(1), NodeId(2), "Hello, World")?;
//! driver.run_time(1.0);
//! # Ok::<(), motesim_driver::DriverError>(())
//! ```

pub mod scenario;

pub use motesim_common::channels;
pub use motesim_common::{Engine, NodeId, Tick};
pub use motesim_packet::CommandId;
pub use scenario::{ChannelSink, Scenario, Step};

use motesim_common::SimPacket;
use motesim_model::{load_noise_trace, load_topology, ModelError, Topology};
use motesim_packet::{CommandMsg, PacketError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Ticks between consecutive node IDs at boot.
pub const DEFAULT_BOOT_STAGGER_TICKS: u64 = 1333;

/// Ticks between injecting a command and its delivery.
pub const DEFAULT_DELIVERY_DELAY_TICKS: u64 = 5;

/// Payload of a neighbor dump command.
pub const NEIGHBOR_DUMP_PAYLOAD: &str = "neighbor command";

/// Payload of a route dump command.
pub const ROUTE_DUMP_PAYLOAD: &str = "routing command";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while driving a simulation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Topology file does not exist.
    #[error("Topology file {} not found.", .0.display())]
    TopologyNotFound(PathBuf),

    /// Noise file does not exist.
    #[error("Noise file {} not found.", .0.display())]
    NoiseNotFound(PathBuf),

    /// An input file could not be parsed.
    #[error("{}: {source}", .path.display())]
    Model {
        /// File being loaded.
        path: PathBuf,
        /// Underlying error.
        source: ModelError,
    },

    /// A command message could not be built.
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// A node's boot time does not fit in a tick count.
    #[error("Boot offset of node {node} overflows with a stagger of {stagger} ticks")]
    BootOffsetOverflow {
        /// Node being booted.
        node: NodeId,
        /// Configured stagger.
        stagger: u64,
    },

    /// A ping target does not fit in the one-byte payload prefix.
    #[error("Ping destination {0} does not fit in one byte")]
    DestinationOutOfRange(NodeId),

    /// Scenario file error.
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// YAML parse error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Configuration
// ============================================================================

/// Driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Directory topology file names are resolved against.
    pub topo_dir: PathBuf,
    /// Directory noise file names are resolved against.
    pub noise_dir: PathBuf,
    /// Boot time of node `n` is `n * boot_stagger_ticks`.
    pub boot_stagger_ticks: u64,
    /// Delay between injecting a command and its delivery.
    pub delivery_delay_ticks: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            topo_dir: PathBuf::from("topo"),
            noise_dir: PathBuf::from("noise"),
            boot_stagger_ticks: DEFAULT_BOOT_STAGGER_TICKS,
            delivery_delay_ticks: DEFAULT_DELIVERY_DELAY_TICKS,
        }
    }
}

// ============================================================================
// Session Statistics
// ============================================================================

/// Counters for one driver session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Links registered with the engine.
    pub links_loaded: u64,
    /// Noise readings replayed, summed over nodes.
    pub noise_readings: u64,
    /// Boot requests issued.
    pub boots_scheduled: u64,
    /// Commands injected.
    pub commands_sent: u64,
    /// Event steps requested from the engine.
    pub steps_requested: u64,
    /// Steps that executed an event.
    pub events_executed: u64,
    /// Simulated time at the end of the session, in ticks.
    pub final_time_ticks: u64,
}

// ============================================================================
// Simulation Driver
// ============================================================================

/// A test session against one engine.
pub struct SimDriver<E: Engine> {
    engine: E,
    config: DriverConfig,
    topology: Topology,
    stats: SessionStats,
}

impl<E: Engine> SimDriver<E> {
    /// Create a driver with no topology loaded.
    pub fn new(engine: E, config: DriverConfig) -> Self {
        SimDriver {
            engine,
            config,
            topology: Topology::new(),
            stats: SessionStats::default(),
        }
    }

    /// The driven engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the driven engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Current configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut DriverConfig {
        &mut self.config
    }

    /// Topology loaded so far.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Known node IDs in order of first appearance.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.topology.node_ids().collect()
    }

    /// Session counters, with the engine's current time filled in.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            final_time_ticks: self.engine.time().as_ticks(),
            ..self.stats.clone()
        }
    }

    // =========== Loading ===========

    /// Load a topology file from the topology directory and register its links.
    ///
    /// Node IDs accumulate across calls.
    pub fn load_topology(&mut self, file: impl AsRef<Path>) -> Result<(), DriverError> {
        info!("Creating Topology!");
        let path = self.config.topo_dir.join(file);
        let topology = load_topology(&path).map_err(|err| match err {
            ModelError::FileNotFound(path) => DriverError::TopologyNotFound(path),
            source => DriverError::Model {
                path: path.clone(),
                source,
            },
        })?;

        info!("Number of Motes: {}", topology.declared_nodes());
        for link in topology.links() {
            debug!(src = %link.src, dst = %link.dst, gain_db = link.gain_db, "Adding link");
            self.engine.add_link(link.src, link.dst, link.gain_db);
            self.stats.links_loaded += 1;
        }
        self.topology.merge(topology);
        Ok(())
    }

    /// Load a noise file from the noise directory and build every node's noise model.
    ///
    /// Does nothing if no topology has been loaded.
    pub fn load_noise(&mut self, file: impl AsRef<Path>) -> Result<(), DriverError> {
        if self.topology.is_empty() {
            warn!("Create a topology first.");
            return Ok(());
        }

        let path = self.config.noise_dir.join(file);
        let trace = load_noise_trace(&path).map_err(|err| match err {
            ModelError::FileNotFound(path) => DriverError::NoiseNotFound(path),
            source => DriverError::Model {
                path: path.clone(),
                source,
            },
        })?;

        let node_ids = self.node_ids();
        for &reading in trace.readings() {
            for &node in &node_ids {
                self.engine.add_noise_reading(node, reading);
                self.stats.noise_readings += 1;
            }
        }
        for &node in &node_ids {
            info!("Creating noise model for {}", node);
            self.engine.create_noise_model(node);
        }
        Ok(())
    }

    // =========== Node control ===========

    /// Boot time of a node, or `None` if it overflows a [`Tick`].
    pub fn boot_offset(&self, node: NodeId) -> Option<Tick> {
        self.config
            .boot_stagger_ticks
            .checked_mul(u64::from(node.get()))
            .map(Tick::new)
    }

    /// Schedule one node to boot at its staggered offset.
    ///
    /// Does nothing if no topology has been loaded.
    pub fn boot_node(&mut self, node: NodeId) -> Result<(), DriverError> {
        if self.topology.is_empty() {
            warn!("Create a topology first.");
            return Ok(());
        }
        let at = self
            .boot_offset(node)
            .ok_or(DriverError::BootOffsetOverflow {
                node,
                stagger: self.config.boot_stagger_ticks,
            })?;
        debug!(%node, at = %at, "Scheduling boot");
        self.engine.boot_at(node, at);
        self.stats.boots_scheduled += 1;
        Ok(())
    }

    /// Boot every known node, stopping at the first offset that overflows.
    pub fn boot_all(&mut self) -> Result<(), DriverError> {
        for node in self.node_ids() {
            self.boot_node(node)?;
        }
        Ok(())
    }

    /// Power a node off.
    pub fn mote_off(&mut self, node: NodeId) {
        debug!(%node, "Turning mote off");
        self.engine.turn_off(node);
    }

    /// Power a node on.
    pub fn mote_on(&mut self, node: NodeId) {
        debug!(%node, "Turning mote on");
        self.engine.turn_on(node);
    }

    // =========== Time ===========

    /// Ask the engine to execute `steps` pending events.
    ///
    /// Returns how many steps actually executed an event.
    pub fn run(&mut self, steps: u64) -> u64 {
        let mut executed = 0;
        for _ in 0..steps {
            if self.engine.run_next_event() {
                executed += 1;
            }
        }
        self.stats.steps_requested += steps;
        self.stats.events_executed += executed;
        executed
    }

    /// Number of event steps [`run_time`](Self::run_time) issues for `amount`.
    pub fn steps_for(&self, amount: f64) -> u64 {
        // Float-to-int `as` saturates: negative and NaN amounts run nothing.
        (amount * self.engine.ticks_per_second() as f64 / 1000.0).floor() as u64
    }

    /// Run `floor(amount * ticks_per_second / 1000)` event steps.
    pub fn run_time(&mut self, amount: f64) -> u64 {
        let steps = self.steps_for(amount);
        self.run(steps)
    }

    // =========== Commands ===========

    /// Inject a command message for delivery to `dest` after the delivery delay.
    pub fn send_command(&mut self, id: u8, dest: NodeId, payload: &[u8]) -> Result<(), DriverError> {
        let mut msg = CommandMsg::new();
        msg.set_dest(dest.get());
        msg.set_id(id);
        msg.set_payload(payload)?;

        let packet = SimPacket::new(msg.am_type(), dest, msg.encode());
        let at = self
            .engine
            .time()
            .saturating_add(self.config.delivery_delay_ticks);
        debug!(id, %dest, at = %at, "Injecting command");
        self.engine.deliver(packet, dest, at);
        self.stats.commands_sent += 1;
        Ok(())
    }

    /// Tell `source` to ping `dest` with `msg`.
    ///
    /// The command goes to `source`; its payload is the destination byte followed by `msg`.
    pub fn ping(&mut self, source: NodeId, dest: NodeId, msg: &str) -> Result<(), DriverError> {
        let target = u8::try_from(dest.get()).map_err(|_| DriverError::DestinationOutOfRange(dest))?;
        let mut payload = Vec::with_capacity(1 + msg.len());
        payload.push(target);
        payload.extend_from_slice(msg.as_bytes());
        self.send_command(CommandId::Ping.as_u8(), source, &payload)
    }

    /// Ask a node to print its neighbor table.
    pub fn neighbor_dump(&mut self, dest: NodeId) -> Result<(), DriverError> {
        self.send_command(
            CommandId::NeighborDump.as_u8(),
            dest,
            NEIGHBOR_DUMP_PAYLOAD.as_bytes(),
        )
    }

    /// Ask a node to print its routing table.
    pub fn route_dump(&mut self, dest: NodeId) -> Result<(), DriverError> {
        self.send_command(CommandId::RouteDump.as_u8(), dest, ROUTE_DUMP_PAYLOAD.as_bytes())
    }

    // =========== Output ===========

    /// Route a debug channel to `out`.
    pub fn add_channel(&mut self, name: &str, out: Box<dyn Write>) {
        info!("Adding Channel {}", name);
        self.engine.add_channel(name, out);
    }

    /// Route a debug channel to standard output.
    pub fn add_channel_stdout(&mut self, name: &str) {
        self.add_channel(name, Box::new(std::io::stdout()));
    }
}
