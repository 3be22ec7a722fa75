//! Scenario files: a recorded sequence of driver operations.
//!
//! ```yaml
//! name: routing-table
//! config:
//!   delivery_delay_ticks: 5
//! steps:
//!   - load_topology: project1.topo
//!   - load_noise: no_noise.txt
//!   - boot_all
//!   - add_channel: command
//!   - run_time: 120
//!   - route_dump: 4
//!   - run_time: 10
//! ```
//!
//! Steps run in order and execution stops at the first failing step.

use crate::{DriverConfig, DriverError, Engine, NodeId, SimDriver};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// Built-in Scenarios
// ============================================================================

/// A scenario shipped with the binary.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinScenario {
    /// Name used to select it.
    pub name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    yaml: &'static str,
}

/// Scenarios shipped with the binary.
pub const BUILTIN_SCENARIOS: &[BuiltinScenario] = &[
    BuiltinScenario {
        name: "ping-demo",
        description: "Boot the example topology and ping nodes 2 and 3 from node 1",
        yaml: include_str!("../scenarios/ping_demo.yaml"),
    },
    BuiltinScenario {
        name: "routing",
        description: "Ping across project1, take node 3 down, and ping again",
        yaml: include_str!("../scenarios/routing.yaml"),
    },
    BuiltinScenario {
        name: "routing-table",
        description: "Let project1 settle, then dump node 4's routing table",
        yaml: include_str!("../scenarios/routing_table.yaml"),
    },
];

// ============================================================================
// Scenario Model
// ============================================================================

/// One driver operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Load a topology file.
    LoadTopology(String),
    /// Load a noise file.
    LoadNoise(String),
    /// Route a debug channel to the session's channel sink.
    AddChannel(String),
    /// Boot every known node.
    BootAll,
    /// Boot one node.
    Boot(NodeId),
    /// Power a node on.
    MoteOn(NodeId),
    /// Power a node off.
    MoteOff(NodeId),
    /// Execute a number of event steps.
    Run(u64),
    /// Execute the event steps corresponding to an amount of time.
    RunTime(f64),
    /// Ask `source` to ping `dest`.
    Ping {
        /// Node the command is delivered to.
        source: NodeId,
        /// Node being pinged.
        dest: NodeId,
        /// Ping message.
        message: String,
    },
    /// Ask a node to print its neighbor table.
    NeighborDump(NodeId),
    /// Ask a node to print its routing table.
    RouteDump(NodeId),
}

/// Driver settings a scenario may override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Replaces [`DriverConfig::boot_stagger_ticks`].
    pub boot_stagger_ticks: Option<u64>,
    /// Replaces [`DriverConfig::delivery_delay_ticks`].
    pub delivery_delay_ticks: Option<u64>,
}

impl ConfigOverrides {
    /// Write the set fields into `config`.
    pub fn apply(&self, config: &mut DriverConfig) {
        if let Some(stagger) = self.boot_stagger_ticks {
            config.boot_stagger_ticks = stagger;
        }
        if let Some(delay) = self.delivery_delay_ticks {
            config.delivery_delay_ticks = delay;
        }
    }
}

/// A named sequence of steps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scenario name.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Driver setting overrides.
    #[serde(default)]
    pub config: ConfigOverrides,
    /// Steps in execution order.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, DriverError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let yaml = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                DriverError::Scenario(format!("scenario file {} not found", path.display()))
            }
            _ => DriverError::Io(err),
        })?;
        let mut scenario = Self::from_yaml(&yaml)?;
        if scenario.name.is_none() {
            scenario.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }
        Ok(scenario)
    }

    /// Look up a built-in scenario by name.
    pub fn builtin(name: &str) -> Result<Self, DriverError> {
        let builtin = BUILTIN_SCENARIOS
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| DriverError::Scenario(format!("unknown built-in scenario '{}'", name)))?;
        Self::from_yaml(builtin.yaml)
    }

    /// Display name, falling back to "unnamed".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Apply config overrides and run every step against `driver`.
    pub fn execute<E: Engine>(
        &self,
        driver: &mut SimDriver<E>,
        sink: &ChannelSink,
    ) -> Result<(), DriverError> {
        self.config.apply(driver.config_mut());
        info!(scenario = self.display_name(), steps = self.steps.len(), "Running scenario");
        for (index, step) in self.steps.iter().enumerate() {
            debug!(step = index + 1, ?step, "Executing step");
            step.apply(driver, sink)?;
        }
        Ok(())
    }
}

impl Step {
    /// Perform this step on `driver`.
    pub fn apply<E: Engine>(
        &self,
        driver: &mut SimDriver<E>,
        sink: &ChannelSink,
    ) -> Result<(), DriverError> {
        match self {
            Step::LoadTopology(file) => driver.load_topology(file)?,
            Step::LoadNoise(file) => driver.load_noise(file)?,
            Step::AddChannel(name) => driver.add_channel(name, sink.open()?),
            Step::BootAll => driver.boot_all()?,
            Step::Boot(node) => driver.boot_node(*node)?,
            Step::MoteOn(node) => driver.mote_on(*node),
            Step::MoteOff(node) => driver.mote_off(*node),
            Step::Run(steps) => {
                driver.run(*steps);
            }
            Step::RunTime(amount) => {
                driver.run_time(*amount);
            }
            Step::Ping {
                source,
                dest,
                message,
            } => driver.ping(*source, *dest, message)?,
            Step::NeighborDump(node) => driver.neighbor_dump(*node)?,
            Step::RouteDump(node) => driver.route_dump(*node)?,
        }
        Ok(())
    }
}

// ============================================================================
// Channel Sink
// ============================================================================

/// Where channels added by a scenario write to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelSink {
    /// Standard output.
    #[default]
    Stdout,
    /// Append to a file. Every channel gets its own handle on the same file.
    File(PathBuf),
}

impl ChannelSink {
    /// Open a new output stream.
    pub fn open(&self) -> std::io::Result<Box<dyn Write>> {
        match self {
            ChannelSink::Stdout => Ok(Box::new(std::io::stdout())),
            ChannelSink::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Box::new(LineWriter::new(file)))
            }
        }
    }
}
