//! Named debug channel routing.

use motesim_common::NodeId;
use std::collections::HashMap;
use std::io::Write;

/// Routes per-mote debug lines to the streams registered for each channel.
#[derive(Default)]
pub struct ChannelRouter {
    outputs: HashMap<String, Vec<Box<dyn Write>>>,
}

impl ChannelRouter {
    /// Create a router with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output stream for a channel.
    pub fn add(&mut self, name: &str, out: Box<dyn Write>) {
        self.outputs.entry(name.to_string()).or_default().push(out);
    }

    /// Whether any stream is registered for `name`.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    /// Names of all registered channels.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Write one line from `node` to every stream of `channel`.
    ///
    /// Lines for channels nobody registered are discarded.
    pub fn log(&mut self, channel: &str, node: NodeId, message: &str) {
        let Some(outputs) = self.outputs.get_mut(channel) else {
            return;
        };
        for out in outputs.iter_mut() {
            if let Err(err) = writeln!(out, "DEBUG ({}): {}", node, message) {
                tracing::warn!(channel, error = %err, "Failed to write channel output");
            }
        }
    }

    /// Flush every registered stream.
    pub fn flush(&mut self) {
        for (name, outputs) in self.outputs.iter_mut() {
            for out in outputs.iter_mut() {
                if let Err(err) = out.flush() {
                    tracing::warn!(channel = %name, error = %err, "Failed to flush channel output");
                }
            }
        }
    }
}

impl std::fmt::Debug for ChannelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRouter")
            .field("channels", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}
