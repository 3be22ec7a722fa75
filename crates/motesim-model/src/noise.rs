//! Noise trace files: one integer signal reading per non-blank line.

use crate::{read_input, ModelError};
use std::path::Path;

/// An ordered sequence of ambient signal readings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoiseTrace {
    readings: Vec<i32>,
}

impl NoiseTrace {
    /// Parse noise trace text.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let mut readings = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            let reading = value.parse::<i32>().map_err(|_| ModelError::Parse {
                line: index + 1,
                message: format!("invalid noise reading '{}'", value),
            })?;
            readings.push(reading);
        }
        Ok(NoiseTrace { readings })
    }

    /// Readings in file order.
    pub fn readings(&self) -> &[i32] {
        &self.readings
    }

    /// Number of readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True if the trace has no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Load a noise trace file.
pub fn load_noise_trace(path: &Path) -> Result<NoiseTrace, ModelError> {
    let text = read_input(path)?;
    let trace = NoiseTrace::parse(&text)?;
    tracing::debug!(path = %path.display(), readings = trace.len(), "Loaded noise trace");
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let trace = NoiseTrace::parse("-98\n\n  -97 \n-105\n").unwrap();
        assert_eq!(trace.readings(), &[-98, -97, -105]);
    }

    #[test]
    fn test_parse_rejects_non_integer() {
        let err = NoiseTrace::parse("-98\n-97.5\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_file_is_empty_trace() {
        assert!(NoiseTrace::parse("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_noise_trace(Path::new("no/such/noise.txt")).unwrap_err();
        assert!(matches!(err, ModelError::FileNotFound(_)));
    }
}
