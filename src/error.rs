//! Error type for rescaler construction and frame driving.

/// Which axis a geometry error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RescaleError {
    #[error("invalid {axis} geometry: {reason}")]
    InvalidGeometry { axis: Axis, reason: String },

    #[error("failed to allocate {bytes} bytes for {what}")]
    AllocationFailure { what: &'static str, bytes: usize },

    #[error("unsupported sample width of {width} bytes (expected 1 or 2)")]
    UnsupportedSampleWidth { width: u32 },

    #[error("channel count must be at least 1")]
    ZeroChannels,

    #[error("{which} max value {value} must be in 1..={limit}")]
    InvalidMaxValue {
        which: &'static str,
        value: u32,
        limit: u32,
    },

    #[error("{what} buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("rescaler still needs input after all {fed} source rows were fed ({wanted} required)")]
    StreamStalled { fed: u32, wanted: u32 },
}

pub type RescaleResult<T> = Result<T, RescaleError>;

impl RescaleError {
    pub(crate) fn geometry(axis: Axis, reason: impl Into<String>) -> Self {
        RescaleError::InvalidGeometry {
            axis,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = RescaleError::geometry(Axis::Y, "patch 0+9 exceeds destination length 8");
        assert_eq!(
            e.to_string(),
            "invalid y geometry: patch 0+9 exceeds destination length 8"
        );

        let e = RescaleError::AllocationFailure {
            what: "row ring",
            bytes: 64,
        };
        assert_eq!(e.to_string(), "failed to allocate 64 bytes for row ring");

        let e = RescaleError::UnsupportedSampleWidth { width: 3 };
        assert!(e.to_string().contains("3 bytes"));
    }
}
