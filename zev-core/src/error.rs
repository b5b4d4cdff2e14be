use thiserror::Error;

/// Everything that can block a device or shared-meter configuration from being
/// saved. All variants are detected before persistence; none are retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A required field is absent, or carries a value the transport cannot
    /// use (an out-of-range QoS, a zero port). Either way the named field
    /// needs operator input before the save goes through.
    #[error("missing or invalid required field: {field}")]
    MissingField { field: &'static str },

    #[error("custom split percentages sum to {sum:.2}, expected 100")]
    PercentageSumInvalid { sum: f64 },

    #[error("building has no active occupants")]
    NoActiveOccupants,

    #[error("no collision-free telemetry key found after {attempts} attempts")]
    AllocationExhausted { attempts: usize },
}
