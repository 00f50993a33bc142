/// Default log level (overridable via RUST_LOG)
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Instrument geometry
// ============================================================================

/// Logical channels per acquisition module
pub const CHANNELS_PER_MODULE: u32 = 16;

/// Physical channels per site; a 16-channel module spans two sites
pub const CHANNELS_PER_SITE: u32 = 8;

/// Maximum modules per carrier
pub const MAX_MODULES: u32 = 3;

// ============================================================================
// Raw acquisition
// ============================================================================

/// Full-scale magnitude of a signed 16-bit sample
pub const FULL_SCALE: f64 = 32768.0;

/// Channel data server port prefix; the two-digit channel number is appended
pub const RAW_PORT_PREFIX: &str = "530";

/// Minimum byte count to accumulate from the channel data server
pub const RAW_BYTES_REQUIRED: usize = 200_000;

// ============================================================================
// Operator interaction
// ============================================================================

/// Reply that declines a remeasure at the retry prompt, forcing acceptance
pub const DECLINE_TOKEN: &str = "n";

// ============================================================================
// Artifacts
// ============================================================================

/// Default working directory root, one subdirectory per carrier
pub const DATA_ROOT: &str = "/home/dt100/CMR";

/// Report file name within the per-carrier directory
pub const REPORT_FILE: &str = "results";
