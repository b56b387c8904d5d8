//! Bundled payloads for offline/demo mode.
//!
//! When `Config::static_fixtures` is set, the controller substitutes these
//! documents for both statistics endpoints and performs no network I/O at
//! all. The payloads are truncated real-shaped responses: statistics are
//! keyed by streamflow index code with historical and projected values per
//! model/scenario/era, and the hydrograph holds monthly flow series per
//! model and scenario.

use serde_json::Value;

use crate::fetch_error::FetchError;

pub const STATS_FIXTURE: &str = include_str!("../fixtures/stats.json");
pub const HYDROGRAPH_FIXTURE: &str = include_str!("../fixtures/modeled_climatology.json");

/// Parse both bundled documents. Fails only if the bundled files themselves
/// are broken, which the tests below guard against.
pub fn fixture_pair() -> Result<(Value, Value), FetchError> {
    let stats =
        serde_json::from_str(STATS_FIXTURE).map_err(|e| FetchError::Decode(e.to_string()))?;
    let hydrograph =
        serde_json::from_str(HYDROGRAPH_FIXTURE).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok((stats, hydrograph))
}
