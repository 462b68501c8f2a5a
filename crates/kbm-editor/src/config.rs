//! Tunables for keyboard moves.

use kurbo::Vec2;
use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

/// Configuration shared by every move session of a `Mover`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveConfig {
    /// Canvas units covered by one unconstrained step. Default: **20**.
    pub unconstrained_step: f64,

    /// Where a directionally-found candidate places the moving block's port,
    /// relative to the neighbour port. Keeps the preview from sitting exactly
    /// on top of its target. Default: **(10, 10)**.
    pub candidate_offset: Vec2,

    /// Search radius for unconstrained (pointer-style) candidates, in canvas
    /// units. Default: **28**.
    pub snap_radius: f64,

    /// How much closer a new candidate must be before it replaces the staged
    /// one during unconstrained moves. Default: **8**.
    pub current_connection_preference: f64,

    /// Join a moved block's former neighbours when it is detached, so only
    /// the block itself moves. When `false` the stack below it comes along.
    /// Default: **true**.
    pub heal_stack: bool,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            unconstrained_step: 20.0,
            candidate_offset: Vec2::new(10.0, 10.0),
            snap_radius: 28.0,
            current_connection_preference: 8.0,
            heal_stack: true,
        }
    }
}

impl MoveConfig {
    /// Load from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns the serde error text, or a message naming a non-positive step
    /// or radius.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let config: MoveConfig =
            serde_json::from_str(text).map_err(|e| format!("invalid move config: {e}"))?;
        if !(config.unconstrained_step > 0.0) {
            return Err(format!(
                "unconstrained_step must be positive, got {}",
                config.unconstrained_step
            ));
        }
        if !(config.snap_radius >= 0.0) {
            return Err(format!(
                "snap_radius must not be negative, got {}",
                config.snap_radius
            ));
        }
        Ok(config)
    }
}
