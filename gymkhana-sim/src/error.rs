use thiserror::Error;

/// Errors of the driving simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// An action index outside the discrete action set.
    #[error("invalid action index: {0}")]
    InvalidAction(i64),

    /// The field's start position is not collision-free.
    #[error("start position ({x:.1}, {y:.1}) is not collision-free")]
    BlockedStart {
        /// x coordinate of the rejected start position.
        x: f64,
        /// y coordinate of the rejected start position.
        y: f64,
    },

    /// The configured observation width cannot hold the state encoding.
    #[error("observation width {obs_dim} cannot hold speed, heading and {n_rays} ray distances")]
    ObsDimTooSmall {
        /// Configured observation width.
        obs_dim: usize,
        /// Number of configured sensor rays.
        n_rays: usize,
    },

    /// The sensor configuration has too few rays for directional terms.
    #[error("at least 3 sensor rays are required, got {0}")]
    TooFewRays(usize),

    /// The field is too small for the configured cell size.
    #[error("field of {width}x{height} is too small for cell size {cell_size}")]
    FieldTooSmall {
        /// Field width.
        width: f64,
        /// Field height.
        height: f64,
        /// Configured cell size.
        cell_size: f64,
    },
}
