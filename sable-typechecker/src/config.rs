//! Checker limits

/// Bounds on the iterative parts of checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Passes of the body-checking loop before it is considered runaway
    pub max_fixed_point_passes: usize,
    /// Passes of the generic inference loop per call
    pub max_inference_passes: usize,
    /// Largest shift amount folded for integer literals
    pub max_literal_shift: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_fixed_point_passes: 256,
            max_inference_passes: 16,
            max_literal_shift: 1024,
        }
    }
}
