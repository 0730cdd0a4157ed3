//! Resolver configuration.

/// Tunable limits for transaction resolution.
///
/// All state that affects resolution is carried here explicitly rather
/// than read from process-global state, so two transactions with
/// different settings can run side by side.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum recursion depth while exploring alternatives. A branch
    /// that exceeds it fails like any other dead end.
    pub max_depth: usize,

    /// Maximum number of candidate providers examined per dependency.
    /// Candidates beyond this many are not explored.
    pub max_alternatives: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: 256,
            max_alternatives: 64,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum exploration depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum number of alternatives per dependency.
    pub fn with_max_alternatives(mut self, count: usize) -> Self {
        self.max_alternatives = count;
        self
    }
}
