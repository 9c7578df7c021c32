use rand::Rng;

/// Engine invocation options for one game instance.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Device the engine should run on (e.g. a GPU index)
    pub gpu: Option<String>,
    /// Resign threshold percentage for this game; 0 disables resignation
    pub resign_pct: u8,
    /// Base arguments passed through from configuration
    pub extra_args: Vec<String>,
}

impl EngineOptions {
    pub fn new(extra_args: Vec<String>) -> Self {
        Self {
            gpu: None,
            resign_pct: 0,
            extra_args,
        }
    }

    /// Pin these options to a device slot.
    pub fn for_device(mut self, gpu: Option<String>) -> Self {
        self.gpu = gpu;
        self
    }

    /// Per-game resign threshold.
    pub fn with_resign_pct(mut self, pct: u8) -> Self {
        self.resign_pct = pct;
        self
    }
}

/// Per-game resign threshold selection.
///
/// A slice of games plays with resignation disabled so that resign rates for
/// new networks can be analyzed offline; the rest use the default threshold.
#[derive(Debug, Clone)]
pub struct ResignPolicy {
    /// Probability that a game disables resignation entirely
    pub disable_probability: f64,
    /// Threshold percentage used by all other games
    pub default_pct: u8,
}

impl Default for ResignPolicy {
    fn default() -> Self {
        Self {
            disable_probability: 0.2,
            default_pct: 5,
        }
    }
}

impl ResignPolicy {
    /// Pick the resign threshold for one game.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> u8 {
        if rng.gen::<f64>() < self.disable_probability {
            0
        } else {
            self.default_pct
        }
    }
}
