//! Boolean speech-activity detection over microphone energy samples.

/// Energy level above which a sample counts as speech.
pub const SPEAKING_THRESHOLD: f64 = 18.0;

/// Turns a stream of energy readings into speaking transitions.
///
/// The detector is edge-triggered: [`sample`](SpeechDetector::sample)
/// returns `Some` only when the boolean crosses the threshold, so a
/// caller can forward every returned value to the wire without
/// flooding it with repeats.
#[derive(Debug, Clone)]
pub struct SpeechDetector {
    threshold: f64,
    speaking: bool,
}

impl SpeechDetector {
    pub fn new() -> Self {
        Self::with_threshold(SPEAKING_THRESHOLD)
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            speaking: false,
        }
    }

    /// Feeds one energy reading. Returns the new speaking state if it
    /// changed, `None` while it holds steady.
    pub fn sample(&mut self, energy: f64) -> Option<bool> {
        let now = energy > self.threshold;
        if now == self.speaking {
            return None;
        }
        self.speaking = now;
        Some(now)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Forces the detector silent. Returns `Some(false)` if it was
    /// speaking, so the caller can still announce the falling edge.
    pub fn reset(&mut self) -> Option<bool> {
        if self.speaking {
            self.speaking = false;
            Some(false)
        } else {
            None
        }
    }
}

impl Default for SpeechDetector {
    fn default() -> Self {
        Self::new()
    }
}
