use std::fmt;

/// Playback volume as a percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: u8 = 100;
    pub const DEFAULT: Volume = Volume(20);

    /// Clamps any integer into range. Out-of-range values are never rejected.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Linear gain applied to the live stream.
    pub fn gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Twenty cell bar, one filled cell per 5%.
    pub fn bar(self) -> String {
        const LENGTH: usize = 20;
        let filled = usize::from(self.0) * LENGTH / usize::from(Self::MAX);
        "█".repeat(filled) + &"░".repeat(LENGTH - filled)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
