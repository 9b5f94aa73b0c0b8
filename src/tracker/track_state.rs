use std::fmt;

/// Track state in the tracking finite-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Uninitialized track, never produced by the tracker
    #[default]
    Unknown,
    /// Matched in the current frame (or just created)
    Updated,
    /// Not matched, still within the extrapolation budget
    Lost,
    /// Extrapolation budget exceeded, never revisited
    Finished,
}

impl TrackState {
    /// Three-letter code used in track listings.
    pub fn code(&self) -> &'static str {
        match self {
            TrackState::Unknown => "UKN",
            TrackState::Updated => "UPD",
            TrackState::Lost => "LST",
            TrackState::Finished => "FNS",
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, TrackState::Updated | TrackState::Lost)
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
