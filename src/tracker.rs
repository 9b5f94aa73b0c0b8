mod history;
mod matching;
mod motion_model;
mod motion_tracker;
pub mod report;
mod track;
mod track_state;

pub use history::History;
pub use matching::{Matcher, MatcherConfig};
pub use motion_model::MotionModel;
pub use motion_tracker::{Tracker, TrackerConfig};
pub use report::{Age, find_corresponding_track};
pub use track::Track;
pub use track_state::TrackState;
