/// Badge rule engine
///
/// - `rules`: event-to-category trigger table and requirement checks
/// - `engine`: [`BadgeEngine`], the event listener that awards badges

pub mod engine;
pub mod rules;

pub use engine::BadgeEngine;
pub use rules::{triggers_for, Measure, Trigger};
