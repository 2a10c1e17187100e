//! Cut-point planning over a fully known timeline

mod planner;
mod scorer;


pub use planner::{plan_cut_points, SegmentPlanner};
pub use scorer::{BoundaryScorer, ScoredInstant, SearchWindow};
