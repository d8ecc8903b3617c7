pub mod follower;

pub use follower::{
    AnchorFollower, AnchorMeasure, AnchorOptions, AnchorReading, AnchorSource, Placement, Renderer,
};
