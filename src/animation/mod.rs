pub mod fling;
pub mod zoom;

pub use fling::Fling;
pub use zoom::ZoomAnimation;
