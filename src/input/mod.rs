pub mod controller;
pub mod events;

// Re-export the essential types
pub use controller::ScrollController;
pub use events::GestureEvent;
