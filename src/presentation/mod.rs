// Presentation layer - per-view state handed to the UI
pub mod device_view;
