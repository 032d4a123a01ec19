//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout and the three screens
//! - `input`: keyboard and paste handling
//! - `styles`: color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;
