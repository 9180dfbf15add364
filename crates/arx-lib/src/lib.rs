pub mod annotations;
pub mod cache;
pub mod config;
pub mod error;
pub mod io;
pub mod nav;
pub mod plot;
pub mod render;
pub mod segments;
pub mod signal;

pub use annotations::*;
pub use render::*;
pub use segments::*;
pub use signal::*;
