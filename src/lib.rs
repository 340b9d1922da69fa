pub mod cli;
pub mod config;
pub mod constraints;
pub mod drawing;
pub mod error;
pub mod graph;
pub mod layout;
pub mod normalize;
pub mod render;
pub mod theme;

pub use cli::run;
