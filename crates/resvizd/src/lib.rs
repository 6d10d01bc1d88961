pub mod annotate;
pub mod resources;
pub mod watch;
