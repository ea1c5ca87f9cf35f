pub mod assemble;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod geometry;
pub mod loader;
pub mod materialize;
pub mod progress;
pub mod providers;
pub mod scene;
pub use loader::{LoadError, LoadOrchestrator, LoadedScene};
pub use progress::{LoadEvent, LoadEventReceiver, LoadPhase};
