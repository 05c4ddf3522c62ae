//! Core module - workspace, configuration and output plumbing

pub mod config;
pub mod destination;
pub mod workspace;

pub use config::Config;
pub use destination::{CollisionPolicy, DestinationError, DirectoryDestination, OutputDestination};
pub use workspace::{Workspace, WorkspaceError};
