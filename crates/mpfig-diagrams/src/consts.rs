//! Internal constants for diagram rendering.

use std::time::Duration;

/// Fixed class on every diagram `<figure>`.
pub const BASE_CLASS: &str = "metapost";

/// Default class of the container `<div>` inside the figure.
pub const DEFAULT_DIV_CLASS: &str = "container";

/// Liquid-style tag name of a diagram block.
pub const TAG_NAME: &str = "diagramblock";

/// Prefix of temporary workspace directories.
pub const WORKSPACE_PREFIX: &str = "mpfig-";

/// How often a running stage is polled when a timeout is set.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Permission bits of a placed artifact on unix.
pub const ARTIFACT_MODE: u32 = 0o644;
