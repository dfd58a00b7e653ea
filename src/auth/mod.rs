//! Auth orchestration — session lifecycle handling and directives.

pub mod directives;
pub mod orchestrator;

pub use directives::{Directive, Notice, NoticeLevel, Route};
pub use orchestrator::{AuthOrchestrator, display_name};
