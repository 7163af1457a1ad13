pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpLookupService, TracingNotifier};
pub use config::IntakeConfig;
pub use core::{
    intake::{ImageCandidate, ImageValidator},
    loader::{CascadingLoader, RetryPolicy},
    session::{ListingSession, ListingSubmission},
};
pub use utils::error::{IntakeError, Result};
