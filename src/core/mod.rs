pub mod assets;
pub mod classification;
pub mod intake;
pub mod loader;
pub mod session;

pub use crate::domain::model::{Classification, ImageAsset, LoadState, LookupItem, Tier};
pub use crate::domain::ports::{LookupService, Notifier};
pub use crate::utils::error::Result;
