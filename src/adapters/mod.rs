// Adapters layer: concrete collaborators for the ports in `domain::ports`.

pub mod http;
pub mod notify;
pub mod runtime;

pub use http::HttpLookupService;
pub use notify::{ChannelNotifier, MemoryNotifier, TracingNotifier};
pub use runtime::{LoggingRecovery, SystemClock, TokioScheduler};
