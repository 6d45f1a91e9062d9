mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectOptions, LocalizerBackend};
pub use backends::StubLocalizer;
pub use registry::LocalizerRegistry;
pub use result::Detection;

#[cfg(feature = "backend-tract")]
pub use backends::TractLocalizer;
