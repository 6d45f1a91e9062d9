pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubLocalizer;

#[cfg(feature = "backend-tract")]
pub use tract::TractLocalizer;
