pub mod constants;
pub mod enumerate;
pub mod host;
pub mod packet;
pub mod property;
pub mod resource;

#[cfg(target_os = "macos")]
pub mod coremidi;

#[cfg(any(test, feature = "fake"))]
pub mod fake;
