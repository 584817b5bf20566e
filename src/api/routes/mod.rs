//! API route modules.

pub mod discover;
pub mod links;
pub mod meetings;
pub mod ports;
pub mod tabs;

#[cfg(test)]
pub(crate) mod test_support;
