pub mod events;
pub mod format;
pub mod hook;
pub mod model;
pub mod observer;
pub mod orchestrator;
pub mod session;

#[cfg(test)]
pub mod test_support;
