pub mod bus;
pub mod sse;

pub use bus::EventBus;
