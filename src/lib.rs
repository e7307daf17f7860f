// Kurogane offline caching proxy library

pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod logging;
pub mod partition;
pub mod proxy;
pub mod queue;
pub mod router;
pub mod store;
pub mod strategy;
