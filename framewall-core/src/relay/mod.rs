//! Frame relay: the per-topic subscriber workers moving frames from bus
//! subscriptions into HTTP-servable buffers.

mod worker;

pub use worker::SubscriberWorker;
