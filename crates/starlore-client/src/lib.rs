pub mod chat;
pub mod event_bus;
pub mod interpolation;
pub mod network;
pub mod prediction;
