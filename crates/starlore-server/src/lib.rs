pub mod connection;
pub mod context;
pub mod input_queue;
pub mod players;
pub mod simulation;
