pub mod client;
pub mod model;
pub mod pipeline;
pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod terminal;
pub mod transport;
