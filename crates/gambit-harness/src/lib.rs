//! Deterministic simulation harness for Gambit session sync.
//!
//! Seeded environments, an authoritative server model and two ways of
//! connecting clients to it: an in-memory [`SimNetwork`] for step-by-step
//! tests, and turmoil-simulated TCP ([`SimTransport`]) for running the real
//! task driver under simulated time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_network;
pub mod sim_server;
pub mod sim_transport;

pub use sim_driver::SimDriver;
pub use sim_env::SimEnv;
pub use sim_network::{SharedSimNetwork, SimNetwork};
pub use sim_server::{
    FULL_MESSAGE, ParticipantId, ServerOutput, SharedSimServer, SimServer, SimSession,
    create_shared_server,
};
pub use sim_transport::{SimChannel, SimHttp, SimListener, SimTransport, serve};
