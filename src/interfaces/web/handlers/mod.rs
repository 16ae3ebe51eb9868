pub mod agents;
pub mod communication;
pub mod proposals;
pub mod stats;
pub mod tasks;
