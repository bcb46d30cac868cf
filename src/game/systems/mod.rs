pub mod collision;
pub mod escalation;
pub mod fish;
pub mod ink;
pub mod jellyfish;
pub mod octopus;
pub mod physics;
pub mod seahorse;
pub mod shark;
