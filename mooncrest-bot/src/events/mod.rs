pub mod assistant;
pub mod components;
pub mod tasks;
