pub mod connections;
pub mod webhook;
