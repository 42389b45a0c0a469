pub mod journal;
mod manager;

pub use manager::SessionManager;
