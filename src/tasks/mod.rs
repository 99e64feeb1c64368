pub mod monitor;
pub mod notify;
