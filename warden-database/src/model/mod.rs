pub mod cases;
pub mod config;
pub mod features;
