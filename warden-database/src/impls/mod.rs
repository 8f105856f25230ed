pub mod cases;
pub mod escalation;
pub mod features;
pub mod mod_config;
