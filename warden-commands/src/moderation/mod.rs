pub mod actions;
pub mod ban;
pub mod case;
pub(crate) mod embeds;
pub mod escalation;
pub mod feature;
pub mod gateway;
pub mod kick;
pub mod logging;
pub mod modconfig;
pub mod timeout;
pub mod warn;
