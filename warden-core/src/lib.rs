use warden_database::Database;

pub type Error = anyhow::Error;

/// State shared by every command invocation.
#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;
