//! MongoDB Interface
//!
//! Provides MongoDB connection management and the shared error type.

use mongodb::{
    bson::doc,
    options::ClientOptions,
    Client, Collection, Database,
};
use thiserror::Error;

/// Default database name when the URI carries none
const DEFAULT_DB_NAME: &str = "nextgcore";

/// Database interface error types
#[derive(Error, Debug)]
pub enum DbiError {
    #[error("MongoDB error: {0}")]
    MongoDb(#[from] mongodb::error::Error),
    #[error("No database URI provided")]
    NoDbUri,
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Retry needed")]
    Retry,
}

/// Result type for database operations
pub type DbiResult<T> = Result<T, DbiError>;

/// MongoDB connection state
#[derive(Debug, Clone)]
pub struct OgsMongoc {
    pub name: String,
    pub client: Client,
    pub database: Database,
    pub masked_db_uri: String,
}

impl OgsMongoc {
    /// Connect and verify the server answers a `ping`.
    ///
    /// # Returns
    /// * `Err(DbiError::NoDbUri)` if URI is empty
    /// * `Err(DbiError::Retry)` if the server could not be reached
    pub async fn connect(db_uri: &str) -> DbiResult<Self> {
        if db_uri.is_empty() {
            log::error!("No DB_URI");
            return Err(DbiError::NoDbUri);
        }

        let masked = masked_db_uri(db_uri);
        let client_options = ClientOptions::parse(db_uri).await?;

        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        let client = Client::with_options(client_options)?;
        let database = client.database(&db_name);

        if let Err(e) = database.run_command(doc! { "ping": 1 }, None).await {
            log::warn!("Failed to connect to server [{}]: {}", masked, e);
            return Err(DbiError::Retry);
        }
        log::info!("MongoDB URI: '{}'", masked);

        Ok(Self {
            name: db_name,
            client,
            database,
            masked_db_uri: masked,
        })
    }

    /// Typed handle on a collection of the configured database
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.database.collection::<T>(name)
    }
}

/// Mask credentials in database URI for logging
pub fn masked_db_uri(db_uri: &str) -> String {
    if let Some(at_pos) = db_uri.rfind('@') {
        let host_part = &db_uri[at_pos + 1..];
        let scheme = db_uri
            .find("://")
            .map(|pos| &db_uri[..pos])
            .unwrap_or("mongodb");
        format!("{scheme}://*****:*****@{host_part}")
    } else {
        db_uri.to_string()
    }
}
