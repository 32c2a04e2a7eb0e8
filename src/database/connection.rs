use mongodb::{bson::doc, Client, Database};

use crate::config::AppConfig;
use crate::database::{ENROLLMENTS, PAYMENT_REQUESTS, USERS};
use crate::errors::Result;

pub async fn get_db_client(config: &AppConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.database_url).await?;
    let db = client.database(&config.database_name);

    db.run_command(doc! { "ping": 1 }).await?;

    let collections = db.list_collection_names().await?;
    tracing::info!("✅ Connected to database: {}", config.database_name);
    tracing::debug!("📂 Collections found: {:?}", collections);

    for expected in [USERS, PAYMENT_REQUESTS, ENROLLMENTS] {
        if !collections.iter().any(|c| c == expected) {
            tracing::warn!("⚠️ '{}' collection not found in database", expected);
        }
    }

    Ok(db)
}
