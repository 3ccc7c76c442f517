//! Standalone migration runner: `cargo run -p migration -- <command>`.

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: cargo run -p migration -- [up|down|fresh|refresh|status]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./packattack.db?mode=rwc".to_string());

    let db = Database::connect(&db_url).await?;

    match command.as_str() {
        "up" => migration::Migrator::up(&db, None).await?,
        // Only the latest migration, so a bad deploy can be stepped back.
        "down" => migration::Migrator::down(&db, Some(1)).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    println!("migration {command} done on {db_url}");
    Ok(())
}
