use sea_orm_migration::prelude::*;
use std::env;

use migration::Migrator;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let db_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("up");

    let db = sea_orm::Database::connect(&db_url).await
        .expect("Failed to connect to database");

    match command {
        "up" => {
            Migrator::up(&db, None).await
                .expect("Failed to run migrations");
            println!("✓ request_history schema is up to date");
        }
        "down" => {
            Migrator::down(&db, Some(1)).await
                .expect("Failed to rollback migration");
            println!("✓ Rolled back the latest migration");
        }
        "fresh" => {
            Migrator::fresh(&db).await
                .expect("Failed to run fresh migrations");
            println!("✓ Dropped all tables and re-applied migrations");
        }
        "status" => {
            Migrator::status(&db).await
                .expect("Failed to get migration status");
        }
        _ => {
            eprintln!("Unknown command: {}. Use: up, down, fresh, or status", command);
            std::process::exit(1);
        }
    }

    if let Err(e) = db.close().await {
        eprintln!("Failed to close database connection: {}", e);
    }
}
