//! Utility to create an operator account from the command line
//!
//! Usage: create_user <username> <password>

use mhm::config::AppConfig;
use mhm::db::Database;
use mhm::tools::auth;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (Some(username), Some(password)) = (args.next(), args.next()) else {
        eprintln!("Usage: create_user <username> <password>");
        std::process::exit(2);
    };

    let config = AppConfig::from_env();
    println!("Database path: {}", config.database_path.display());

    let database = Database::open(&config.database_path)?;
    let user = auth::register_user(&database, &username, &password, &password)?;

    println!("User created:");
    println!("  Username: {}", user.username);
    println!("  Created: {}", user.created_at);

    Ok(())
}
