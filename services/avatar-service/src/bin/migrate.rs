use anyhow::Result;

use avatar_database::init_databases;

init_databases!(
    default: [
        avatar_domain::Profile,
        avatar_domain::Referral,
        avatar_domain::Patient,
        avatar_domain::PersonProfile,
        avatar_domain::NutritionInterview,
        avatar_domain::AdminNotification,
        avatar_domain::PaymentRecord,
    ]
);

/// Idempotent schema bootstrap: tables, the updated_at trigger machinery
/// and indexes. Run once per environment and after every model change.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let drop_tables = std::env::args().any(|arg| arg == "--drop");
    if drop_tables {
        eprintln!("dropping all tables first");
    }

    connect(drop_tables, true).await;
    println!("schema is up to date");
    Ok(())
}
