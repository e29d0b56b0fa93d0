use avatar_common::define_module_client;
use avatar_database::init_databases;
use sqlx::PgPool;

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

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        connect(false, false).await.clone()
    }
}
