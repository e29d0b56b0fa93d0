use anyhow::Result;
use axum::Router;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use avatar_api::{
    admin_routes, billing_routes, flow_routes, interview_routes, misc_routes, profile_routes,
    referral_routes, setup_tracing, signup_routes, GlobalState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let cors = CorsLayer::very_permissive();
    let trace = TraceLayer::new_for_http();

    let global_state = GlobalState::new().await?;

    let app = Router::new()
        .merge(misc_routes(global_state.clone()))
        .merge(signup_routes())
        .merge(referral_routes(global_state.clone()))
        .merge(flow_routes(global_state.clone()))
        .merge(interview_routes(global_state.clone()))
        .merge(profile_routes(global_state.clone()))
        .merge(billing_routes(global_state.clone()))
        .merge(admin_routes(global_state.clone()))
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(cors)
        .layer(trace)
        .with_state(global_state);

    let port: u16 = std::env::var("PORT")
        .unwrap_or("3033".into())
        .parse()
        .expect("failed to convert to number");

    let listener = tokio::net::TcpListener::bind(format!(":::{port}"))
        .await
        .unwrap();

    tracing::info!("LISTENING ON {port}");
    axum::serve(listener, app.into_make_service()).await.unwrap();
    Ok(())
}
