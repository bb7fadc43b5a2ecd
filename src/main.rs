mod models;
mod prompts;
mod services;
mod webhook;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use services::{Analyzer, MultiModelService, VeniceClient, VeniceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting NutriLens analysis server...");

    let config = VeniceConfig::from_env();
    if config.is_configured() {
        log::info!("✅ Venice API configured ({})", config.base_url);
    } else {
        log::warn!("⚠️ VENICE_API_KEY not set - analysis requests will be rejected");
    }

    let client = Arc::new(VeniceClient::from_config(&config));
    let analyzer = Arc::new(Analyzer::new(client, config));
    let multi_model = Arc::new(MultiModelService::new(analyzer));
    log::info!("✅ Multi-model analysis service initialized");

    #[cfg(feature = "webhook-server")]
    {
        use services::Database;
        use webhook::server::create_api_router;

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let database = Arc::new(Database::new(&database_url).await?);
        log::info!("✅ PostgreSQL food log initialized");

        let addr = "0.0.0.0:8080";
        let app = create_api_router(multi_model.clone(), database);

        log::info!("🌐 API server starting on {}", addr);

        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind API server");
            axum::serve(listener, app)
                .await
                .expect("Failed to start API server");
        });

        log::info!("✅ API server started");
    }

    log::info!("🎉 Server is ready!");

    println!("\n📷 NutriLens is running!");
    println!("🌐 API server: http://localhost:8080");
    println!("\n💡 Endpoints:");
    println!("   POST /api/analyze            - single-model analysis");
    println!("   POST /api/analyze-multi      - parallel multi-model comparison");
    println!("   GET  /api/analyze-multi/models - available models");
    println!("   POST /api/logs               - save a report to the food log");
    println!("\n🛑 Press Ctrl+C to stop\n");

    // Keep running
    tokio::signal::ctrl_c().await?;

    log::info!("🛑 Shutting down...");

    Ok(())
}
