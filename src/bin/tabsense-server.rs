//! tabsense HTTP server binary

use std::sync::Arc;
use tabsense::{
    CacheStore, ClassificationResult, ClassifierHandle, EngineConfig, HttpModelLoader, JsonFileCache,
    MemoryCache, MockZeroShotModel, TwoPassOrchestrator,
};

mod server {
    pub use tabsense::server::*;
}

const DEFAULT_PORT: u16 = 8082;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    println!("🚀 tabsense tab classifier");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    // Check for --use-real flag
    let use_real = std::env::args().any(|arg| arg == "--use-real");

    let classifier = if use_real {
        let classifier_url = std::env::var("TABSENSE_CLASSIFIER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string());
        println!("✓ Mode: REAL zero-shot service");
        println!("✓ Classifier service: {}", classifier_url);
        println!("   (model is loaded on the first classify request)");
        ClassifierHandle::new(Arc::new(HttpModelLoader::new(classifier_url)))
    } else {
        println!("✓ Mode: MOCK zero-shot model");
        println!("   (use --use-real to call a zero-shot service)");
        ClassifierHandle::from_model(Arc::new(MockZeroShotModel::new()))
    };

    let cache: Arc<dyn CacheStore<ClassificationResult>> = match std::env::var("TABSENSE_CACHE_PATH") {
        Ok(path) => {
            println!("✓ Cache file: {}", path);
            Arc::new(JsonFileCache::<ClassificationResult>::new(path))
        }
        Err(_) => {
            println!("✓ Cache: in-memory");
            Arc::new(MemoryCache::<ClassificationResult>::new())
        }
    };

    let config = EngineConfig::from_env();
    println!(
        "✓ Batch size {}, delay {}ms, cache TTL {}s",
        config.batch_size,
        config.batch_delay.as_millis(),
        config.cache_ttl.as_secs()
    );

    let port = match std::env::var("TABSENSE_PORT") {
        Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
            eprintln!("⚠️  Ignoring invalid TABSENSE_PORT={:?}", raw);
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    };

    let orchestrator = TwoPassOrchestrator::new(Arc::new(classifier), cache, config);

    println!("✓ Orchestrator initialized");
    println!("✓ Starting HTTP server on port {}...", port);
    println!();

    server::run_server(orchestrator, port).await?;

    Ok(())
}
