//! ribeye: stock a storage and cook one steak.
//!
//! Usage: `ribeye [PANTRY.json]`
//!
//! The optional pantry file is a JSON array of resources. Without it a default
//! pantry is used. The finished steak is printed to stdout as JSON.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use ribeye::{
    CookingProcess, Kitchen, KitchenConfig, Macronutrients, Quantity, Resource, ResourceKind,
    ResourceRepository, Storage, StorageConfig, TracingListener, TracingMessenger,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let base_level = match std::env::var("RIBEYE_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("ribeye={base_level},ribeye_cli={base_level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

fn default_pantry() -> Vec<Resource> {
    let expiration = Utc::now() + Duration::days(3);
    vec![
        Resource::new(
            ResourceKind::Meat,
            Macronutrients::new(19.0, 22.0, 0.0, 291.0),
            Quantity::Weight(420),
            expiration,
        ),
        Resource::new(
            ResourceKind::Meat,
            Macronutrients::new(20.0, 19.5, 0.0, 270.0),
            Quantity::Weight(380),
            expiration,
        ),
        Resource::new(
            ResourceKind::Grill,
            Macronutrients::default(),
            Quantity::Weight(2_000),
            Utc::now() + Duration::days(365),
        ),
        Resource::new(
            ResourceKind::Sauce,
            Macronutrients::new(2.0, 12.0, 6.0, 140.0),
            Quantity::Weight(600),
            expiration,
        ),
        Resource::new(
            ResourceKind::Rosemary,
            Macronutrients::new(3.3, 5.9, 20.7, 131.0),
            Quantity::Piece(20),
            Utc::now() + Duration::days(10),
        ),
    ]
}

fn load_pantry(path: Option<String>) -> anyhow::Result<Vec<Resource>> {
    let Some(path) = path else {
        return Ok(default_pantry());
    };
    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("failed to read pantry {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid pantry file {path}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let pantry = load_pantry(std::env::args().nth(1))?;

    let storage = Arc::new(Storage::new(StorageConfig::default()));
    for resource in pantry {
        let kind = resource.kind;
        if let Err(err) = storage.put(resource).await {
            tracing::warn!(%kind, error = %err, "Skipping pantry item");
        }
    }

    let kitchen = Kitchen::new(KitchenConfig::default(), Arc::new(TracingMessenger));
    let process =
        CookingProcess::new(Arc::new(kitchen), storage).with_listener(Arc::new(TracingListener));

    let steak = process.run().await.context("cooking failed")?;
    println!("{}", serde_json::to_string_pretty(&steak)?);
    Ok(())
}
