//! Example demonstrating an auto-completed phone sign-in with the mock provider
//!
//! Run with: cargo run --example mock_sign_in

use std::sync::Arc;

use pf_core::domain::entities::AuthMode;
use pf_core::flow::{FlowConfig, PhoneVerificationController};
use pf_infra::provider::{MockAuthProvider, MockDelivery};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let provider = Arc::new(MockAuthProvider::new().with_delivery(MockDelivery::AutoComplete));
    let controller = Arc::new(PhoneVerificationController::new(
        provider,
        AuthMode::SignIn,
        FlowConfig::default(),
    ));

    // Print every state transition while the flow runs
    let mut updates = controller.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            println!("  -> status: {:?}", updates.borrow().status);
        }
    });

    println!("\n=== Auto-completed sign-in ===");
    match controller.start("+14155550123").await? {
        Some(session) => println!(
            "Signed in as {} (new account: {})",
            session.principal, session.is_new_principal
        ),
        None => println!("Flow was cancelled"),
    }

    drop(controller);
    let _ = watcher.await;
    Ok(())
}
