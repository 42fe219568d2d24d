//! Example walking the manual code-entry path against the mock provider
//!
//! Run with: cargo run --example manual_entry

use std::sync::Arc;

use pf_core::domain::entities::{AuthMode, VerificationStatus};
use pf_core::flow::{FlowConfig, PhoneVerificationController};
use pf_infra::provider::MockAuthProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let provider = Arc::new(MockAuthProvider::new());
    let controller = Arc::new(PhoneVerificationController::new(
        provider.clone(),
        AuthMode::SignIn,
        FlowConfig::default(),
    ));

    let mut updates = controller.subscribe();
    let flow = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start("+14155550123").await }
    });

    println!("\n=== Manual code entry ===");
    updates
        .wait_for(|update| update.status == VerificationStatus::AwaitingCode)
        .await?;

    // The mock provider logs its code instead of sending an SMS; read it
    // back the way a user would read their phone
    let code = provider.last_issued_code().unwrap_or_default();
    println!("Code delivered: {}", code);

    // Type the code cell by cell, rendering the entry boxes as we go
    for ch in code.chars() {
        controller.enter_code_char(ch).await?;
        let cells: String = controller
            .code_cells()
            .cells
            .iter()
            .map(|cell| cell.unwrap_or('_'))
            .collect();
        println!("  [{}]", cells);
    }

    match flow.await?? {
        Some(session) => println!("Signed in as {}", session.principal),
        None => println!("Flow was cancelled"),
    }

    Ok(())
}
