// Demo Orchestrator - runs a full client/freelancer escrow scenario
// end to end against the real wallet service and settlement engine.

use anyhow::{Context, Result};
use rust_decimal_macros::dec;
use settlement::notify::ChannelSink;
use settlement::projects::{InMemoryProjectDirectory, ProjectDirectory};
use settlement::{Config, ProjectRecord, ReviewDecision, SettlementEngine};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use uuid::Uuid;
use wallet_core::{Caller, Role, WalletService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    println!("\n🚀 =================================================================");
    println!("🚀 Escrow Rail - Milestone Settlement Demo");
    println!("🚀 Demonstrating: funded escrow, review gating, atomic release");
    println!("🚀 =================================================================\n");

    // Everything runs against throwaway data directories
    let temp = tempfile::TempDir::new()?;
    let mut config = Config::default();
    config.milestone_data_dir = temp.path().join("milestones");
    config.wallet.data_dir = temp.path().join("wallets");

    let wallet = Arc::new(WalletService::open(config.wallet.clone())?);
    let projects = Arc::new(InMemoryProjectDirectory::new());
    let (sink, mut notifications) = ChannelSink::new(32);

    let engine = Arc::new(SettlementEngine::new(
        config,
        wallet.clone(),
        projects.clone(),
        Arc::new(sink),
    )?);

    // Print notifications as they land
    tokio::spawn(async move {
        while let Some(note) = notifications.recv().await {
            println!("  🔔 [{}] {}", note.kind.as_str(), note.message);
        }
    });

    let client = Caller::new(Uuid::new_v4(), Role::Client);
    let freelancer = Caller::new(Uuid::new_v4(), Role::Freelancer);

    let project = ProjectRecord::assigned(Uuid::new_v4(), client.user_id, freelancer.user_id);
    let project_id = project.project_id;
    projects.upsert(project);

    println!("📊 Scenario: Portfolio website build");
    println!("📊 Client Aisha hires freelancer Marco on a two-milestone project");
    println!("📊 Project: {}\n", project_id);

    // Step 1: Client funds their wallet
    println!("💳 Step 1: Client deposits $500.00 into escrow wallet");
    let balance = wallet.deposit(&client, dec!(500.00)).await?;
    println!("  ✅ Client balance: ${}\n", balance);
    sleep(Duration::from_millis(300)).await;

    // Step 2: Client defines the milestones
    println!("📋 Step 2: Client adds milestones");
    let landing = engine
        .add_milestone(
            &client,
            project_id,
            "Landing page",
            "Hero, pricing, and footer sections",
            dec!(300.00),
            None,
        )
        .await?;
    let api = engine
        .add_milestone(
            &client,
            project_id,
            "API integration",
            "Wire the contact form to the backend",
            dec!(450.00),
            None,
        )
        .await?;
    println!("  ✅ 'Landing page' ($300.00) and 'API integration' ($450.00)\n");
    sleep(Duration::from_millis(300)).await;

    // Step 3: First milestone delivered and approved
    println!("🛠️  Step 3: Freelancer submits 'Landing page' for review");
    engine.submit(&freelancer, landing.milestone_id).await?;
    println!("  ✅ Submitted");
    sleep(Duration::from_millis(300)).await;

    println!("👀 Step 4: Client approves; escrow releases atomically");
    let approved = engine
        .review(&client, landing.milestone_id, ReviewDecision::Approved)
        .await?;
    println!("  ✅ Milestone status: {}", approved.status);
    let client_details = wallet.details(client.user_id).await?;
    let freelancer_details = wallet.details(freelancer.user_id).await?;
    println!(
        "  💰 Client: ${} | Freelancer: ${}\n",
        client_details.balance, freelancer_details.balance
    );
    sleep(Duration::from_millis(300)).await;

    // Step 5: Second milestone runs into an underfunded wallet
    println!("🛠️  Step 5: Freelancer submits 'API integration'");
    engine.submit(&freelancer, api.milestone_id).await?;
    println!("  ✅ Submitted");

    println!("👀 Step 6: Client approves with only $200.00 left in escrow");
    match engine
        .review(&client, api.milestone_id, ReviewDecision::Approved)
        .await
    {
        Err(settlement::Error::PaymentFailed(reason)) => {
            println!("  ⚠️  Release rejected: {}", reason);
            println!("  ⚠️  Milestone stays submitted; nothing moved\n");
        }
        other => anyhow::bail!("expected payment failure, got {:?}", other.map(|m| m.status)),
    }
    sleep(Duration::from_millis(300)).await;

    // Step 7: Top up and retry the same approval
    println!("💳 Step 7: Client deposits $300.00 more and retries");
    wallet.deposit(&client, dec!(300.00)).await?;
    let approved = engine
        .review(&client, api.milestone_id, ReviewDecision::Approved)
        .await?;
    println!("  ✅ Milestone status: {}", approved.status);

    let project = projects
        .get(project_id)?
        .context("project missing from directory")?;
    println!("  🎉 Project status: {} (all milestones approved)\n", project.status);
    sleep(Duration::from_millis(300)).await;

    // Step 8: Freelancer cashes out
    println!("🏦 Step 8: Freelancer withdraws earnings");
    let remaining = wallet.withdraw(&freelancer, dec!(750.00)).await?;
    println!("  ✅ Withdrew $750.00, balance now ${}\n", remaining);

    // Final ledger check
    println!("📈 =================================================================");
    println!("📈 FINAL LEDGER");
    println!("📈 =================================================================\n");
    for (name, caller) in [("Client", &client), ("Freelancer", &freelancer)] {
        let details = wallet.details(caller.user_id).await?;
        println!("  {} wallet: ${}", name, details.balance);
        for txn in details.transactions.iter().rev() {
            println!(
                "    {} {:>10} {}",
                txn.kind.as_str(),
                txn.amount,
                txn.description
            );
        }
        println!();
    }

    for caller in [&client, &freelancer] {
        anyhow::ensure!(
            wallet.verify_ledger(caller.user_id)?,
            "ledger drift for {}",
            caller.user_id
        );
    }
    println!("  ✅ Ledger verified: every balance equals its transaction sum\n");

    engine.shutdown().await?;
    wallet.shutdown().await?;

    println!("🎉 Demo complete!\n");
    Ok(())
}
