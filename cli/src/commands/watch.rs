// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Live room watcher. Streams a project's SSE feed and pretty-prints each
//! event until the connection drops or the user interrupts.

use anyhow::Result;
use colored::Colorize;
use uuid::Uuid;

use bazaar_marketplace_sdk::{MarketplaceClient, ProjectEvent, ProjectId};

pub async fn watch(project_id: Uuid, client: MarketplaceClient) -> Result<()> {
    let mut response = client.events(ProjectId(project_id)).await?;
    println!("{} {}", "Watching project".bold(), project_id);

    // SSE frames can span chunk boundaries, so buffer until a blank line.
    let mut buffer = String::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(boundary) = buffer.find("\n\n") {
            let frame = buffer[..boundary].to_string();
            buffer.drain(..boundary + 2);
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data: ") {
                    print_event(data);
                }
            }
        }
    }

    println!("{}", "Stream closed".dimmed());
    Ok(())
}

fn print_event(data: &str) {
    match serde_json::from_str::<ProjectEvent>(data) {
        Ok(ProjectEvent::NewBid { bid, at, .. }) => {
            println!(
                "{} {} ${:.2} from {} ({})",
                at.to_rfc3339().dimmed(),
                "new bid".green(),
                bid.amount,
                bid.freelancer_id,
                bid.id
            );
        }
        Ok(ProjectEvent::CounterOffer { bid_id, offer, at, .. }) => {
            println!(
                "{} {} ${:.2} on bid {}: {}",
                at.to_rfc3339().dimmed(),
                "counter-offer".yellow(),
                offer.amount,
                bid_id,
                offer.message
            );
        }
        Ok(ProjectEvent::BidStatusUpdate { bid_id, status, at, .. }) => {
            println!(
                "{} {} bid {} is now {}",
                at.to_rfc3339().dimmed(),
                "status".blue(),
                bid_id,
                status
            );
        }
        Ok(ProjectEvent::ProjectCompleted {
            freelancer_id,
            amount,
            completed_at,
            ..
        }) => {
            println!(
                "{} {} ${:.2} to {}",
                completed_at.to_rfc3339().dimmed(),
                "project completed".bold().blue(),
                amount,
                freelancer_id
            );
        }
        // Keep-alive comments and unknown payloads are skipped.
        Err(_) => {}
    }
}
