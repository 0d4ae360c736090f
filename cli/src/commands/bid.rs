// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Bid commands.
//!
//! Commands: submit, accept, reject, counter

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use bazaar_marketplace_sdk::{BidId, MarketplaceClient, ProjectId};

use super::print_project;

#[derive(Subcommand)]
pub enum BidCommand {
    /// Submit a bid against an open project
    Submit {
        /// Project ID
        project_id: Uuid,

        /// Bid amount in dollars
        #[arg(long)]
        amount: f64,

        /// Message to the client
        #[arg(long, default_value = "")]
        message: String,
    },

    /// Accept a bid; the other pending bids are rejected
    Accept {
        /// Project ID
        project_id: Uuid,

        /// Bid ID
        bid_id: Uuid,
    },

    /// Reject a pending bid
    Reject {
        /// Project ID
        project_id: Uuid,

        /// Bid ID
        bid_id: Uuid,
    },

    /// Attach a counter-offer to a bid
    Counter {
        /// Project ID
        project_id: Uuid,

        /// Bid ID
        bid_id: Uuid,

        /// Proposed amount in dollars
        #[arg(long)]
        amount: f64,

        /// Message to the freelancer
        #[arg(long, default_value = "")]
        message: String,
    },
}

pub async fn run(command: BidCommand, client: MarketplaceClient) -> Result<()> {
    match command {
        BidCommand::Submit {
            project_id,
            amount,
            message,
        } => {
            let project = client
                .submit_bid(ProjectId(project_id), amount, &message)
                .await?;
            println!("{} on project {}", "Bid submitted".green(), project.id);
            print_project(&project);
        }
        BidCommand::Accept { project_id, bid_id } => {
            let project = client
                .accept_bid(ProjectId(project_id), BidId(bid_id))
                .await?;
            println!("{} {}", "Accepted bid".green(), bid_id);
            print_project(&project);
        }
        BidCommand::Reject { project_id, bid_id } => {
            client
                .reject_bid(ProjectId(project_id), BidId(bid_id))
                .await?;
            println!("{} {}", "Rejected bid".red(), bid_id);
        }
        BidCommand::Counter {
            project_id,
            bid_id,
            amount,
            message,
        } => {
            client
                .counter_offer(ProjectId(project_id), BidId(bid_id), amount, &message)
                .await?;
            println!("{} on bid {}", "Counter-offer sent".yellow(), bid_id);
        }
    }
    Ok(())
}
