// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! CLI command handlers.

pub mod bid;
pub mod project;
pub mod watch;

pub use bid::BidCommand;
pub use project::ProjectCommand;
pub use watch::watch;

use anyhow::{bail, Result};
use colored::Colorize;

use bazaar_marketplace_sdk::{BidStatus, Project, ProjectStatus};

pub(crate) fn parse_status(s: &str) -> Result<ProjectStatus> {
    match s {
        "open" => Ok(ProjectStatus::Open),
        "in-progress" => Ok(ProjectStatus::InProgress),
        "completed" => Ok(ProjectStatus::Completed),
        "cancelled" => Ok(ProjectStatus::Cancelled),
        other => bail!("unknown status '{other}' (expected open, in-progress, completed or cancelled)"),
    }
}

pub(crate) fn status_label(status: ProjectStatus) -> colored::ColoredString {
    match status {
        ProjectStatus::Open => "open".green(),
        ProjectStatus::InProgress => "in-progress".yellow(),
        ProjectStatus::Completed => "completed".blue(),
        ProjectStatus::Cancelled => "cancelled".red(),
    }
}

pub(crate) fn print_project(project: &Project) {
    println!("{} {}", "Project:".bold(), project.title);
    println!("  ID:         {}", project.id);
    println!("  Status:     {}", status_label(project.status));
    println!("  Budget:     ${:.2}", project.budget);
    println!("  Deadline:   {}", project.deadline.to_rfc3339());
    println!("  Client:     {}", project.client_id);
    if let Some(freelancer_id) = project.freelancer_id {
        println!("  Freelancer: {}", freelancer_id);
    }
    if let Some(completed_at) = project.completed_at {
        println!("  Completed:  {}", completed_at.to_rfc3339());
    }
    if !project.skills.is_empty() {
        let skills: Vec<&str> = project.skills.iter().map(String::as_str).collect();
        println!("  Skills:     {}", skills.join(", "));
    }
    if project.bids.is_empty() {
        println!("  Bids:       none");
        return;
    }
    println!("  Bids:");
    for bid in &project.bids {
        let status = match bid.status {
            BidStatus::Pending => "pending".yellow(),
            BidStatus::Accepted => "accepted".green(),
            BidStatus::Rejected => "rejected".red(),
        };
        println!(
            "    {} ${:.2} [{}] from {}",
            bid.id, bid.amount, status, bid.freelancer_id
        );
        if let Some(offer) = &bid.counter_offer {
            println!("      counter-offer: ${:.2} ({})", offer.amount, offer.message);
        }
    }
}
