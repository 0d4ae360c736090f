// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Project lifecycle commands.
//!
//! Commands: create, list, show, cancel, delete, status

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use bazaar_marketplace_sdk::{MarketplaceClient, ProjectDraft, ProjectId};

use super::{parse_status, print_project, status_label};

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Post a new project
    Create {
        /// Project title
        #[arg(long)]
        title: String,

        /// Project description
        #[arg(long, default_value = "")]
        description: String,

        /// Requirement, repeatable; at least one is required
        #[arg(long = "requirement", value_name = "TEXT")]
        requirements: Vec<String>,

        /// Skill tag, repeatable
        #[arg(long = "skill", value_name = "TAG")]
        skills: Vec<String>,

        /// Budget in dollars
        #[arg(long)]
        budget: f64,

        /// Deadline (RFC 3339, e.g. 2026-12-01T00:00:00Z)
        #[arg(long)]
        deadline: DateTime<Utc>,
    },

    /// List projects
    List {
        /// Filter by status (open, in-progress, completed, cancelled)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one project with its bids
    Show {
        /// Project ID
        project_id: Uuid,
    },

    /// Cancel an open project
    Cancel {
        /// Project ID
        project_id: Uuid,
    },

    /// Delete an open or cancelled project
    Delete {
        /// Project ID
        project_id: Uuid,
    },

    /// Manual status override (open, in-progress, completed, cancelled)
    Status {
        /// Project ID
        project_id: Uuid,

        /// Target status
        status: String,
    },

    /// Mark an in-progress project completed (assigned freelancer only)
    Complete {
        /// Project ID
        project_id: Uuid,
    },
}

pub async fn run(command: ProjectCommand, client: MarketplaceClient) -> Result<()> {
    match command {
        ProjectCommand::Create {
            title,
            description,
            requirements,
            skills,
            budget,
            deadline,
        } => {
            let draft = ProjectDraft {
                title,
                description,
                requirements,
                skills: skills.into_iter().collect(),
                budget,
                deadline,
            };
            let project = client.create_project(&draft).await?;
            println!("{} {}", "Created project".green(), project.id);
            print_project(&project);
        }
        ProjectCommand::List { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let projects = client.list_projects(status).await?;
            if projects.is_empty() {
                println!("No projects found");
                return Ok(());
            }
            for project in &projects {
                println!(
                    "{}  {}  ${:.2}  {} bids  {}",
                    project.id,
                    status_label(project.status),
                    project.budget,
                    project.bids.len(),
                    project.title
                );
            }
        }
        ProjectCommand::Show { project_id } => {
            let project = client.get_project(ProjectId(project_id)).await?;
            print_project(&project);
        }
        ProjectCommand::Cancel { project_id } => {
            let project = client.cancel_project(ProjectId(project_id)).await?;
            println!("{} {}", "Cancelled project".yellow(), project.id);
        }
        ProjectCommand::Delete { project_id } => {
            client.delete_project(ProjectId(project_id)).await?;
            println!("{} {}", "Deleted project".red(), project_id);
        }
        ProjectCommand::Status { project_id, status } => {
            let status = parse_status(&status)?;
            let project = client.update_status(ProjectId(project_id), status).await?;
            println!(
                "Project {} is now {}",
                project.id,
                status_label(project.status)
            );
        }
        ProjectCommand::Complete { project_id } => {
            let project = client.complete_project(ProjectId(project_id)).await?;
            println!("{} {}", "Completed project".blue(), project.id);
            print_project(&project);
        }
    }
    Ok(())
}
