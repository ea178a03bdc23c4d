// Library Guide - Personal Library Catalog Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use library_guide::api::{Catalog, ListQuery};
use library_guide::guide::{GuideKind, ScreenView, Wizard};
use library_guide::models::{Child, EntityKind, EntityRef};
use library_guide::pagination::Pager;
use library_guide::{AppState, ClientConfig, LibraryClient, MemoryCatalog};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "library-guide-cli")]
#[command(about = "Library Guide CLI - browse and edit a library catalog", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the built-in sample catalog instead of the backend
    #[arg(long, global = true)]
    memory: bool,

    /// Library to work in (defaults to the first one)
    #[arg(short, long, global = true)]
    library: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List libraries
    Libraries,
    /// List entities of one kind
    List {
        /// authors, series, stories or volumes
        kind: String,
        /// Name search
        #[arg(short, long)]
        name: Option<String>,
        /// One-relative page
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show one entity with its relationships
    Show { kind: String, id: i64 },
    /// Run the guided wizard
    Guide {
        /// author, series, story or volume
        kind: String,
        /// Root entity to start with
        id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("library_guide={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let catalog: Arc<dyn Catalog> = if cli.memory {
        Arc::new(MemoryCatalog::sample())
    } else {
        Arc::new(LibraryClient::new(config.clone())?)
    };

    let mut state = AppState::new(catalog.clone());
    state.sign_in();

    match cli.command {
        Commands::Libraries => {
            for library in catalog.libraries().await? {
                println!("{:>5}  {}{}", library.id, library.name, if library.active { "" } else { " (inactive)" });
            }
        }
        Commands::List { kind, name, page } => {
            let kind = parse_child_kind(&kind)?;
            let library_id = select_library(&mut state, cli.library).await?;
            let mut pager = Pager::new(config.page_size);
            for _ in 1..page.max(1) {
                pager.next();
            }
            let mut query = ListQuery::page(pager.page_size(), pager.offset());
            if let Some(name) = name {
                query = query.named(name);
            }
            let rows = catalog.list(library_id, kind, &query).await?;
            print_rows(&rows);
            println!("page {}{}", pager.page(), if pager.is_last_page(rows.len()) { " (last)" } else { "" });
        }
        Commands::Show { kind, id } => {
            let kind = parse_child_kind(&kind)?;
            let library_id = select_library(&mut state, cli.library).await?;
            let child = catalog.find(library_id, EntityRef::new(kind, id), true).await?;
            let summary = library_guide::guide::Summary {
                expanded: true,
                ..library_guide::guide::Summary::from_parent(&library_guide::guide::Parent::from_child(child))
            };
            for line in summary.lines() {
                println!("{}", line);
            }
        }
        Commands::Guide { kind, id } => {
            let guide = GuideKind::from_kind(parse_child_kind(&kind)?)
                .ok_or_else(|| anyhow!("no guide for {}", kind))?;
            select_library(&mut state, cli.library).await?;
            let mut wizard = Wizard::new(state, guide, config.page_size)?;
            wizard.start().await;
            if let Some(id) = id {
                wizard.select_root(id).await?;
            }
            run_guide(&mut wizard).await?;
        }
    }

    Ok(())
}

fn parse_child_kind(value: &str) -> anyhow::Result<EntityKind> {
    match EntityKind::parse(value) {
        Some(EntityKind::Library) | None => bail!("unknown entity kind '{}'", value),
        Some(kind) => Ok(kind),
    }
}

async fn select_library(state: &mut AppState, id: Option<i64>) -> anyhow::Result<i64> {
    match id {
        Some(id) => state.select_library_by_id(id).await?,
        None => {
            let library = state
                .catalog()
                .libraries()
                .await?
                .into_iter()
                .find(|l| l.active)
                .ok_or_else(|| anyhow!("no active library"))?;
            state.select_library(library)?;
        }
    }
    Ok(state.library_id()?)
}

fn print_rows(rows: &[Child]) {
    for (index, row) in rows.iter().enumerate() {
        let mut line = format!("{:>3}. {:>5}  {}", index + 1, row.id(), row.label());
        if row.principal() == Some(true) {
            line.push_str(" [principal]");
        }
        if let Some(ordinal) = row.ordinal() {
            line.push_str(&format!(" [#{}]", ordinal));
        }
        println!("{}", line);
    }
}

fn print_screen(wizard: &Wizard) {
    let guide = wizard.guide();
    let stages: Vec<String> = guide
        .stages()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let label = s.label(guide);
            if i == wizard.controller().stage_index() {
                format!("[{}]", label)
            } else {
                label
            }
        })
        .collect();
    println!();
    println!("{} guide: {}", guide, stages.join(" > "));
    if let Some(root) = wizard.root() {
        println!("root: {} ({})", root.label(), root.entity_ref());
    }

    let screen = wizard.screen();
    println!("{} under {}", screen.kind().label(), screen.parent().label());
    if !screen.search_text().is_empty() {
        println!("search: {}", screen.search_text());
    }
    if let Some(row) = screen.status_row() {
        println!("  {}", row);
    }
    for (index, row) in screen.rows().iter().enumerate() {
        let marker = if screen.parent().is_library() {
            ' '
        } else if screen.included(row) {
            '*'
        } else {
            ' '
        };
        let mut line = format!("{} {:>3}. {}", marker, index + 1, row.label());
        if let Some(ordinal) = row.ordinal() {
            line.push_str(&format!(" [#{}]", ordinal));
        }
        println!("{}", line);
    }
    println!("page {}{}", screen.page(), if screen.last_page() { " (last)" } else { "" });
    if let ScreenView::Edit(child) = screen.view() {
        println!("editing: {}", serde_json::to_string(child).unwrap_or_default());
        for error in screen.form_errors() {
            println!("  ! {}", error);
        }
    }
    if let Some(child) = screen.pending_remove() {
        println!("remove {}? (confirm / cancel)", child.label());
    }
    if let Some(error) = screen.adapter().error() {
        println!("  ! {}", error.user_message());
    }
}

const HELP: &str = "\
commands:
  stage <n> | next | prev          change stage
  root <row>                       use a Parent-stage row as root
  story <row>                      drill into a story (Writers stage)
  search <text> | clear            name search
  more | back                      next / previous page
  include <row> | exclude <row>    relationship
  add <name>                       create and include
  set <row> <field> <value>        edit name/notes/ordinal/principal
  remove <row> | confirm | cancel  delete an entity
  summary | expand | quit";

async fn run_guide(wizard: &mut Wizard) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_screen(wizard);
    println!("{}", HELP);

    while let Some(line) = lines.next_line().await? {
        let mut words = line.trim().splitn(2, ' ');
        let command = words.next().unwrap_or_default();
        let rest = words.next().unwrap_or_default().trim();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "next" => {
                wizard.next_stage().await;
            }
            "prev" => {
                wizard.previous_stage().await;
            }
            "stage" => match stage_index(rest, wizard.controller().stage_count()) {
                Ok(index) => {
                    wizard.select_stage(index).await;
                }
                Err(e) => {
                    println!("  ! {}", e);
                    continue;
                }
            },
            "root" => match row(wizard, rest) {
                Some(child) => {
                    if let Err(e) = wizard.select_root(child.id()).await {
                        println!("  ! {}", e);
                    }
                }
                None => println!("  ! no such row"),
            },
            "story" => match row(wizard, rest) {
                Some(child) => {
                    if let Err(e) = wizard.drill_into_story(child.id()).await {
                        println!("  ! {}", e);
                    }
                }
                None => println!("  ! no such row"),
            },
            "search" => wizard.screen_mut().set_search(rest).await,
            "clear" => wizard.screen_mut().set_search("").await,
            "more" => wizard.screen_mut().next_page().await,
            "back" => wizard.screen_mut().previous_page().await,
            "include" | "exclude" => match row(wizard, rest) {
                Some(child) => {
                    let outcome = if command == "include" {
                        wizard.screen_mut().include(&child).await
                    } else {
                        wizard.screen_mut().exclude(&child).await
                    };
                    wizard.apply(outcome).await;
                }
                None => println!("  ! no such row"),
            },
            "add" => {
                wizard.screen_mut().begin_add();
                if let ScreenView::Edit(mut child) = wizard.screen().view().clone() {
                    if let Err(e) = set_field(&mut child, "name", rest) {
                        println!("  ! {}", e);
                        wizard.screen_mut().cancel_edit();
                    } else {
                        let outcome = wizard.screen_mut().save(child).await;
                        wizard.apply(outcome).await;
                    }
                }
            }
            "set" => {
                let mut parts = rest.splitn(3, ' ');
                let target = parts.next().unwrap_or_default();
                let field = parts.next().unwrap_or_default();
                let value = parts.next().unwrap_or_default();
                match row(wizard, target) {
                    Some(mut child) => match set_field(&mut child, field, value) {
                        Ok(()) => {
                            wizard.screen_mut().begin_edit(child.clone());
                            let outcome = wizard.screen_mut().save(child).await;
                            wizard.apply(outcome).await;
                        }
                        Err(e) => println!("  ! {}", e),
                    },
                    None => println!("  ! no such row"),
                }
            }
            "remove" => match row(wizard, rest) {
                Some(child) => wizard.screen_mut().request_remove(child),
                None => println!("  ! no such row"),
            },
            "confirm" => {
                let outcome = wizard.screen_mut().confirm_remove().await;
                wizard.apply(outcome).await;
            }
            "cancel" => {
                wizard.screen_mut().cancel_remove();
                wizard.screen_mut().cancel_edit();
            }
            "summary" | "expand" => {
                if command == "expand" {
                    wizard.toggle_summary();
                }
                match wizard.summary() {
                    Some(summary) => summary.lines().iter().for_each(|l| println!("{}", l)),
                    None => println!("  no root selected"),
                }
                continue;
            }
            other => {
                println!("  ! unknown command '{}' (try help)", other);
                continue;
            }
        }
        print_screen(wizard);
    }
    Ok(())
}

/// One-relative stage number typed by the user to a stage index
fn stage_index(value: &str, count: usize) -> anyhow::Result<usize> {
    let number: usize = value
        .trim()
        .parse()
        .with_context(|| format!("stage number expected, got '{}'", value.trim()))?;
    if number == 0 || number > count {
        bail!("stage number must be between 1 and {}", count);
    }
    Ok(number - 1)
}

fn row(wizard: &Wizard, index: &str) -> Option<Child> {
    let index: usize = index.trim().parse().ok()?;
    wizard.screen().rows().get(index.checked_sub(1)?).cloned()
}

fn set_field(child: &mut Child, field: &str, value: &str) -> anyhow::Result<()> {
    let value = value.trim();
    match (child, field) {
        (Child::Author(a), "name") => match value.rsplit_once(' ') {
            Some((first, last)) => {
                a.first_name = Some(first.to_string());
                a.last_name = last.to_string();
            }
            None => {
                a.first_name = None;
                a.last_name = value.to_string();
            }
        },
        (Child::Series(s), "name") => s.name = value.to_string(),
        (Child::Story(s), "name") => s.name = value.to_string(),
        (Child::Volume(v), "name") => v.name = value.to_string(),
        (Child::Author(a), "notes") => a.notes = Some(value.to_string()),
        (Child::Series(s), "notes") => s.notes = Some(value.to_string()),
        (Child::Story(s), "notes") => s.notes = Some(value.to_string()),
        (Child::Volume(v), "notes") => v.notes = Some(value.to_string()),
        (Child::Author(a), "principal") => {
            a.principal = Some(value.parse().context("principal is true or false")?)
        }
        (Child::Story(s), "ordinal") => s.ordinal = Some(value.parse().context("ordinal is a number")?),
        (_, field) => bail!("cannot set '{}' here", field),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_index_rejects_bad_input() {
        assert_eq!(stage_index("2", 4).unwrap(), 1);
        assert_eq!(stage_index(" 4 ", 4).unwrap(), 3);
        assert!(stage_index("x", 4).is_err());
        assert!(stage_index("", 4).is_err());
        assert!(stage_index("0", 4).is_err());
        assert!(stage_index("5", 4).is_err());
    }

    #[test]
    fn test_set_field_errors_do_not_touch_entity() {
        let mut child = Child::from(library_guide::models::Story::new("Tale"));
        assert!(set_field(&mut child, "ordinal", "three").is_err());
        assert_eq!(child.ordinal(), None);
        assert!(set_field(&mut child, "principal", "true").is_err());
        set_field(&mut child, "ordinal", "3").unwrap();
        assert_eq!(child.ordinal(), Some(3));
    }
}
