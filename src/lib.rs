//! formbuilder: a multi-step form builder core.
//!
//! A form is an ordered sequence of question pages. Pages may carry routing
//! conditions that send the user forward to a later page (or past the end)
//! depending on their answer. The crate keeps page positions dense, reports
//! conditions that dangle or point backwards, and derives a per-section task
//! list that decides whether a draft can be made live.
//!
//! # Architecture
//!
//! - [`forms`]: the engine. `PageOrder` and `ConditionGraph` make up a
//!   `FormGraph`; page saves validate fields and purge stale conditions;
//!   `CompletionStatus` derives section statuses on every read.
//! - [`core`]: SQLite access through `DbBroker` (one transaction per
//!   mutation), the JSONL audit log, schemas, config and errors.
//!
//! All mutations go through `FormsRepository`, which commits first and then
//! notifies the audit sink.
//!
//! # Examples
//!
//! ```bash
//! formbuilder init
//! formbuilder form create --name "Apply for a licence"
//! formbuilder page add F_01J... --question "What is your name?" --answer-type name
//! formbuilder condition add P_01J... --answer-value Yes --goto P_01K...
//! formbuilder status F_01J...
//! ```

pub mod core;
pub mod forms;

mod cli;

use crate::cli::{
    Cli, Command, ConditionCommand, FormCommand, FormFieldArgs, OutputFormat, PageCommand,
    PageFieldArgs, StatusArgs, TargetArgs,
};
use crate::core::config;
use crate::core::error::FormsError;
use crate::core::output;
use crate::core::store::Store;
use crate::forms::conditions::validation_errors;
use crate::forms::model::RouteTarget;
use crate::forms::page::PageFields;
use crate::forms::repository::{FormPatch, FormsRepository};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

fn print_json<T: Serialize>(value: &T) -> Result<(), FormsError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_repository(root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<FormsRepository, FormsError> {
    let project_root = match root {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let config = config::load_config(&project_root, config_path.as_deref())?;
    let store = Store::from_config(&project_root, &config);
    tracing::debug!(root = %store.root.display(), actor = %store.actor, "store resolved");
    FormsRepository::open(store)
}

pub fn run() -> Result<(), FormsError> {
    let cli = Cli::parse();
    let repo = open_repository(cli.root, cli.config)?;

    match cli.command {
        Command::Init => print_json(&serde_json::json!({
            "cmd": "init",
            "status": "ok",
            "root": repo.store().root.to_string_lossy(),
            "db": repo.store().db_path().to_string_lossy(),
        })),
        Command::Form(form_cli) => run_form_command(&repo, form_cli.command),
        Command::Page(page_cli) => run_page_command(&repo, page_cli.command),
        Command::Condition(condition_cli) => run_condition_command(&repo, condition_cli.command),
        Command::Status(args) => run_status(&repo, args),
    }
}

fn run_form_command(repo: &FormsRepository, command: FormCommand) -> Result<(), FormsError> {
    match command {
        FormCommand::Create { name, org } => print_json(&repo.create_form(&name, org.as_deref())?),
        FormCommand::Show { form_id } => print_json(&repo.form_view(&form_id)?),
        FormCommand::List { org } => print_json(&repo.list_forms(org.as_deref())?),
        FormCommand::Update { form_id, fields } => {
            print_json(&repo.update_form(&form_id, form_patch(fields))?)
        }
        FormCommand::Delete { form_id } => {
            repo.delete_form(&form_id)?;
            print_json(&serde_json::json!({ "cmd": "form.delete", "status": "ok", "id": form_id }))
        }
        FormCommand::CompletePages { form_id, incomplete } => {
            print_json(&repo.mark_pages_completed(&form_id, !incomplete)?)
        }
        FormCommand::CompleteDeclaration { form_id, incomplete } => {
            print_json(&repo.mark_declaration_completed(&form_id, !incomplete)?)
        }
        FormCommand::Status(args) => run_status(repo, args),
        FormCommand::MakeLive { form_id } => print_json(&repo.make_live(&form_id)?),
    }
}

fn form_patch(fields: FormFieldArgs) -> FormPatch {
    FormPatch {
        name: fields.name,
        org: fields.org,
        submission_email: fields.submission_email,
        privacy_policy_url: fields.privacy_policy_url,
        what_happens_next_text: fields.what_happens_next,
        support_email: fields.support_email,
        support_phone: fields.support_phone,
        support_url: fields.support_url,
        support_url_text: fields.support_url_text,
        declaration_text: fields.declaration_text,
    }
}

fn run_status(repo: &FormsRepository, args: StatusArgs) -> Result<(), FormsError> {
    let view = repo.form_view(&args.form_id)?;
    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "form_id": view.form.id,
            "task_statuses": view.task_statuses,
            "missing_sections": view.missing_sections,
            "has_routing_errors": view.has_routing_errors,
        })),
        OutputFormat::Text => {
            print!(
                "{}",
                output::render_task_list(&view.form.name, &view.task_statuses, &view.missing_sections)
            );
            Ok(())
        }
    }
}

/// Overlay CLI options on the page's current fields. Empty strings clear.
fn apply_page_args(fields: &mut PageFields, args: PageFieldArgs) -> Result<(), FormsError> {
    if let Some(hint) = args.hint {
        fields.hint_text = Some(hint);
    }
    if let Some(settings) = args.settings {
        fields.answer_settings = if settings.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&settings)?)
        };
    }
    if let Some(optional) = args.optional {
        fields.is_optional = optional;
    }
    if let Some(heading) = args.heading {
        fields.page_heading = Some(heading);
    }
    if let Some(guidance) = args.guidance {
        fields.guidance_markdown = Some(guidance);
    }
    Ok(())
}

fn run_page_command(repo: &FormsRepository, command: PageCommand) -> Result<(), FormsError> {
    match command {
        PageCommand::Add {
            form_id,
            question,
            answer_type,
            fields,
        } => {
            let mut page_fields = PageFields {
                question_text: question,
                answer_type,
                ..PageFields::default()
            };
            apply_page_args(&mut page_fields, fields)?;
            print_json(&repo.add_page(&form_id, page_fields)?)
        }
        PageCommand::Update {
            page_id,
            question,
            answer_type,
            fields,
        } => {
            let current = repo.get_page(&page_id)?;
            let mut page_fields = PageFields::from(&current);
            if let Some(question) = question {
                page_fields.question_text = question;
            }
            if let Some(answer_type) = answer_type {
                page_fields.answer_type = answer_type;
            }
            apply_page_args(&mut page_fields, fields)?;
            let save = repo.update_page(&page_id, page_fields)?;
            print_json(&serde_json::json!({
                "page": save.page,
                "changed": save.changed,
                "destroyed_conditions": save.destroyed_conditions,
            }))
        }
        PageCommand::Move { page_id, position } => print_json(&repo.move_page(&page_id, position)?),
        PageCommand::Delete { page_id } => {
            let page = repo.delete_page(&page_id)?;
            print_json(&serde_json::json!({ "cmd": "page.delete", "status": "ok", "page": page }))
        }
        PageCommand::List { form_id } => print_json(&repo.page_views(&form_id)?),
        PageCommand::Show { page_id } => print_json(&repo.page_view(&page_id)?),
    }
}

fn route_target(target: TargetArgs) -> Option<RouteTarget> {
    match (target.goto, target.skip_to_end) {
        (_, true) => Some(RouteTarget::SkipToEnd),
        (Some(page_id), false) => Some(RouteTarget::Page(page_id)),
        (None, false) => None,
    }
}

fn run_condition_command(repo: &FormsRepository, command: ConditionCommand) -> Result<(), FormsError> {
    match command {
        ConditionCommand::Add {
            check_page_id,
            answer_value,
            target,
        } => {
            let target = route_target(target).ok_or_else(|| {
                FormsError::ValidationError("one of --goto or --skip-to-end is required".into())
            })?;
            print_json(&repo.add_condition(&check_page_id, &answer_value, target)?)
        }
        ConditionCommand::Update {
            condition_id,
            answer_value,
            target,
        } => print_json(&repo.update_condition(
            &condition_id,
            answer_value.as_deref(),
            route_target(target),
        )?),
        ConditionCommand::Delete { condition_id } => {
            let condition = repo.delete_condition(&condition_id)?;
            print_json(&serde_json::json!({
                "cmd": "condition.delete",
                "status": "ok",
                "condition": condition,
            }))
        }
        ConditionCommand::List { form_id } => {
            let graph = repo.load_graph(&form_id)?;
            let listed: Vec<serde_json::Value> = graph
                .conditions
                .iter()
                .map(|condition| {
                    serde_json::json!({
                        "condition": condition,
                        "validation_errors": validation_errors(condition, &graph.pages),
                    })
                })
                .collect();
            print_json(&listed)
        }
    }
}
