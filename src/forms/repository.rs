//! SQLite persistence for forms, pages and conditions.
//!
//! Each mutation loads the form's graph inside one transaction, applies the
//! change in memory, writes back exactly the rows that changed and commits.
//! The audit sink hears about it only after the commit.

use crate::core::broker::{AuditAction, AuditEntity, AuditSink, DbBroker};
use crate::core::db;
use crate::core::error::{FormsError, ValidationErrors};
use crate::core::store::Store;
use crate::core::time;
use crate::forms::conditions::ConditionGraph;
use crate::forms::graph::FormGraph;
use crate::forms::markdown::{GuidanceMarkdown, MarkdownValidator};
use crate::forms::model::{AnswerType, Condition, Form, Page, RouteTarget, blank_to_none};
use crate::forms::page::{PageFields, PageSave};
use crate::forms::page_order::PageOrder;
use crate::forms::status::{CompletionStatus, MissingSection, TaskStatuses};
use crate::forms::view::{FormView, PageView};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

const FORM_COLUMNS: &str = "id, name, form_slug, org, submission_email, privacy_policy_url,
    what_happens_next_text, support_email, support_phone, support_url, support_url_text,
    declaration_text, question_section_completed, declaration_section_completed,
    has_draft_version, created_at, updated_at,
    EXISTS(SELECT 1 FROM made_live_forms m WHERE m.form_id = forms.id) AS has_live_version";

const PAGE_COLUMNS: &str = "id, form_id, position, question_text, hint_text, answer_type,
    answer_settings, is_optional, page_heading, guidance_markdown";

const CONDITION_COLUMNS: &str =
    "id, form_id, check_page_id, routing_page_id, goto_page_id, answer_value, skip_to_end";

/// Partial update of a form's own fields. `None` leaves a field alone; a blank
/// string clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormPatch {
    pub name: Option<String>,
    pub org: Option<String>,
    pub submission_email: Option<String>,
    pub privacy_policy_url: Option<String>,
    pub what_happens_next_text: Option<String>,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub support_url: Option<String>,
    pub support_url_text: Option<String>,
    pub declaration_text: Option<String>,
}

impl FormPatch {
    pub fn is_empty(&self) -> bool {
        *self == FormPatch::default()
    }

    fn apply(self, form: &mut Form) -> Result<(), ValidationErrors> {
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                let mut errors = ValidationErrors::new();
                errors.add("name", "can't be blank");
                return Err(errors);
            }
            form.rename(name);
        }

        let fields = [
            (self.org, &mut form.org),
            (self.submission_email, &mut form.submission_email),
            (self.privacy_policy_url, &mut form.privacy_policy_url),
            (self.what_happens_next_text, &mut form.what_happens_next_text),
            (self.support_email, &mut form.support_email),
            (self.support_phone, &mut form.support_phone),
            (self.support_url, &mut form.support_url),
            (self.support_url_text, &mut form.support_url_text),
            (self.declaration_text, &mut form.declaration_text),
        ];
        for (value, slot) in fields {
            if value.is_some() {
                *slot = blank_to_none(value);
            }
        }
        Ok(())
    }
}

/// Row written when a form goes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MadeLiveForm {
    pub id: String,
    pub form_id: String,
    pub content_hash: String,
    pub created_at: String,
}

pub struct FormsRepository {
    store: Store,
    broker: DbBroker,
    markdown: Box<dyn MarkdownValidator>,
}

impl FormsRepository {
    /// Open the store, creating the database and schema if needed.
    pub fn open(store: Store) -> Result<Self, FormsError> {
        db::initialize_forms_db(&store)?;
        Ok(Self {
            broker: DbBroker::new(&store),
            store,
            markdown: Box::new(GuidanceMarkdown::default()),
        })
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.broker = self.broker.with_audit(audit);
        self
    }

    pub fn with_markdown_validator(mut self, markdown: Box<dyn MarkdownValidator>) -> Self {
        self.markdown = markdown;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn db_path(&self) -> PathBuf {
        db::forms_db_path(&self.store)
    }

    // --- forms ---

    pub fn create_form(&self, name: &str, org: Option<&str>) -> Result<Form, FormsError> {
        if name.trim().is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("name", "can't be blank");
            return Err(errors.into());
        }

        let now = time::now_epoch_z();
        let mut form = Form::new(time::new_id("F"), name.to_string(), &now);
        form.org = org.map(str::to_string).and_then(|o| blank_to_none(Some(o)));

        self.broker.with_tx(&self.db_path(), "form.create", |conn| {
            conn.execute(
                "INSERT INTO forms(id, name, form_slug, org, created_at, updated_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
                params![form.id, form.name, form.form_slug, form.org, now, now],
            )?;
            Ok(())
        })?;

        tracing::info!(form_id = %form.id, slug = %form.form_slug, "form created");
        self.broker
            .notify("form.create", AuditEntity::Form, &form.id, &form.id, AuditAction::Create);
        Ok(form)
    }

    pub fn get_form(&self, form_id: &str) -> Result<Form, FormsError> {
        self.broker
            .with_conn(&self.db_path(), "form.get", |conn| load_form(conn, form_id))
    }

    /// All forms, oldest first, optionally only those belonging to `org`.
    pub fn list_forms(&self, org: Option<&str>) -> Result<Vec<Form>, FormsError> {
        self.broker.with_conn(&self.db_path(), "form.list", |conn| {
            let sql = format!(
                "SELECT {} FROM forms WHERE (?1 IS NULL OR org = ?1) ORDER BY rowid",
                FORM_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![org], form_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn update_form(&self, form_id: &str, patch: FormPatch) -> Result<Form, FormsError> {
        let form = self.broker.with_tx(&self.db_path(), "form.update", |conn| {
            let mut form = load_form(conn, form_id)?;
            patch.apply(&mut form)?;
            save_form(conn, &mut form)?;
            Ok(form)
        })?;

        tracing::info!(form_id, "form updated");
        self.broker
            .notify("form.update", AuditEntity::Form, form_id, form_id, AuditAction::Update);
        Ok(form)
    }

    /// Delete a form with all of its pages, conditions and live snapshots.
    pub fn delete_form(&self, form_id: &str) -> Result<(), FormsError> {
        self.broker.with_tx(&self.db_path(), "form.delete", |conn| {
            let deleted = conn.execute("DELETE FROM forms WHERE id = ?1", params![form_id])?;
            if deleted == 0 {
                return Err(FormsError::NotFound(format!("form {}", form_id)));
            }
            Ok(())
        })?;

        tracing::info!(form_id, "form deleted");
        self.broker
            .notify("form.delete", AuditEntity::Form, form_id, form_id, AuditAction::Delete);
        Ok(())
    }

    pub fn mark_pages_completed(&self, form_id: &str, completed: bool) -> Result<Form, FormsError> {
        self.set_form_flag(form_id, "form.complete_pages", |form| {
            form.question_section_completed = completed
        })
    }

    pub fn mark_declaration_completed(
        &self,
        form_id: &str,
        completed: bool,
    ) -> Result<Form, FormsError> {
        self.set_form_flag(form_id, "form.complete_declaration", |form| {
            form.declaration_section_completed = completed
        })
    }

    fn set_form_flag<F>(&self, form_id: &str, op: &str, set: F) -> Result<Form, FormsError>
    where
        F: FnOnce(&mut Form),
    {
        let form = self.broker.with_tx(&self.db_path(), op, |conn| {
            let mut form = load_form(conn, form_id)?;
            set(&mut form);
            save_form(conn, &mut form)?;
            Ok(form)
        })?;

        tracing::info!(
            form_id,
            op,
            question_section_completed = form.question_section_completed,
            declaration_section_completed = form.declaration_section_completed,
            "form section flag set"
        );
        self.broker
            .notify(op, AuditEntity::Form, form_id, form_id, AuditAction::Update);
        Ok(form)
    }

    /// The form with its pages in position order and all of its conditions.
    pub fn load_graph(&self, form_id: &str) -> Result<FormGraph, FormsError> {
        self.broker
            .with_conn(&self.db_path(), "form.graph", |conn| load_graph(conn, form_id))
    }

    // --- pages ---

    pub fn add_page(&self, form_id: &str, fields: PageFields) -> Result<Page, FormsError> {
        let save = self.broker.with_tx(&self.db_path(), "page.create", |conn| {
            let mut graph = load_graph(conn, form_id)?;
            let save = graph.create_page(fields, self.markdown.as_ref())?;
            let now = time::now_epoch_z();
            insert_page_row(conn, &save.page, &now)?;
            save_form(conn, &mut graph.form)?;
            Ok(save)
        })?;

        tracing::info!(form_id, page_id = %save.page.id, position = save.page.position, "page created");
        self.broker
            .notify("page.create", AuditEntity::Page, &save.page.id, form_id, AuditAction::Create);
        Ok(save.page)
    }

    pub fn get_page(&self, page_id: &str) -> Result<Page, FormsError> {
        self.broker.with_conn(&self.db_path(), "page.get", |conn| {
            let sql = format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS);
            conn.query_row(&sql, params![page_id], page_from_row)
                .optional()?
                .ok_or_else(|| FormsError::NotFound(format!("page {}", page_id)))
        })
    }

    /// Replace a page's fields. Saving identical fields writes nothing.
    pub fn update_page(&self, page_id: &str, fields: PageFields) -> Result<PageSave, FormsError> {
        let save = self.broker.with_tx(&self.db_path(), "page.update", |conn| {
            let form_id = form_id_for_page(conn, page_id)?;
            let mut graph = load_graph(conn, &form_id)?;
            let save = graph.save_page(page_id, fields, self.markdown.as_ref())?;
            if save.changed {
                let now = time::now_epoch_z();
                update_page_row(conn, &save.page, &now)?;
                for condition in &save.destroyed_conditions {
                    delete_condition_row(conn, &condition.id)?;
                }
                save_form(conn, &mut graph.form)?;
            }
            Ok(save)
        })?;

        if save.changed {
            tracing::info!(
                form_id = %save.page.form_id,
                page_id,
                destroyed = save.destroyed_conditions.len(),
                "page updated"
            );
            self.broker.notify(
                "page.update",
                AuditEntity::Page,
                page_id,
                &save.page.form_id,
                AuditAction::Update,
            );
            for condition in &save.destroyed_conditions {
                self.broker.notify(
                    "condition.delete",
                    AuditEntity::Condition,
                    &condition.id,
                    &condition.form_id,
                    AuditAction::Delete,
                );
            }
        }
        Ok(save)
    }

    /// Move a page to `new_position`, renumbering every page in between.
    pub fn move_page(&self, page_id: &str, new_position: u32) -> Result<Vec<Page>, FormsError> {
        let (form_id, moved, pages) = self.broker.with_tx(&self.db_path(), "page.move", |conn| {
            let form_id = form_id_for_page(conn, page_id)?;
            let mut graph = load_graph(conn, &form_id)?;
            let changed = graph.move_page(page_id, new_position)?;
            if !changed.is_empty() {
                write_positions(conn, &graph.pages, &changed)?;
                save_form(conn, &mut graph.form)?;
            }
            let pages: Vec<Page> = graph.pages.iter().cloned().collect();
            Ok((form_id, !changed.is_empty(), pages))
        })?;

        if moved {
            tracing::info!(form_id = %form_id, page_id, position = new_position, "page moved");
            self.broker
                .notify("page.move", AuditEntity::Page, page_id, &form_id, AuditAction::Update);
        }
        Ok(pages)
    }

    /// Delete a page. Conditions checked on it go with it; conditions routing
    /// to it keep their record with the reference cleared.
    pub fn delete_page(&self, page_id: &str) -> Result<Page, FormsError> {
        let deletion = self.broker.with_tx(&self.db_path(), "page.delete", |conn| {
            let form_id = form_id_for_page(conn, page_id)?;
            let mut graph = load_graph(conn, &form_id)?;
            let deletion = graph.delete_page(page_id)?;

            for condition in &deletion.detached.destroyed {
                delete_condition_row(conn, &condition.id)?;
            }
            let now = time::now_epoch_z();
            for condition_id in &deletion.detached.nulled {
                if let Some(condition) = graph.conditions.get(condition_id) {
                    update_condition_row(conn, condition, &now)?;
                }
            }
            conn.execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;

            let shifted: Vec<String> = graph
                .pages
                .iter()
                .filter(|p| p.position >= deletion.page.position)
                .map(|p| p.id.clone())
                .collect();
            write_positions(conn, &graph.pages, &shifted)?;
            save_form(conn, &mut graph.form)?;
            Ok(deletion)
        })?;

        let form_id = deletion.page.form_id.as_str();
        tracing::info!(
            form_id,
            page_id,
            destroyed = deletion.detached.destroyed.len(),
            nulled = deletion.detached.nulled.len(),
            "page deleted"
        );
        self.broker
            .notify("page.delete", AuditEntity::Page, page_id, form_id, AuditAction::Delete);
        for condition in &deletion.detached.destroyed {
            self.broker.notify(
                "condition.delete",
                AuditEntity::Condition,
                &condition.id,
                form_id,
                AuditAction::Delete,
            );
        }
        Ok(deletion.page)
    }

    pub fn page_view(&self, page_id: &str) -> Result<PageView, FormsError> {
        self.broker.with_conn(&self.db_path(), "page.view", |conn| {
            let form_id = form_id_for_page(conn, page_id)?;
            let graph = load_graph(conn, &form_id)?;
            graph
                .page_view(page_id)
                .ok_or_else(|| FormsError::NotFound(format!("page {}", page_id)))
        })
    }

    pub fn page_views(&self, form_id: &str) -> Result<Vec<PageView>, FormsError> {
        Ok(self.load_graph(form_id)?.page_views())
    }

    // --- conditions ---

    pub fn add_condition(
        &self,
        check_page_id: &str,
        answer_value: &str,
        target: RouteTarget,
    ) -> Result<Condition, FormsError> {
        let condition = self.broker.with_tx(&self.db_path(), "condition.create", |conn| {
            let form_id = form_id_for_page(conn, check_page_id)?;
            let mut graph = load_graph(conn, &form_id)?;
            let condition = graph
                .conditions
                .add_condition(&graph.pages, check_page_id, answer_value, target)?
                .clone();
            insert_condition_row(conn, &condition, &time::now_epoch_z())?;
            save_form(conn, &mut graph.form)?;
            Ok(condition)
        })?;

        tracing::info!(
            form_id = %condition.form_id,
            condition_id = %condition.id,
            check_page_id,
            "condition created"
        );
        self.broker.notify(
            "condition.create",
            AuditEntity::Condition,
            &condition.id,
            &condition.form_id,
            AuditAction::Create,
        );
        Ok(condition)
    }

    pub fn update_condition(
        &self,
        condition_id: &str,
        answer_value: Option<&str>,
        target: Option<RouteTarget>,
    ) -> Result<Condition, FormsError> {
        let condition = self.broker.with_tx(&self.db_path(), "condition.update", |conn| {
            let form_id = form_id_for_condition(conn, condition_id)?;
            let mut graph = load_graph(conn, &form_id)?;
            let condition = graph
                .conditions
                .update_condition(&graph.pages, condition_id, answer_value, target)?
                .clone();
            update_condition_row(conn, &condition, &time::now_epoch_z())?;
            save_form(conn, &mut graph.form)?;
            Ok(condition)
        })?;

        tracing::info!(form_id = %condition.form_id, condition_id, "condition updated");
        self.broker.notify(
            "condition.update",
            AuditEntity::Condition,
            condition_id,
            &condition.form_id,
            AuditAction::Update,
        );
        Ok(condition)
    }

    pub fn delete_condition(&self, condition_id: &str) -> Result<Condition, FormsError> {
        let condition = self.broker.with_tx(&self.db_path(), "condition.delete", |conn| {
            let form_id = form_id_for_condition(conn, condition_id)?;
            let mut graph = load_graph(conn, &form_id)?;
            let condition = graph.conditions.remove_condition(condition_id)?;
            delete_condition_row(conn, condition_id)?;
            save_form(conn, &mut graph.form)?;
            Ok(condition)
        })?;

        tracing::info!(form_id = %condition.form_id, condition_id, "condition deleted");
        self.broker.notify(
            "condition.delete",
            AuditEntity::Condition,
            condition_id,
            &condition.form_id,
            AuditAction::Delete,
        );
        Ok(condition)
    }

    pub fn list_conditions(&self, form_id: &str) -> Result<Vec<Condition>, FormsError> {
        Ok(self.load_graph(form_id)?.conditions.iter().cloned().collect())
    }

    // --- status and publication ---

    pub fn task_statuses(&self, form_id: &str) -> Result<TaskStatuses, FormsError> {
        let graph = self.load_graph(form_id)?;
        let statuses = CompletionStatus::for_graph(&graph).task_statuses();
        tracing::debug!(form_id, make_live = %statuses.make_live_status, "task statuses");
        Ok(statuses)
    }

    pub fn missing_sections(&self, form_id: &str) -> Result<Vec<MissingSection>, FormsError> {
        let graph = self.load_graph(form_id)?;
        Ok(CompletionStatus::for_graph(&graph).missing_sections())
    }

    pub fn form_view(&self, form_id: &str) -> Result<FormView, FormsError> {
        Ok(self.load_graph(form_id)?.form_view())
    }

    /// Publish the current draft as a new live snapshot.
    pub fn make_live(&self, form_id: &str) -> Result<MadeLiveForm, FormsError> {
        let made = self.broker.with_tx(&self.db_path(), "form.make_live", |conn| {
            let mut graph = load_graph(conn, form_id)?;
            if !graph.form.has_draft_version {
                return Err(FormsError::ValidationError(format!(
                    "form {} has no draft changes to make live",
                    form_id
                )));
            }
            let status = CompletionStatus::for_graph(&graph);
            if !status.can_publish() {
                return Err(FormsError::PublishBlocked(status.missing_sections()));
            }

            let now = time::now_epoch_z();
            graph.form.has_draft_version = false;
            graph.form.has_live_version = true;
            graph.form.updated_at = now.clone();
            conn.execute(
                "UPDATE forms SET has_draft_version = 0, updated_at = ?1 WHERE id = ?2",
                params![now, form_id],
            )?;

            let blob = serde_json::to_string(&graph.form_view())?;
            let made = MadeLiveForm {
                id: time::new_id("L"),
                form_id: form_id.to_string(),
                content_hash: sha256_hex(blob.as_bytes()),
                created_at: now,
            };
            conn.execute(
                "INSERT INTO made_live_forms(id, form_id, json_form_blob, content_hash, created_at)
                 VALUES(?1, ?2, ?3, ?4, ?5)",
                params![made.id, made.form_id, blob, made.content_hash, made.created_at],
            )?;
            Ok(made)
        })?;

        tracing::info!(form_id, live_id = %made.id, hash = %made.content_hash, "form made live");
        self.broker
            .notify("form.make_live", AuditEntity::Form, form_id, form_id, AuditAction::MakeLive);
        Ok(made)
    }

    /// The most recent live snapshot, if the form was ever made live.
    pub fn live_form(&self, form_id: &str) -> Result<Option<FormView>, FormsError> {
        self.broker.with_conn(&self.db_path(), "form.live", |conn| {
            let blob: Option<String> = conn
                .query_row(
                    "SELECT json_form_blob FROM made_live_forms
                     WHERE form_id = ?1 ORDER BY rowid DESC LIMIT 1",
                    params![form_id],
                    |row| row.get(0),
                )
                .optional()?;
            match blob {
                Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
                None => Ok(None),
            }
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// --- row access ---

fn conversion_failure<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn form_from_row(row: &Row<'_>) -> rusqlite::Result<Form> {
    Ok(Form {
        id: row.get(0)?,
        name: row.get(1)?,
        form_slug: row.get(2)?,
        org: row.get(3)?,
        submission_email: row.get(4)?,
        privacy_policy_url: row.get(5)?,
        what_happens_next_text: row.get(6)?,
        support_email: row.get(7)?,
        support_phone: row.get(8)?,
        support_url: row.get(9)?,
        support_url_text: row.get(10)?,
        declaration_text: row.get(11)?,
        question_section_completed: row.get(12)?,
        declaration_section_completed: row.get(13)?,
        has_draft_version: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
        has_live_version: row.get(17)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    let answer_type: String = row.get(5)?;
    let answer_type = answer_type
        .parse::<AnswerType>()
        .map_err(|e| conversion_failure(5, e))?;
    let answer_settings: Option<String> = row.get(6)?;
    let answer_settings = answer_settings
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| conversion_failure(6, e))?;

    Ok(Page {
        id: row.get(0)?,
        form_id: row.get(1)?,
        position: row.get(2)?,
        question_text: row.get(3)?,
        hint_text: row.get(4)?,
        answer_type,
        answer_settings,
        is_optional: row.get(7)?,
        page_heading: row.get(8)?,
        guidance_markdown: row.get(9)?,
    })
}

fn condition_from_row(row: &Row<'_>) -> rusqlite::Result<Condition> {
    Ok(Condition {
        id: row.get(0)?,
        form_id: row.get(1)?,
        check_page_id: row.get(2)?,
        routing_page_id: row.get(3)?,
        goto_page_id: row.get(4)?,
        answer_value: row.get(5)?,
        skip_to_end: row.get(6)?,
    })
}

fn load_form(conn: &Connection, form_id: &str) -> Result<Form, FormsError> {
    let sql = format!("SELECT {} FROM forms WHERE id = ?1", FORM_COLUMNS);
    conn.query_row(&sql, params![form_id], form_from_row)
        .optional()?
        .ok_or_else(|| FormsError::NotFound(format!("form {}", form_id)))
}

fn load_graph(conn: &Connection, form_id: &str) -> Result<FormGraph, FormsError> {
    let form = load_form(conn, form_id)?;

    let sql = format!(
        "SELECT {} FROM pages WHERE form_id = ?1 ORDER BY position",
        PAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let pages = stmt
        .query_map(params![form_id], page_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let sql = format!(
        "SELECT {} FROM conditions WHERE form_id = ?1 ORDER BY rowid",
        CONDITION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let conditions = stmt
        .query_map(params![form_id], condition_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FormGraph {
        form,
        pages: PageOrder::from_pages(pages),
        conditions: ConditionGraph::from_conditions(conditions),
    })
}

fn form_id_for_page(conn: &Connection, page_id: &str) -> Result<String, FormsError> {
    conn.query_row(
        "SELECT form_id FROM pages WHERE id = ?1",
        params![page_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| FormsError::NotFound(format!("page {}", page_id)))
}

fn form_id_for_condition(conn: &Connection, condition_id: &str) -> Result<String, FormsError> {
    conn.query_row(
        "SELECT form_id FROM conditions WHERE id = ?1",
        params![condition_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| FormsError::NotFound(format!("condition {}", condition_id)))
}

/// Write the form's own columns back. Any write marks a pending draft.
fn save_form(conn: &Connection, form: &mut Form) -> Result<(), FormsError> {
    form.has_draft_version = true;
    form.updated_at = time::now_epoch_z();
    conn.execute(
        "UPDATE forms SET name = ?1, form_slug = ?2, org = ?3, submission_email = ?4,
             privacy_policy_url = ?5, what_happens_next_text = ?6, support_email = ?7,
             support_phone = ?8, support_url = ?9, support_url_text = ?10,
             declaration_text = ?11, question_section_completed = ?12,
             declaration_section_completed = ?13, has_draft_version = 1, updated_at = ?14
         WHERE id = ?15",
        params![
            form.name,
            form.form_slug,
            form.org,
            form.submission_email,
            form.privacy_policy_url,
            form.what_happens_next_text,
            form.support_email,
            form.support_phone,
            form.support_url,
            form.support_url_text,
            form.declaration_text,
            form.question_section_completed,
            form.declaration_section_completed,
            form.updated_at,
            form.id,
        ],
    )?;
    Ok(())
}

fn settings_text(page: &Page) -> Result<Option<String>, FormsError> {
    Ok(page
        .answer_settings
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?)
}

fn insert_page_row(conn: &Connection, page: &Page, now: &str) -> Result<(), FormsError> {
    conn.execute(
        "INSERT INTO pages(id, form_id, position, question_text, hint_text, answer_type,
             answer_settings, is_optional, page_heading, guidance_markdown, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            page.id,
            page.form_id,
            page.position,
            page.question_text,
            page.hint_text,
            page.answer_type.as_str(),
            settings_text(page)?,
            page.is_optional,
            page.page_heading,
            page.guidance_markdown,
            now,
        ],
    )?;
    Ok(())
}

fn update_page_row(conn: &Connection, page: &Page, now: &str) -> Result<(), FormsError> {
    conn.execute(
        "UPDATE pages SET question_text = ?1, hint_text = ?2, answer_type = ?3,
             answer_settings = ?4, is_optional = ?5, page_heading = ?6,
             guidance_markdown = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            page.question_text,
            page.hint_text,
            page.answer_type.as_str(),
            settings_text(page)?,
            page.is_optional,
            page.page_heading,
            page.guidance_markdown,
            now,
            page.id,
        ],
    )?;
    Ok(())
}

/// Persist the in-memory positions of `page_ids`.
///
/// Rows are first parked at the negated target so `UNIQUE(form_id, position)`
/// holds after every statement, then flipped positive in one update.
fn write_positions(conn: &Connection, pages: &PageOrder, page_ids: &[String]) -> Result<(), FormsError> {
    let mut form_id = None;
    for page_id in page_ids {
        let Some(page) = pages.get(page_id) else {
            continue;
        };
        conn.execute(
            "UPDATE pages SET position = ?1 WHERE id = ?2",
            params![-i64::from(page.position), page.id],
        )?;
        form_id = Some(page.form_id.as_str());
    }
    if let Some(form_id) = form_id {
        conn.execute(
            "UPDATE pages SET position = -position WHERE form_id = ?1 AND position < 0",
            params![form_id],
        )?;
    }
    Ok(())
}

fn insert_condition_row(conn: &Connection, condition: &Condition, now: &str) -> Result<(), FormsError> {
    conn.execute(
        "INSERT INTO conditions(id, form_id, check_page_id, routing_page_id, goto_page_id,
             answer_value, skip_to_end, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            condition.id,
            condition.form_id,
            condition.check_page_id,
            condition.routing_page_id,
            condition.goto_page_id,
            condition.answer_value,
            condition.skip_to_end,
            now,
        ],
    )?;
    Ok(())
}

fn update_condition_row(conn: &Connection, condition: &Condition, now: &str) -> Result<(), FormsError> {
    conn.execute(
        "UPDATE conditions SET routing_page_id = ?1, goto_page_id = ?2, answer_value = ?3,
             skip_to_end = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            condition.routing_page_id,
            condition.goto_page_id,
            condition.answer_value,
            condition.skip_to_end,
            now,
            condition.id,
        ],
    )?;
    Ok(())
}

fn delete_condition_row(conn: &Connection, condition_id: &str) -> Result<(), FormsError> {
    conn.execute("DELETE FROM conditions WHERE id = ?1", params![condition_id])?;
    Ok(())
}
