use formbuilder::core::broker::{AuditAction, AuditEntity, AuditEvent, AuditSink};
use formbuilder::core::error::FormsError;
use formbuilder::core::store::Store;
use formbuilder::forms::markdown::{MarkdownError, MarkdownValidation, MarkdownValidator};
use formbuilder::forms::model::RouteTarget;
use formbuilder::forms::page::PageFields;
use formbuilder::forms::repository::{FormPatch, FormsRepository};
use formbuilder::forms::status::TaskStatus;
use rusqlite::{Connection, params};
use serde_json::json;
use std::collections::BTreeSet;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn open(dir: &std::path::Path) -> FormsRepository {
    FormsRepository::open(Store::at(dir.to_path_buf())).unwrap()
}

fn text_page(question: &str) -> PageFields {
    PageFields {
        question_text: question.to_string(),
        answer_type: "text".to_string(),
        ..PageFields::default()
    }
}

fn selection_page(question: &str) -> PageFields {
    PageFields {
        question_text: question.to_string(),
        answer_type: "selection".to_string(),
        answer_settings: Some(json!({
            "only_one_option": "true",
            "selection_options": [{"name": "Yes"}, {"name": "No"}]
        })),
        ..PageFields::default()
    }
}

fn ready_patch() -> FormPatch {
    FormPatch {
        what_happens_next_text: Some("We will contact you within 5 days".into()),
        privacy_policy_url: Some("https://example.gov.uk/privacy".into()),
        support_email: Some("help@example.gov.uk".into()),
        ..FormPatch::default()
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &AuditEvent) -> Result<(), FormsError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[test]
fn form_lifecycle_round_trips_through_sqlite() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());

    // 1. Create
    let form = repo.create_form("Apply for a fishing licence", Some("dept-a")).unwrap();
    assert!(form.id.starts_with("F_"));
    assert_eq!(form.form_slug, "apply-for-a-fishing-licence");
    assert!(form.has_draft_version);
    assert!(!form.has_live_version);

    // 2. Update, then clear a field with a blank value
    let updated = repo
        .update_form(
            &form.id,
            FormPatch {
                name: Some("Renew a fishing licence".into()),
                support_phone: Some("0300 123 4567".into()),
                ..FormPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.form_slug, "renew-a-fishing-licence");
    let cleared = repo
        .update_form(
            &form.id,
            FormPatch {
                support_phone: Some(String::new()),
                ..FormPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.support_phone, None);

    // 3. Reload
    let loaded = repo.get_form(&form.id).unwrap();
    assert_eq!(loaded.name, "Renew a fishing licence");
    assert_eq!(loaded.org.as_deref(), Some("dept-a"));

    // 4. Delete
    repo.delete_form(&form.id).unwrap();
    assert!(matches!(repo.get_form(&form.id), Err(FormsError::NotFound(_))));
    assert!(matches!(repo.delete_form(&form.id), Err(FormsError::NotFound(_))));
}

#[test]
fn blank_form_name_is_rejected() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    match repo.create_form("   ", None) {
        Err(FormsError::InvalidFields(errors)) => {
            assert_eq!(errors.messages("name"), ["can't be blank"])
        }
        other => panic!("expected invalid fields, got {:?}", other),
    }
}

#[test]
fn list_forms_filters_by_org() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    repo.create_form("One", Some("dept-a")).unwrap();
    repo.create_form("Two", Some("dept-b")).unwrap();
    repo.create_form("Three", Some("dept-a")).unwrap();

    let all = repo.list_forms(None).unwrap();
    assert_eq!(all.len(), 3);
    let dept_a: Vec<String> = repo
        .list_forms(Some("dept-a"))
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(dept_a, vec!["One", "Three"]);
}

#[test]
fn invalid_page_is_not_persisted() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Form", None).unwrap();

    let err = repo
        .add_page(
            &form.id,
            PageFields {
                question_text: String::new(),
                answer_type: "checkbox".into(),
                page_heading: Some("Heading".into()),
                ..PageFields::default()
            },
        )
        .unwrap_err();
    let FormsError::InvalidFields(errors) = err else {
        panic!("expected invalid fields");
    };
    assert!(errors.has("question_text"));
    assert!(errors.has("answer_type"));
    assert!(errors.has("guidance_markdown"));
    assert!(repo.page_views(&form.id).unwrap().is_empty());
}

#[test]
fn deleting_check_page_removes_condition_and_target_page_nulls_it() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("forms.db");
    let repo = open(tmp.path());
    let form = repo.create_form("Routing", None).unwrap();
    let p1 = repo.add_page(&form.id, selection_page("Licence?")).unwrap();
    let p2 = repo.add_page(&form.id, selection_page("Boat?")).unwrap();
    let p3 = repo.add_page(&form.id, text_page("Licence number")).unwrap();

    let on_p2 = repo
        .add_condition(&p2.id, "Yes", RouteTarget::Page(p3.id.clone()))
        .unwrap();
    let on_p1 = repo
        .add_condition(&p1.id, "No", RouteTarget::Page(p3.id.clone()))
        .unwrap();

    // Deleting the check page destroys its condition.
    repo.delete_page(&p2.id).unwrap();
    let conn = Connection::open(&db).unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM conditions WHERE id = ?1", params![on_p2.id], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 0);

    // Deleting the goto page keeps the record with the reference cleared.
    repo.delete_page(&p3.id).unwrap();
    let (goto, answer): (Option<String>, String) = conn
        .query_row(
            "SELECT goto_page_id, answer_value FROM conditions WHERE id = ?1",
            params![on_p1.id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(goto, None);
    assert_eq!(answer, "No");

    let view = repo.page_view(&p1.id).unwrap();
    assert!(view.has_routing_errors);
    assert_eq!(view.page.position, 1);
    assert_eq!(view.next_page, None);
}

#[test]
fn deleting_a_page_compacts_positions_and_reopens_pages_section() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Compact", None).unwrap();
    let ids: Vec<String> = ["A", "B", "C", "D"]
        .iter()
        .map(|q| repo.add_page(&form.id, text_page(q)).unwrap().id)
        .collect();
    repo.mark_pages_completed(&form.id, true).unwrap();

    repo.delete_page(&ids[1]).unwrap();

    let positions: Vec<(String, u32)> = repo
        .page_views(&form.id)
        .unwrap()
        .into_iter()
        .map(|v| (v.page.id, v.page.position))
        .collect();
    assert_eq!(
        positions,
        vec![(ids[0].clone(), 1), (ids[2].clone(), 2), (ids[3].clone(), 3)]
    );
    assert!(!repo.get_form(&form.id).unwrap().question_section_completed);
}

#[test]
fn changing_answer_type_away_from_selection_purges_conditions() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Purge", None).unwrap();
    let check = repo.add_page(&form.id, selection_page("Licence?")).unwrap();
    let target = repo.add_page(&form.id, text_page("Number")).unwrap();
    repo.add_condition(&check.id, "Yes", RouteTarget::Page(target.id.clone()))
        .unwrap();
    repo.mark_pages_completed(&form.id, true).unwrap();

    let save = repo.update_page(&check.id, text_page("Licence?")).unwrap();
    assert!(save.changed);
    assert_eq!(save.destroyed_conditions.len(), 1);
    assert!(repo.list_conditions(&form.id).unwrap().is_empty());
    assert!(!repo.get_form(&form.id).unwrap().question_section_completed);
}

#[test]
fn unchanged_update_keeps_completion_flag() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Same", None).unwrap();
    let page = repo.add_page(&form.id, text_page("Name")).unwrap();
    repo.mark_pages_completed(&form.id, true).unwrap();

    let save = repo.update_page(&page.id, text_page("Name")).unwrap();
    assert!(!save.changed);
    assert!(repo.get_form(&form.id).unwrap().question_section_completed);
}

#[test]
fn failed_condition_add_leaves_no_trace() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Atomic", None).unwrap();
    let page = repo.add_page(&form.id, selection_page("Q")).unwrap();
    let before = repo.get_form(&form.id).unwrap();

    let err = repo
        .add_condition(&page.id, "Yes", RouteTarget::Page("P_missing".into()))
        .unwrap_err();
    assert!(matches!(err, FormsError::NotFound(_)));
    assert!(repo.list_conditions(&form.id).unwrap().is_empty());
    assert_eq!(repo.get_form(&form.id).unwrap().updated_at, before.updated_at);
}

#[test]
fn condition_update_and_delete() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Edit routes", None).unwrap();
    let p1 = repo.add_page(&form.id, selection_page("Q1")).unwrap();
    let p2 = repo.add_page(&form.id, text_page("Q2")).unwrap();

    let condition = repo.add_condition(&p1.id, "Yes", RouteTarget::SkipToEnd).unwrap();
    assert!(condition.skip_to_end);
    assert_eq!(condition.routing_page_id.as_deref(), Some(p1.id.as_str()));

    let updated = repo
        .update_condition(&condition.id, Some("No"), Some(RouteTarget::Page(p2.id.clone())))
        .unwrap();
    assert_eq!(updated.answer_value, "No");
    assert_eq!(updated.goto_page_id.as_deref(), Some(p2.id.as_str()));
    assert!(!updated.skip_to_end);

    repo.delete_condition(&condition.id).unwrap();
    assert!(matches!(
        repo.delete_condition(&condition.id),
        Err(FormsError::NotFound(_))
    ));
}

#[test]
fn make_live_snapshots_and_clears_draft() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Publish me", None).unwrap();

    match repo.make_live(&form.id) {
        Err(FormsError::PublishBlocked(missing)) => assert_eq!(missing.len(), 4),
        other => panic!("expected publish to be blocked, got {:?}", other),
    }

    repo.add_page(&form.id, text_page("Name")).unwrap();
    repo.update_form(&form.id, ready_patch()).unwrap();
    repo.mark_pages_completed(&form.id, true).unwrap();
    assert_eq!(
        repo.task_statuses(&form.id).unwrap().make_live_status,
        TaskStatus::NotStarted
    );

    let made = repo.make_live(&form.id).unwrap();
    assert!(made.id.starts_with("L_"));
    assert_eq!(made.content_hash.len(), 64);

    let form = repo.get_form(&form.id).unwrap();
    assert!(form.has_live_version);
    assert!(!form.has_draft_version);
    assert_eq!(
        repo.task_statuses(&form.id).unwrap().make_live_status,
        TaskStatus::Completed
    );

    let live = repo.live_form(&form.id).unwrap().unwrap();
    assert_eq!(live.pages.len(), 1);
    assert_eq!(live.form.name, "Publish me");

    // Nothing new to publish until the draft changes again.
    assert!(matches!(
        repo.make_live(&form.id),
        Err(FormsError::ValidationError(_))
    ));

    repo.add_page(&form.id, text_page("Email")).unwrap();
    let form = repo.get_form(&form.id).unwrap();
    assert!(form.has_draft_version);
    assert!(form.has_live_version);
    assert_eq!(
        repo.task_statuses(&form.id).unwrap().make_live_status,
        TaskStatus::CannotStart
    );
}

#[test]
fn backward_route_is_reported_but_does_not_block_publication() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Loop", None).unwrap();
    let p1 = repo.add_page(&form.id, selection_page("Q1")).unwrap();
    let p2 = repo.add_page(&form.id, text_page("Q2")).unwrap();
    repo.add_condition(&p2.id, "x", RouteTarget::Page(p1.id.clone()))
        .unwrap();
    repo.update_form(&form.id, ready_patch()).unwrap();
    repo.mark_pages_completed(&form.id, true).unwrap();

    let view = repo.page_view(&p2.id).unwrap();
    assert!(view.has_routing_errors);
    assert!(repo.form_view(&form.id).unwrap().has_routing_errors);
    assert_eq!(
        repo.task_statuses(&form.id).unwrap().pages_status,
        TaskStatus::Completed
    );
    assert!(repo.missing_sections(&form.id).unwrap().is_empty());

    let live = repo.make_live(&form.id).unwrap();
    assert_eq!(live.form_id, form.id);
}

#[test]
fn audit_sink_hears_committed_mutations_only() {
    let tmp = tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let repo = open(tmp.path()).with_audit(sink.clone());

    let form = repo.create_form("Audited", None).unwrap();
    let page = repo.add_page(&form.id, text_page("Q")).unwrap();
    let _ = repo.add_page(&form.id, text_page(""));
    repo.delete_page(&page.id).unwrap();

    let events = sink.events.lock().unwrap();
    let seen: Vec<(AuditEntity, AuditAction)> = events.iter().map(|e| (e.entity, e.event)).collect();
    assert_eq!(
        seen,
        vec![
            (AuditEntity::Form, AuditAction::Create),
            (AuditEntity::Page, AuditAction::Create),
            (AuditEntity::Page, AuditAction::Delete),
        ]
    );
    assert!(events.iter().all(|e| e.form_id == form.id));
}

#[test]
fn moving_a_page_onto_itself_is_silent() {
    let tmp = tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let repo = open(tmp.path()).with_audit(sink.clone());

    let form = repo.create_form("Moves", None).unwrap();
    let first = repo.add_page(&form.id, text_page("Q1")).unwrap();
    repo.add_page(&form.id, text_page("Q2")).unwrap();
    repo.mark_pages_completed(&form.id, true).unwrap();
    let before = sink.events.lock().unwrap().len();

    repo.move_page(&first.id, 1).unwrap();
    assert_eq!(sink.events.lock().unwrap().len(), before);
    assert!(repo.get_form(&form.id).unwrap().question_section_completed);

    repo.move_page(&first.id, 2).unwrap();
    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), before + 1);
    assert_eq!(events[before].op, "page.move");
    assert_eq!(events[before].event, AuditAction::Update);
}

/// Caps guidance at a handful of characters.
struct ShortGuidance;

impl MarkdownValidator for ShortGuidance {
    fn validate(&self, text: &str) -> MarkdownValidation {
        let mut errors = BTreeSet::new();
        if text.chars().count() > self.max_length() {
            errors.insert(MarkdownError::TooLong);
        }
        MarkdownValidation { errors }
    }

    fn max_length(&self) -> usize {
        20
    }
}

#[test]
fn pluggable_markdown_validator_drives_page_validation() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path()).with_markdown_validator(Box::new(ShortGuidance));
    let form = repo.create_form("Guidance", None).unwrap();

    let err = repo
        .add_page(
            &form.id,
            PageFields {
                page_heading: Some("Before you start".into()),
                guidance_markdown: Some("Have your passport to hand.".into()),
                ..text_page("Passport number")
            },
        )
        .unwrap_err();
    let FormsError::InvalidFields(errors) = err else {
        panic!("expected invalid fields");
    };
    assert_eq!(
        errors.messages("guidance_markdown"),
        ["is too long (maximum is 20 characters)"]
    );
    assert!(repo.page_views(&form.id).unwrap().is_empty());
}

#[test]
fn default_store_writes_jsonl_audit_log() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Logged", None).unwrap();
    repo.mark_declaration_completed(&form.id, true).unwrap();

    let log = fs::read_to_string(repo.store().audit_log_path()).unwrap();
    let lines: Vec<serde_json::Value> = log
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["op"], "form.create");
    assert_eq!(lines[1]["op"], "form.complete_declaration");
    assert_eq!(lines[1]["event"], "update");
}

#[test]
fn deleting_form_cascades_everything() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("forms.db");
    let repo = open(tmp.path());
    let form = repo.create_form("Cascade", None).unwrap();
    let p1 = repo.add_page(&form.id, selection_page("Q1")).unwrap();
    repo.add_condition(&p1.id, "Yes", RouteTarget::SkipToEnd).unwrap();

    repo.delete_form(&form.id).unwrap();

    let conn = Connection::open(&db).unwrap();
    for table in ["pages", "conditions", "made_live_forms"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0, "{} should be empty", table);
    }
}
