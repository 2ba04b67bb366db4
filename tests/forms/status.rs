use formbuilder::core::store::Store;
use formbuilder::forms::page::PageFields;
use formbuilder::forms::repository::{FormPatch, FormsRepository};
use formbuilder::forms::status::{MissingSection, TaskStatus};
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

#[test]
fn empty_form_reports_all_mandatory_sections_missing() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Empty", None).unwrap();

    assert_eq!(
        repo.missing_sections(&form.id).unwrap(),
        vec![
            MissingSection::MissingPages,
            MissingSection::MissingWhatHappensNext,
            MissingSection::MissingPrivacyPolicyUrl,
            MissingSection::MissingContactDetails,
        ]
    );

    let statuses = repo.task_statuses(&form.id).unwrap();
    assert_eq!(statuses.name_status, TaskStatus::Completed);
    assert_eq!(statuses.pages_status, TaskStatus::NotStarted);
    assert_eq!(statuses.declaration_status, TaskStatus::NotStarted);
    assert_eq!(statuses.make_live_status, TaskStatus::CannotStart);
}

#[test]
fn pages_section_moves_through_all_states() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Pages", None).unwrap();
    let pages_status = || repo.task_statuses(&form.id).unwrap().pages_status;

    assert_eq!(pages_status(), TaskStatus::NotStarted);
    let page = repo.add_page(&form.id, text_page("Name")).unwrap();
    assert_eq!(pages_status(), TaskStatus::InProgress);
    repo.mark_pages_completed(&form.id, true).unwrap();
    assert_eq!(pages_status(), TaskStatus::Completed);

    // Editing a page reopens the section.
    repo.update_page(&page.id, text_page("Full name")).unwrap();
    assert_eq!(pages_status(), TaskStatus::InProgress);

    repo.mark_pages_completed(&form.id, true).unwrap();
    repo.delete_page(&page.id).unwrap();
    assert_eq!(pages_status(), TaskStatus::NotStarted);
}

#[test]
fn declaration_section_tracks_text_and_flag() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Declaration", None).unwrap();
    let declaration = || repo.task_statuses(&form.id).unwrap().declaration_status;

    repo.update_form(
        &form.id,
        FormPatch {
            declaration_text: Some("I confirm the above is true".into()),
            ..FormPatch::default()
        },
    )
    .unwrap();
    assert_eq!(declaration(), TaskStatus::InProgress);
    repo.mark_declaration_completed(&form.id, true).unwrap();
    assert_eq!(declaration(), TaskStatus::Completed);
    repo.mark_declaration_completed(&form.id, false).unwrap();
    assert_eq!(declaration(), TaskStatus::InProgress);
}

#[test]
fn support_contact_accepts_any_complete_channel() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Support", None).unwrap();
    let support = || repo.task_statuses(&form.id).unwrap().support_contact_details_status;

    repo.update_form(
        &form.id,
        FormPatch {
            support_url: Some("https://example.gov.uk/help".into()),
            ..FormPatch::default()
        },
    )
    .unwrap();
    assert_eq!(support(), TaskStatus::NotStarted);

    repo.update_form(
        &form.id,
        FormPatch {
            support_url_text: Some("Contact us".into()),
            ..FormPatch::default()
        },
    )
    .unwrap();
    assert_eq!(support(), TaskStatus::Completed);
    assert!(
        !repo
            .missing_sections(&form.id)
            .unwrap()
            .contains(&MissingSection::MissingContactDetails)
    );
}

#[test]
fn declaration_does_not_gate_make_live() {
    let tmp = tempdir().unwrap();
    let repo = open(tmp.path());
    let form = repo.create_form("Ready", None).unwrap();
    repo.add_page(&form.id, text_page("Name")).unwrap();
    repo.update_form(
        &form.id,
        FormPatch {
            what_happens_next_text: Some("We'll be in touch".into()),
            privacy_policy_url: Some("https://example.gov.uk/privacy".into()),
            support_phone: Some("0300 123 4567".into()),
            ..FormPatch::default()
        },
    )
    .unwrap();
    assert_eq!(
        repo.task_statuses(&form.id).unwrap().make_live_status,
        TaskStatus::CannotStart
    );

    repo.mark_pages_completed(&form.id, true).unwrap();
    let statuses = repo.task_statuses(&form.id).unwrap();
    assert_eq!(statuses.declaration_status, TaskStatus::NotStarted);
    assert_eq!(statuses.make_live_status, TaskStatus::NotStarted);
    assert!(repo.missing_sections(&form.id).unwrap().is_empty());
}
