use formbuilder::core::error::FormsError;
use formbuilder::core::store::Store;
use formbuilder::forms::conditions::RoutingErrorKind;
use formbuilder::forms::model::RouteTarget;
use formbuilder::forms::page::PageFields;
use formbuilder::forms::repository::FormsRepository;
use serde_json::json;
use tempfile::tempdir;

fn page(question: &str, answer_type: &str) -> PageFields {
    PageFields {
        question_text: question.to_string(),
        answer_type: answer_type.to_string(),
        ..PageFields::default()
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    repo: FormsRepository,
    form_id: String,
    pages: Vec<String>,
}

fn three_page_form() -> Fixture {
    let tmp = tempdir().unwrap();
    let repo = FormsRepository::open(Store::at(tmp.path().to_path_buf())).unwrap();
    let form_id = repo.create_form("Three pages", None).unwrap().id;
    let pages = vec![
        repo.add_page(&form_id, page("Do you have a licence?", "selection")).unwrap().id,
        repo.add_page(&form_id, page("What is your name?", "name")).unwrap().id,
        repo.add_page(&form_id, page("Licence number", "text")).unwrap().id,
    ];
    Fixture {
        _tmp: tmp,
        repo,
        form_id,
        pages,
    }
}

#[test]
fn reordering_turns_forward_route_into_routing_error() {
    let fx = three_page_form();
    let [p1, _p2, p3] = [&fx.pages[0], &fx.pages[1], &fx.pages[2]];

    let condition = fx
        .repo
        .add_condition(p1, "Yes", RouteTarget::Page(p3.clone()))
        .unwrap();
    let view = fx.repo.page_view(p1).unwrap();
    assert!(!view.has_routing_errors);
    assert!(view.routing_conditions[0].validation_errors.is_empty());

    // Move page 3 to position 1: goto is now at 1, check page at 2.
    let pages = fx.repo.move_page(p3, 1).unwrap();
    assert_eq!(pages[0].id, *p3);
    assert_eq!(pages[1].id, *p1);

    let view = fx.repo.page_view(p1).unwrap();
    assert_eq!(view.page.position, 2);
    assert!(view.has_routing_errors);
    assert_eq!(view.routing_conditions[0].condition.id, condition.id);
    assert_eq!(
        view.routing_conditions[0].validation_errors,
        vec![RoutingErrorKind::CannotHaveGotoPageBeforeRoutingPage]
    );

    // Moving it back clears the error without touching the condition.
    fx.repo.move_page(p3, 3).unwrap();
    assert!(!fx.repo.page_view(p1).unwrap().has_routing_errors);
}

#[test]
fn next_page_follows_position_order() {
    let fx = three_page_form();
    let views = fx.repo.page_views(&fx.form_id).unwrap();
    let next: Vec<Option<String>> = views.iter().map(|v| v.next_page.clone()).collect();
    assert_eq!(
        next,
        vec![Some(fx.pages[1].clone()), Some(fx.pages[2].clone()), None]
    );

    fx.repo.move_page(&fx.pages[0], 3).unwrap();
    let first = &fx.repo.page_views(&fx.form_id).unwrap()[0];
    assert_eq!(first.page.id, fx.pages[1]);
    assert_eq!(first.next_page.as_deref(), Some(fx.pages[2].as_str()));
}

#[test]
fn move_outside_range_is_rejected_and_changes_nothing() {
    let fx = three_page_form();
    assert!(matches!(
        fx.repo.move_page(&fx.pages[0], 4),
        Err(FormsError::ValidationError(_))
    ));
    assert!(matches!(
        fx.repo.move_page(&fx.pages[0], 0),
        Err(FormsError::ValidationError(_))
    ));
    let ids: Vec<String> = fx
        .repo
        .page_views(&fx.form_id)
        .unwrap()
        .into_iter()
        .map(|v| v.page.id)
        .collect();
    assert_eq!(ids, fx.pages);
}

#[test]
fn backward_condition_is_saved_but_flagged() {
    let fx = three_page_form();
    let condition = fx
        .repo
        .add_condition(&fx.pages[2], "No", RouteTarget::Page(fx.pages[0].clone()))
        .unwrap();
    assert_eq!(fx.repo.list_conditions(&fx.form_id).unwrap(), vec![condition]);
    assert!(fx.repo.page_view(&fx.pages[2]).unwrap().has_routing_errors);
    // Only the check page's outgoing conditions count.
    assert!(!fx.repo.page_view(&fx.pages[0]).unwrap().has_routing_errors);
}

#[test]
fn skip_to_end_survives_deleting_later_pages() {
    let fx = three_page_form();
    fx.repo
        .add_condition(&fx.pages[0], "No", RouteTarget::SkipToEnd)
        .unwrap();
    fx.repo.delete_page(&fx.pages[2]).unwrap();
    fx.repo.delete_page(&fx.pages[1]).unwrap();

    let view = fx.repo.page_view(&fx.pages[0]).unwrap();
    assert!(!view.has_routing_errors);
    assert!(view.routing_conditions[0].condition.skip_to_end);
}

#[test]
fn multiple_options_switch_purges_conditions() {
    let fx = three_page_form();
    let single = PageFields {
        answer_settings: Some(json!({"only_one_option": "true", "selection_options": [{"name": "Yes"}]})),
        ..page("Do you have a licence?", "selection")
    };
    fx.repo.update_page(&fx.pages[0], single.clone()).unwrap();
    fx.repo
        .add_condition(&fx.pages[0], "Yes", RouteTarget::Page(fx.pages[2].clone()))
        .unwrap();

    let multiple = PageFields {
        answer_settings: Some(json!({"only_one_option": "false", "selection_options": [{"name": "Yes"}]})),
        ..single
    };
    let save = fx.repo.update_page(&fx.pages[0], multiple).unwrap();
    assert_eq!(save.destroyed_conditions.len(), 1);
    assert!(fx.repo.list_conditions(&fx.form_id).unwrap().is_empty());
}

#[test]
fn serialized_page_view_carries_derived_fields() {
    let fx = three_page_form();
    fx.repo
        .add_condition(&fx.pages[1], "x", RouteTarget::Page(fx.pages[0].clone()))
        .unwrap();

    let json = serde_json::to_value(fx.repo.page_view(&fx.pages[1]).unwrap()).unwrap();
    assert_eq!(json["next_page"], fx.pages[2].as_str());
    assert_eq!(json["has_routing_errors"], true);
    assert_eq!(
        json["routing_conditions"][0]["validation_errors"],
        json!(["cannot_have_goto_page_before_routing_page"])
    );

    let last = serde_json::to_value(fx.repo.page_view(&fx.pages[2]).unwrap()).unwrap();
    assert!(last.get("next_page").is_none());
}
