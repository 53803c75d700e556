//! End-to-end checks of the pure questionnaire layers: the bundled catalog,
//! the callback wire format and the in-memory session, wired together the
//! same way the Telegram handlers use them.

use brief_bot::bot::callback::{self, CallbackAction, NavAction};
use brief_bot::bot::keyboard;
use brief_bot::catalog::{Catalog, Question};
use brief_bot::session::Session;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardButtonKind};

const BUNDLED_CATALOG: &str = include_str!("../questions.json");

fn catalog() -> Catalog {
    Catalog::from_json(BUNDLED_CATALOG).expect("bundled questions.json must parse")
}

fn callback_data(button: &InlineKeyboardButton) -> &str {
    match &button.kind {
        InlineKeyboardButtonKind::CallbackData(data) => data,
        other => panic!("expected callback button, got {other:?}"),
    }
}

#[test]
fn test_bundled_catalog_is_well_formed() {
    let catalog = catalog();
    assert!(catalog.len() >= 10);

    let checkpoints: Vec<usize> = catalog
        .questions()
        .iter()
        .enumerate()
        .filter(|(_, q)| q.checkpoint)
        .map(|(i, _)| i)
        .collect();
    assert!(!checkpoints.is_empty(), "catalog must contain a checkpoint");

    // checkpoints carry no options of their own
    for index in checkpoints {
        let question = catalog.question(index).expect("checkpoint question");
        assert!(question.options.is_empty());
    }

    // the last step must offer the finish button, so it cannot be a checkpoint
    let last = catalog.question(catalog.last_index()).expect("last question");
    assert!(!last.checkpoint);

    // every callback payload produced from the catalog fits the wire limit
    for (index, question) in catalog.questions().iter().enumerate() {
        for option in &question.options {
            let encoded = CallbackAction::Answer {
                step: index,
                text: option.text.clone(),
            }
            .encode();
            assert!(encoded.len() <= callback::CALLBACK_DATA_LIMIT);
        }
    }
}

#[test]
fn test_multi_select_toggle_round_trip() {
    let catalog = catalog();
    let step = 0;
    let question = catalog.question(step).expect("first question");
    let mut session = Session::new(1, 100, step);

    // press the first two option buttons exactly as Telegram would echo them
    let markup = keyboard::question(question, step, catalog.len(), &[], false);
    let pressed: Vec<String> = markup
        .inline_keyboard
        .iter()
        .flatten()
        .map(callback_data)
        .filter(|data| data.starts_with("answer:"))
        .take(2)
        .map(str::to_string)
        .collect();
    assert_eq!(pressed.len(), 2);

    for data in &pressed {
        let Some(CallbackAction::Answer { step, text }) = CallbackAction::parse(data) else {
            panic!("expected answer payload in {data}");
        };
        let full = callback::resolve_option_text(question, step, &text);
        assert!(session.toggle(step, &full));
    }
    assert_eq!(session.selected(step).len(), 2);

    // pressing the first button again deselects only that option
    let Some(CallbackAction::Answer { step, text }) = CallbackAction::parse(&pressed[0]) else {
        panic!("expected answer payload");
    };
    let full = callback::resolve_option_text(question, step, &text);
    assert!(!session.toggle(step, &full));
    assert_eq!(session.selected(step), [question.options[1].text.clone()]);
}

#[test]
fn test_truncated_payload_resolves_to_full_option() {
    let long_option = "Хочу объединить кухню с гостиной и сделать большую обеденную зону \
        с панорамным остеклением";
    let raw = format!(
        r#"{{"questions": [{{"text": "Что важно?", "options": [{{"text": "{long_option}"}}]}}]}}"#
    );
    let catalog = Catalog::from_json(&raw).expect("inline catalog must parse");
    let question = catalog.question(0).expect("question 0");

    let markup = keyboard::question(question, 0, 1, &[], false);
    let wire = markup
        .inline_keyboard
        .iter()
        .flatten()
        .map(callback_data)
        .find(|data| data.starts_with("answer:"))
        .expect("option button present")
        .to_string();
    assert!(wire.len() <= callback::CALLBACK_DATA_LIMIT);

    let Some(CallbackAction::Answer { step, text }) = CallbackAction::parse(&wire) else {
        panic!("expected answer payload");
    };
    assert!(text.len() < long_option.len(), "payload must be truncated");
    assert_eq!(
        callback::resolve_option_text(question, step, &text),
        long_option
    );
}

#[test]
fn test_selected_options_render_marked_and_unmark_on_refresh() {
    let catalog = catalog();
    let step = 0;
    let question = catalog.question(step).expect("first question");
    let first = question.options[0].text.clone();

    let marked = keyboard::question(question, step, catalog.len(), &[first.clone()], false);
    let labels: Vec<&str> = marked
        .inline_keyboard
        .iter()
        .flatten()
        .map(|b| b.text.as_str())
        .collect();
    assert!(labels.contains(&format!("{first} ✅").as_str()));

    let cleared = keyboard::question(question, step, catalog.len(), &[], false);
    let labels: Vec<&str> = cleared
        .inline_keyboard
        .iter()
        .flatten()
        .map(|b| b.text.as_str())
        .collect();
    assert!(labels.contains(&first.as_str()));
}

#[test]
fn test_navigation_walks_catalog_within_bounds() {
    let catalog = catalog();
    let mut session = Session::new(1, 100, 0);

    // forward through the whole catalog stops at the last step
    for _ in 0..catalog.len() + 5 {
        session.advance(catalog.len());
    }
    assert_eq!(session.current_index, catalog.last_index());

    // the final screen carries the finish button instead of skip
    let last = catalog.question(session.current_index).expect("last question");
    let markup = keyboard::question(
        last,
        session.current_index,
        catalog.len(),
        &[],
        false,
    );
    let data: Vec<&str> = markup
        .inline_keyboard
        .iter()
        .flatten()
        .map(callback_data)
        .collect();
    assert!(data.contains(&CallbackAction::Nav(NavAction::End).encode().as_str()));
    assert!(!data.contains(&"nav:skip"));

    // and back to the very first question
    for _ in 0..catalog.len() + 5 {
        session.retreat();
    }
    assert_eq!(session.current_index, 0);
}

#[test]
fn test_custom_answer_on_free_form_question_advances_one_step() {
    let catalog = catalog();
    let free_form = catalog
        .questions()
        .iter()
        .position(Question::is_free_form)
        .expect("catalog must contain a free-form question");
    assert!(free_form < catalog.last_index());

    // a custom answer completes the free-form screen, one step forward
    let mut session = Session::new(1, 100, free_form);
    session.set_custom(free_form, "гардеробная вместо кладовки".to_string());
    session.advance(catalog.len());
    assert_eq!(session.current_index, free_form + 1);
    assert_eq!(session.custom(free_form), Some("гардеробная вместо кладовки"));

    // optioned and checkpoint screens stay open instead
    assert!(!catalog.question(0).expect("first question").is_free_form());
    let checkpoint = catalog
        .questions()
        .iter()
        .position(|q| q.checkpoint)
        .expect("catalog must contain a checkpoint");
    assert!(!catalog
        .question(checkpoint)
        .expect("checkpoint question")
        .is_free_form());

    // the last step is free-form too; the index clamps there
    let last = catalog.last_index();
    assert!(catalog.question(last).expect("last question").is_free_form());
    let mut session = Session::new(1, 100, last);
    session.set_custom(last, "на этом всё".to_string());
    session.advance(catalog.len());
    assert_eq!(session.current_index, last);
}

#[test]
fn test_menu_buttons_carry_the_labels_text_routing_matches() {
    // the idle and mid-questionnaire text handlers resume on these exact
    // constants, so every reply menu must render them verbatim
    let fresh = keyboard::main_menu(0);
    assert_eq!(fresh.keyboard[0][0].text, keyboard::START_BUTTON);

    let returning = keyboard::main_menu(7);
    assert_eq!(returning.keyboard[0][0].text, keyboard::RESUME_BUTTON);

    let after_interrupt = keyboard::resume_menu();
    assert_eq!(after_interrupt.keyboard[0][0].text, keyboard::RESUME_BUTTON);

    let after_reset = keyboard::restart_menu();
    assert_eq!(after_reset.keyboard[0][0].text, keyboard::START_BUTTON);
}

#[test]
fn test_resume_restores_selections_and_custom_answers() {
    let catalog = catalog();
    let mut session = Session::new(7, 100, catalog.clamp_index(4));

    // the persisted rows of an earlier run, as loaded on resume
    session.restore_answer(0, "Квартира".to_string(), false);
    session.restore_answer(2, "Лофт".to_string(), false);
    session.restore_answer(2, "Сканди".to_string(), false);
    session.restore_answer(9, "встроенный шкаф до потолка".to_string(), true);

    assert_eq!(session.current_index, 4);
    assert_eq!(session.selected(0), ["Квартира"]);
    assert_eq!(session.selected(2), ["Лофт", "Сканди"]);
    assert_eq!(session.custom(9), Some("встроенный шкаф до потолка"));

    // the restored state drives the keyboard marks
    let question = catalog.question(2).expect("style question");
    let markup = keyboard::question(
        question,
        2,
        catalog.len(),
        session.selected(2),
        session.custom(2).is_some(),
    );
    let labels: Vec<&str> = markup
        .inline_keyboard
        .iter()
        .flatten()
        .map(|b| b.text.as_str())
        .collect();
    assert!(labels.contains(&"Лофт ✅"));
    assert!(labels.contains(&"Сканди ✅"));
    assert!(labels.contains(&"Минимализм"));
}
