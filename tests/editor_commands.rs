// End-to-end flows through the toolbar command dispatcher

use std::cell::RefCell;
use std::rc::Rc;

use softcenter::richtext::commands::{CommandOutcome, EditorCommand, TutorialEditor};
use softcenter::richtext::structured_document::DocumentPosition;

#[test]
fn test_chain_of_commands_unwinds_in_order() {
    let mut editor = TutorialEditor::from_markup("campus network");

    editor.select_all();
    assert!(editor.apply(EditorCommand::ToggleBold).is_applied());
    editor.select_all();
    assert!(
        editor
            .apply(EditorCommand::SetLink {
                url: "https://example.edu".to_string(),
            })
            .is_applied()
    );
    editor.select_all();
    assert!(
        editor
            .apply(EditorCommand::ToggleHeading { level: 1 })
            .is_applied()
    );
    assert_eq!(
        editor.serialize(),
        "# [**campus network**](https://example.edu)"
    );

    for expected in [
        "[**campus network**](https://example.edu)",
        "**campus network**",
        "campus network",
    ] {
        assert_eq!(editor.apply(EditorCommand::Undo), CommandOutcome::Applied);
        assert_eq!(editor.serialize(), expected);
    }
    assert_eq!(editor.apply(EditorCommand::Undo), CommandOutcome::Ignored);

    for expected in [
        "**campus network**",
        "[**campus network**](https://example.edu)",
        "# [**campus network**](https://example.edu)",
    ] {
        assert_eq!(editor.apply(EditorCommand::Redo), CommandOutcome::Applied);
        assert_eq!(editor.serialize(), expected);
    }
    assert_eq!(editor.apply(EditorCommand::Redo), CommandOutcome::Ignored);
}

#[test]
fn test_list_kind_switch_round_trips() {
    let mut editor = TutorialEditor::from_markup("- wifi\n\n- vpn");

    editor.select_all();
    assert!(editor.apply(EditorCommand::ToggleOrderedList).is_applied());
    assert_eq!(editor.serialize(), "1. wifi\n\n2. vpn");

    editor.select_all();
    assert!(editor.apply(EditorCommand::ToggleBulletList).is_applied());
    assert_eq!(editor.serialize(), "- wifi\n\n- vpn");

    editor.apply(EditorCommand::Undo);
    assert_eq!(editor.serialize(), "1. wifi\n\n2. vpn");
    editor.apply(EditorCommand::Undo);
    assert_eq!(editor.serialize(), "- wifi\n\n- vpn");
}

#[test]
fn test_heading_toggle_unifies_mixed_selection() {
    let mut editor = TutorialEditor::from_markup("# Title\n\nBody");

    editor.select_all();
    editor.apply(EditorCommand::ToggleHeading { level: 1 });
    assert_eq!(editor.serialize(), "# Title\n\n# Body");

    editor.select_all();
    editor.apply(EditorCommand::ToggleHeading { level: 1 });
    assert_eq!(editor.serialize(), "Title\n\nBody");
}

#[test]
fn test_quote_and_list_replace_each_other() {
    let mut editor = TutorialEditor::from_markup("> note");

    editor.apply(EditorCommand::ToggleBulletList);
    assert_eq!(editor.serialize(), "- note");

    editor.apply(EditorCommand::ToggleBlockquote);
    assert_eq!(editor.serialize(), "> note");

    editor.apply(EditorCommand::Undo);
    assert_eq!(editor.serialize(), "- note");
}

#[test]
fn test_image_insertion_at_cursor_is_undoable() {
    let mut editor = TutorialEditor::from_markup("before after");
    editor.set_cursor(DocumentPosition::new(0, 7));

    editor.apply(EditorCommand::InsertImage {
        url: "https://cdn.example.edu/shot.png".to_string(),
    });
    assert_eq!(
        editor.serialize(),
        "before ![](https://cdn.example.edu/shot.png)after"
    );

    editor.apply(EditorCommand::Undo);
    assert_eq!(editor.serialize(), "before after");
    assert_eq!(editor.cursor(), DocumentPosition::new(0, 7));
}

#[test]
fn test_notifications_report_saved_markup() {
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();

    let mut editor = TutorialEditor::new();
    editor.on_change(Box::new(move |markup| {
        sink.borrow_mut().push(markup.to_string());
    }));

    editor.replace_content("# Draft");
    editor.select_all();
    editor.apply(EditorCommand::ToggleHeading { level: 1 });
    editor.apply(EditorCommand::Undo);

    assert_eq!(log.borrow().as_slice(), ["# Draft", "Draft", "# Draft"]);
}
