//! Contract Invariant Tests
//!
//! These tests verify the binding guarantees end to end.

use jcard_core::{
    dom::{Document, Selector},
    fields::FieldKey,
    outputs::OutputKey,
    templates::{jcard_page, jcard_template, Markup},
    Binding, BindingCatalog, ConfigurationError, EngineError, FieldRecord, FieldValue, JCard,
    Layout, PrintCopy, PrintError, SelectedFile, SurfaceRole, Template, Transform,
};

fn jcard_document() -> Document {
    Template::jcard().document().unwrap()
}

fn create_jcard(record: &FieldRecord) -> JCard {
    JCard::init(jcard_document(), "#jcard", record).unwrap()
}

fn html(jcard: &JCard, role: SurfaceRole, key: OutputKey) -> Vec<String> {
    jcard
        .output(role, key)
        .iter()
        .map(|node| node.inner_html.clone())
        .collect()
}

fn style(jcard: &JCard, role: SurfaceRole, key: OutputKey, property: &str) -> Vec<String> {
    jcard
        .output(role, key)
        .iter()
        .map(|node| node.style.get(property).cloned().unwrap_or_default())
        .collect()
}

#[test]
fn invariant_scenario_side_one() {
    let record = FieldRecord::from_json(
        r#"{"title": "Side One", "side_a": ["Track A", "Track B"], "side_b": []}"#,
    )
    .unwrap();
    let jcard = create_jcard(&record);

    for role in SurfaceRole::ALL {
        assert_eq!(html(&jcard, role, OutputKey::Titles), vec!["Side One", "Side One"]);
        assert_eq!(
            html(&jcard, role, OutputKey::Tracks),
            vec!["Track A&nbsp;• Track B"]
        );
        assert_eq!(
            html(&jcard, role, OutputKey::SideA),
            vec!["Track A&nbsp;• Track B"]
        );
        assert_eq!(html(&jcard, role, OutputKey::SideB), vec![""]);
    }
    assert!(jcard.is_consistent());
}

#[test]
fn invariant_default_population() {
    let jcard = create_jcard(&FieldRecord::new());

    assert_eq!(
        jcard.value(FieldKey::TitleSize),
        Some(&FieldValue::Text("12".into()))
    );
    assert_eq!(
        jcard.value(FieldKey::CardColor),
        Some(&FieldValue::Text("white".into()))
    );
    assert_eq!(
        jcard.value(FieldKey::ShortBack),
        Some(&FieldValue::Checked(false))
    );
    assert_eq!(jcard.value(FieldKey::Cover), Some(&FieldValue::Files(vec![])));

    for role in SurfaceRole::ALL {
        assert_eq!(
            style(&jcard, role, OutputKey::TitleGroups, "font-size"),
            vec!["12pt", "12pt"]
        );
        assert_eq!(style(&jcard, role, OutputKey::Tracks, "font-size"), vec!["9pt"]);
        assert_eq!(style(&jcard, role, OutputKey::Back, "font-size"), vec!["8pt"]);
        assert_eq!(
            style(&jcard, role, OutputKey::Boundaries, "background-color"),
            vec!["white"]
        );
        assert_eq!(style(&jcard, role, OutputKey::Root, "color"), vec!["black"]);
        assert!(!jcard.output(role, OutputKey::Root)[0].has_class("short-back"));
        assert_eq!(jcard.output(role, OutputKey::Cover)[0].src, None);
    }
}

#[test]
fn invariant_every_binding_fires_once_at_startup() {
    let jcard = create_jcard(&FieldRecord::new());
    // 17 bindings on each of two surfaces; the merge binding is not doubled
    assert_eq!(jcard.catalog().len(), 17);
    assert_eq!(jcard.bootstrap_applications(), 34);
}

#[test]
fn invariant_change_runs_only_dependent_bindings() {
    let mut jcard = create_jcard(&FieldRecord::new());

    // title -> titles, on both surfaces
    assert_eq!(jcard.set_text(FieldKey::Title, "Mixtape").unwrap(), 2);
    // side-a -> side A list and merged tracks, on both surfaces
    assert_eq!(jcard.set_text(FieldKey::SideA, "One\nTwo").unwrap(), 4);
}

#[test]
fn invariant_dual_surface_consistency_after_each_change() {
    let mut jcard = create_jcard(&FieldRecord::new());
    assert!(jcard.is_consistent());

    let edits: Vec<(FieldKey, FieldValue)> = vec![
        (FieldKey::Title, FieldValue::Text("Mix".into())),
        (FieldKey::TitleSize, FieldValue::Text("1".into())),
        (FieldKey::TitleSize, FieldValue::Text("14".into())),
        (FieldKey::ShortBack, FieldValue::Checked(true)),
        (FieldKey::CardColor, FieldValue::Text("#ffcc00".into())),
        (FieldKey::SideB, FieldValue::Text("X\n\nY".into())),
        (FieldKey::SideA, FieldValue::Text("  ".into())),
        (
            FieldKey::Cover,
            FieldValue::Files(vec![SelectedFile::new("c.png", vec![7, 7, 7])]),
        ),
        (FieldKey::Cover, FieldValue::Files(vec![])),
        (FieldKey::ShortBack, FieldValue::Checked(false)),
        (FieldKey::NoteUpper, FieldValue::Text("<b>Dolby B</b>".into())),
    ];

    for (key, value) in edits {
        jcard.set(key, value).unwrap();
        assert!(jcard.is_consistent(), "diverged after editing {}", key);
        assert_eq!(
            jcard.fingerprint(SurfaceRole::Preview).unwrap(),
            jcard.fingerprint(SurfaceRole::Duplicate).unwrap()
        );
    }

    assert_eq!(
        html(&jcard, SurfaceRole::Duplicate, OutputKey::Tracks),
        vec!["X&nbsp;• Y"]
    );
}

#[test]
fn invariant_surfaces_do_not_share_nodes() {
    let jcard = create_jcard(&FieldRecord::new());

    for key in OutputKey::ALL {
        let preview = jcard.output_ids(SurfaceRole::Preview, key);
        let duplicate = jcard.output_ids(SurfaceRole::Duplicate, key);
        assert_eq!(preview.len(), duplicate.len());
        assert!(preview.iter().all(|id| !duplicate.contains(id)), "{} shared", key);
    }
}

#[test]
fn invariant_boolean_toggle_idempotent() {
    let mut jcard = create_jcard(&FieldRecord::new());

    jcard.set_checked(FieldKey::ShortBack, true).unwrap();
    let first = jcard.snapshot(SurfaceRole::Preview);
    assert!(jcard.output(SurfaceRole::Preview, OutputKey::Root)[0].has_class("short-back"));

    jcard.set_checked(FieldKey::ShortBack, true).unwrap();
    assert_eq!(jcard.snapshot(SurfaceRole::Preview), first);

    jcard.set_checked(FieldKey::ShortBack, false).unwrap();
    jcard.set_checked(FieldKey::ShortBack, false).unwrap();
    let roots = jcard.output(SurfaceRole::Duplicate, OutputKey::Root);
    let root = roots[0];
    assert!(!root.has_class("short-back"));
    assert!(root.has_class("template"));
}

#[test]
fn invariant_controls_show_current_values() {
    let record = FieldRecord::new()
        .with(FieldKey::Title, "Side One")
        .with(FieldKey::ShortBack, true)
        .with(FieldKey::SideA, vec!["Track A", "Track B"]);
    let mut jcard = create_jcard(&record);

    let control = |jcard: &JCard, id: &str| {
        let node = jcard.document().select(&Selector::id(id)).unwrap();
        jcard.document().node(node).clone()
    };

    let title = control(&jcard, "controls-title");
    assert_eq!(title.attributes.get("value").map(String::as_str), Some("Side One"));
    assert!(control(&jcard, "controls-short-back").attributes.contains_key("checked"));
    assert_eq!(control(&jcard, "controls-side-a").inner_html, "Track A\nTrack B");
    // defaults are reflected too
    let size = control(&jcard, "controls-title-size");
    assert_eq!(size.attributes.get("value").map(String::as_str), Some("12"));

    jcard.set_text(FieldKey::Title, "Side Two").unwrap();
    jcard.set_checked(FieldKey::ShortBack, false).unwrap();
    let title = control(&jcard, "controls-title");
    assert_eq!(title.attributes.get("value").map(String::as_str), Some("Side Two"));
    assert!(!control(&jcard, "controls-short-back").attributes.contains_key("checked"));
    assert!(jcard.is_consistent());
}

#[test]
fn invariant_absent_file_keeps_previous_image() {
    let mut jcard = create_jcard(&FieldRecord::new());

    jcard
        .select_file(FieldKey::Cover, SelectedFile::new("cover.png", vec![1, 2, 3]))
        .unwrap();
    let expected = Some("data:image/png;base64,AQID".to_string());
    assert_eq!(jcard.output(SurfaceRole::Preview, OutputKey::Cover)[0].src, expected);

    jcard.clear_files(FieldKey::Cover).unwrap();
    jcard
        .select_file(FieldKey::Cover, SelectedFile::new("empty.png", vec![]))
        .unwrap();
    for role in SurfaceRole::ALL {
        assert_eq!(jcard.output(role, OutputKey::Cover)[0].src, expected);
    }
}

#[test]
fn invariant_size_is_not_validated() {
    let mut jcard = create_jcard(&FieldRecord::new());

    jcard.set_text(FieldKey::NoteSize, "").unwrap();
    assert_eq!(
        style(&jcard, SurfaceRole::Preview, OutputKey::NoteGroup, "font-size"),
        vec!["pt"]
    );
    jcard.set_text(FieldKey::NoteSize, "1x").unwrap();
    assert_eq!(
        style(&jcard, SurfaceRole::Duplicate, OutputKey::NoteGroup, "font-size"),
        vec!["1xpt"]
    );
}

#[test]
fn invariant_kind_mismatch_rejected() {
    let mut jcard = create_jcard(&FieldRecord::new());
    let before = jcard.snapshot(SurfaceRole::Preview);

    let result = jcard.set(FieldKey::ShortBack, FieldValue::Text("yes".into()));
    assert!(matches!(result, Err(EngineError::Field(_))));
    assert_eq!(jcard.snapshot(SurfaceRole::Preview), before);
}

#[test]
fn invariant_missing_field_fails_init() {
    let naming = jcard_core::fields::Naming::new("controls");
    let controls = Markup::new("form").class("controls").id("controls").children(
        FieldKey::ALL
            .iter()
            .filter(|key| **key != FieldKey::NoteLower)
            .map(|key| jcard_core::templates::control(&naming, *key)),
    );
    let page = Markup::new("div").id("jcard").children([
        controls,
        jcard_template(),
        Markup::new("div").class("print-duplicate"),
    ]);

    let result = JCard::init(page.to_document(), "#jcard", &FieldRecord::new());
    match result {
        Err(EngineError::Configuration(ConfigurationError::MissingField { key, element_id })) => {
            assert_eq!(key, FieldKey::NoteLower);
            assert_eq!(element_id, "controls-note-lower");
        }
        other => panic!("expected missing field, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn invariant_missing_output_fails_init() {
    let mut page = jcard_page("jcard", "controls");
    let json = serde_json::to_string(&page).unwrap();
    // drop the spine title marker
    let json = json.replace("\"template-spine-title\"", "\"spine-title\"");
    page = serde_json::from_str(&json).unwrap();

    let result = JCard::init(page.to_document(), "#jcard", &FieldRecord::new());
    match result {
        Err(EngineError::Configuration(ConfigurationError::MissingOutput { key, marker })) => {
            assert_eq!(key, OutputKey::Titles);
            assert_eq!(marker, ".template-spine-title");
        }
        other => panic!("expected missing output, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn invariant_duplicate_container_must_be_empty() {
    let page = jcard_page("jcard", "controls");
    let json = serde_json::to_string(&page)
        .unwrap()
        .replace(
            r#"{"tag":"div","class":["print-duplicate"]}"#,
            r#"{"tag":"div","class":["print-duplicate"],"children":[{"tag":"p"}]}"#,
        );
    let page: Markup = serde_json::from_str(&json).unwrap();

    let result = JCard::init(page.to_document(), "#jcard", &FieldRecord::new());
    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigurationError::DuplicateNotEmpty { .. }))
    ));
}

#[test]
fn invariant_duplicate_container_outside_template() {
    let naming = jcard_core::fields::Naming::new("controls");
    let controls = Markup::new("form").class("controls").id("controls").children(
        FieldKey::ALL
            .iter()
            .map(|key| jcard_core::templates::control(&naming, *key)),
    );
    // the empty duplicate container sits inside the template it copies
    let template = jcard_template().child(Markup::new("div").class("print-duplicate"));
    let page = Markup::new("div").id("jcard").children([controls, template]);

    let result = JCard::init(page.to_document(), "#jcard", &FieldRecord::new());
    match result {
        Err(EngineError::Configuration(ConfigurationError::DuplicateInsideTemplate {
            selector,
        })) => assert_eq!(selector, ".print-duplicate"),
        other => panic!("expected nested duplicate error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn invariant_unknown_container_fails_init() {
    let result = JCard::init(jcard_document(), "#nope", &FieldRecord::new());
    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigurationError::MissingRegion { .. }))
    ));

    let result = JCard::init(jcard_document(), "jcard", &FieldRecord::new());
    assert!(matches!(result, Err(EngineError::Selector(_))));
}

#[test]
fn invariant_incompatible_binding_fails_init() {
    let catalog = BindingCatalog::new(vec![Binding::new(
        vec![FieldKey::Title],
        vec![OutputKey::Root],
        Transform::class_toggle("titled"),
    )]);

    let result = JCard::init_with(
        jcard_document(),
        "#jcard",
        &FieldRecord::new(),
        catalog,
        &Layout::default(),
    );
    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigurationError::IncompatibleKind { .. }))
    ));
}

#[test]
fn invariant_custom_catalog_from_json() {
    let catalog = BindingCatalog::from_json(
        r#"[
            {"sources": ["title"], "targets": ["titles", "type"], "transform": {"kind": "text_copy"}},
            {"sources": ["side-a", "side-b"], "targets": ["tracks"], "transform": {"kind": "merge_lists"}}
        ]"#,
    )
    .unwrap();

    let record = FieldRecord::new()
        .with(FieldKey::Title, "Both")
        .with(FieldKey::SideB, vec!["Only B"]);
    let jcard = JCard::init_with(
        jcard_document(),
        "#jcard",
        &record,
        catalog,
        &Layout::default(),
    )
    .unwrap();

    // only the fields the catalog reads are registered
    assert_eq!(jcard.fields().len(), 3);
    assert_eq!(html(&jcard, SurfaceRole::Duplicate, OutputKey::Type), vec!["Both"]);
    assert_eq!(html(&jcard, SurfaceRole::Preview, OutputKey::Tracks), vec!["Only B"]);
}

#[test]
fn invariant_print_copy_matches_preview() {
    let record = FieldRecord::new().with(FieldKey::Title, "Side One");
    let jcard = create_jcard(&record);

    let copy = PrintCopy::prepare(&jcard, &record).unwrap();
    assert_eq!(copy.fingerprint, jcard.fingerprint(SurfaceRole::Preview).unwrap());
    assert_eq!(copy.html, jcard.to_html(SurfaceRole::Preview));
    assert!(copy.html.contains(r#"<div class="template-front-title">Side One</div>"#));
    assert_eq!(copy.engine_version, jcard_core::ENGINE_VERSION);
}

#[test]
fn invariant_print_copy_refuses_divergence() {
    let record = FieldRecord::new().with(FieldKey::Title, "Side One");
    let mut jcard = create_jcard(&record);

    // a host-side write to one surface only
    let spine = jcard.output_ids(SurfaceRole::Duplicate, OutputKey::Titles)[1];
    jcard.document_mut().node_mut(spine).set_inner_html("smudged");

    assert!(!jcard.is_consistent());
    assert_eq!(
        html(&jcard, SurfaceRole::Preview, OutputKey::Titles),
        vec!["Side One", "Side One"]
    );
    assert!(matches!(
        PrintCopy::prepare(&jcard, &record),
        Err(PrintError::Diverged { .. })
    ));

    // the next edit of the field rewrites both surfaces
    jcard.set_text(FieldKey::Title, "Side One").unwrap();
    assert!(jcard.is_consistent());
    assert!(PrintCopy::prepare(&jcard, &record).is_ok());
}

#[test]
fn invariant_template_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jcard.json");
    std::fs::write(&path, serde_json::to_string_pretty(&Template::jcard()).unwrap()).unwrap();

    let template = Template::load(&path).unwrap();
    let jcard = JCard::init(template.document().unwrap(), "#jcard", &FieldRecord::new()).unwrap();
    assert!(jcard.is_consistent());
}
