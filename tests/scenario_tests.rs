/// Scenario loading, validation and lint tests against the bundled content.

use std::path::Path;
use vn_engine::core::config::SessionConfig;
use vn_engine::core::gallery::{CgCategory, GalleryCatalog};
use vn_engine::core::session::GameSession;
use vn_engine::core::validator::{lint, validate};
use vn_engine::schema::node::{GameNode, NodeKind};
use vn_engine::schema::scenario::{Scenario, ScenarioError};

fn demo() -> Scenario {
    Scenario::load_from_json(Path::new("scenarios/campus_days.json")).unwrap()
}

#[test]
fn demo_scenario_is_sound_and_lint_clean() {
    let scenario = demo();
    assert_eq!(scenario.meta.title, "Campus Days");
    assert_eq!(scenario.start, "P_001");
    assert!(validate(&scenario).is_empty(), "{:#?}", validate(&scenario));
    assert!(lint(&scenario).is_empty(), "{:#?}", lint(&scenario));
}

#[test]
fn demo_node_ids_filled_from_keys() {
    let scenario = demo();
    for (key, node) in &scenario.nodes {
        assert_eq!(node.id(), key);
    }
}

#[test]
fn demo_has_six_endings_with_gallery_cgs() {
    let scenario = demo();
    let catalog =
        GalleryCatalog::load_from_ron(Path::new("scenarios/campus_days.gallery.ron")).unwrap();

    let mut ending_ids: Vec<&str> = scenario
        .nodes
        .values()
        .filter_map(|node| match node {
            GameNode::End(end) => Some(end.ending_id.as_str()),
            _ => None,
        })
        .collect();
    ending_ids.sort_unstable();
    assert_eq!(ending_ids, vec!["E1", "E2", "E3", "E4", "E5", "E6"]);

    assert_eq!(catalog.endings.len(), 6);
    for id in ending_ids {
        let cg_id = catalog.cg_for_ending(id).unwrap();
        let cg = catalog.cgs.iter().find(|cg| cg.id == cg_id).unwrap();
        assert_eq!(cg.category, CgCategory::Ending);
    }
}

#[test]
fn broken_fixture_reports_every_dangling_reference() {
    let scenario = Scenario::load_from_json(Path::new("tests/fixtures/broken.json")).unwrap();
    let errors = validate(&scenario);
    assert_eq!(
        errors,
        vec![
            "node 'B' choice 1 next 'MISSING_1' not found",
            "node 'C' branch 0 next 'MISSING_2' not found",
        ]
    );

    let warnings = lint(&scenario);
    assert_eq!(warnings.len(), 3, "{warnings:#?}");
    assert!(warnings[0].contains("'C' is unreachable"));
    assert!(warnings[1].contains("unknown variable 'charm'"));
    assert!(warnings[2].contains("unsupported comparator '~='"));
}

#[test]
fn session_refuses_broken_scenario() {
    let mut session = GameSession::builder().build().unwrap();
    let err = session
        .load_scenario_file(Path::new("tests/fixtures/broken.json"))
        .unwrap_err();
    match err {
        ScenarioError::Invalid(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected Invalid, got {other:?}"),
    }
    assert!(session.scenario().is_none());
    assert!(!session.start_new_game());
}

#[test]
fn load_errors_are_typed() {
    assert!(matches!(
        Scenario::load_from_json(Path::new("tests/fixtures/nope.json")),
        Err(ScenarioError::Io(_))
    ));
    assert!(matches!(
        Scenario::parse_json("{\"start\": \"A\", \"nodes\": "),
        Err(ScenarioError::Json(_))
    ));
    // Effect keys are closed: an unknown variable is a document error.
    assert!(matches!(
        Scenario::parse_json(
            r#"{"start":"A","nodes":{"A":{"type":"scene","speaker":"","text":"t","next":"A",
                "effects":[{"op":"inc","key":"charm","value":1}]}}}"#
        ),
        Err(ScenarioError::Json(_))
    ));
}

#[test]
fn scenario_survives_json_round_trip() {
    let scenario = demo();
    let text = scenario.to_json_pretty().unwrap();
    assert_eq!(Scenario::parse_json(&text).unwrap(), scenario);
}

#[test]
fn node_kinds_in_chain_fixture() {
    let scenario = Scenario::load_from_json(Path::new("tests/fixtures/chain.json")).unwrap();
    let kind = |id: &str| scenario.get_node(id).map(GameNode::kind);
    assert_eq!(kind("INTRO"), Some(NodeKind::Scene));
    assert_eq!(kind("J1"), Some(NodeKind::Jump));
    assert_eq!(kind("B1"), Some(NodeKind::Branch));
    assert_eq!(kind("END"), Some(NodeKind::End));
    assert_eq!(kind("NOPE"), None);
}

#[test]
fn bundled_session_config_loads() {
    let config = SessionConfig::load_from_ron(Path::new("config/session.ron")).unwrap();
    assert_eq!(config.slot_count, 6);
    assert_eq!(config.key_prefix, "campus_days");
    assert_eq!(config.chapter_label("C2_YUNA"), "Chapter 2");
    assert_eq!(config.chapter_label("END_E1"), "Epilogue");
    assert_eq!(config.initial_variables, SessionConfig::default().initial_variables);
}
