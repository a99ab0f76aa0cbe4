use approx::assert_relative_eq;

use petridoc::config::LayoutConfig;
use petridoc::layout::layout_net;
use petridoc::net::io::pnml;
use petridoc::net::{
    Arc, ArcKind, Document, NetError, NetFormat, Object, ObjectId, ObjectKind, Page, PetriNet,
    Place, Point, Transition,
};

fn scenario_a() -> Document {
    let mut doc = Document::new();
    doc.add_net(PetriNet::new("N", NetFormat::PlaceTransition))
        .unwrap();
    doc.add_page("N", Page::new("P1")).unwrap();
    doc.add_place("P1", Place::new("p0").with_name("p0").with_tokens(1))
        .unwrap();
    doc.add_transition("P1", Transition::new("t0")).unwrap();
    doc.add_arc("P1", Arc::new("a0", "p0", "t0")).unwrap();
    doc
}

#[test]
fn build_and_round_trip_a_simple_net() {
    let doc = scenario_a();
    for id in ["P1", "p0", "t0", "a0"] {
        assert!(doc.contains(id), "{id} should be registered");
    }

    let xml = pnml::to_pnml_string(&doc);
    let mut reread = Document::new();
    let nets = pnml::read_str(&mut reread, &xml).unwrap();
    assert_eq!(nets, vec![ObjectId::from("N")]);
    assert_eq!(reread.len(), doc.len());
    assert_eq!(reread.get::<Place>("p0").unwrap().tokens, 1);
    assert!(reread.get::<Transition>("t0").is_some());

    let arc = reread.get::<Arc>("a0").unwrap();
    assert_eq!(arc.source().as_str(), "p0");
    assert_eq!(arc.target().as_str(), "t0");
    assert_eq!(arc.kind, ArcKind::Normal);
    assert_eq!(reread.net_of("a0").map(ObjectId::as_str), Some("N"));
}

#[test]
fn duplicate_place_is_rejected_without_side_effects() {
    let mut doc = scenario_a();
    let before = doc.len();

    let err = doc
        .add_place("P1", Place::new("p0").with_tokens(7))
        .unwrap_err();
    assert!(matches!(err, NetError::DuplicateId(_)));

    let err = doc
        .add_place("P1", Place::new("p0_again").with_name("p0"))
        .unwrap_err();
    assert!(matches!(err, NetError::DuplicateName { .. }));

    assert_eq!(doc.len(), before);
    assert!(!doc.contains("p0_again"));
    assert_eq!(doc.get::<Place>("p0").unwrap().tokens, 1);
    assert_eq!(
        doc.find_by_name("P1", "p0").map(|object| object.id().as_str()),
        Some("p0")
    );
}

#[test]
fn arc_to_unknown_node_is_rejected() {
    let mut doc = scenario_a();
    let before = doc.len();
    let err = doc
        .add_arc("P1", Arc::new("a1", "t0", "missing"))
        .unwrap_err();
    assert!(matches!(err, NetError::UnresolvedEndpoint { .. }));
    assert_eq!(doc.len(), before);
    assert!(!doc.contains("a1"));
    let page = doc.get::<Page>("P1").unwrap();
    assert_eq!(page.arc_count(), 1);
    assert!(page.successors(&ObjectId::from("t0")).is_empty());
}

#[test]
fn reference_across_kinds_is_rejected() {
    let mut doc = scenario_a();
    let err = doc
        .set_reference("p0", Some(ObjectId::from("t0")))
        .unwrap_err();
    assert!(matches!(
        err,
        NetError::ReferenceKindMismatch {
            node_kind: ObjectKind::Place,
            reference_kind: ObjectKind::Transition,
            ..
        }
    ));
    assert!(doc.node("p0").unwrap().reference().is_none());
    assert!(doc.node("t0").unwrap().referenced_by().is_empty());
}

#[test]
fn aliases_stay_symmetric() {
    let mut doc = scenario_a();
    doc.add_page("N", Page::new("P2")).unwrap();
    doc.add_place("P2", Place::new("p0_ref").with_reference("p0"))
        .unwrap();
    doc.add_place("P2", Place::new("other")).unwrap();

    let original = doc.node("p0").unwrap();
    assert!(original.referenced_by().contains("p0_ref"));

    doc.set_reference("p0_ref", Some(ObjectId::from("other")))
        .unwrap();
    assert!(doc.node("p0").unwrap().referenced_by().is_empty());
    assert!(doc.node("other").unwrap().referenced_by().contains("p0_ref"));

    let err = doc
        .set_reference("other", Some(ObjectId::from("p0_ref")))
        .unwrap_err();
    assert!(matches!(err, NetError::ReferenceCycle { .. }));
    assert!(doc.node("other").unwrap().reference().is_none());
}

#[test]
fn layout_survives_pnml_round_trip() {
    let mut doc = scenario_a();
    doc.add_place("P1", Place::new("p1")).unwrap();
    doc.add_arc("P1", Arc::new("a1", "t0", "p1")).unwrap();
    layout_net(&mut doc, "N", &LayoutConfig::default()).unwrap();

    let xml = pnml::to_pnml_string(&doc);
    let mut reread = Document::new();
    pnml::read_str(&mut reread, &xml).unwrap();

    for id in ["p0", "t0", "p1"] {
        let expected = doc.node(id).unwrap();
        let actual = reread.node(id).unwrap();
        assert_relative_eq!(actual.position.x, expected.position.x, epsilon = 1e-9);
        assert_relative_eq!(actual.position.y, expected.position.y, epsilon = 1e-9);
        assert_relative_eq!(actual.size.x, expected.size.x, epsilon = 1e-9);
    }
    let p0 = reread.node("p0").unwrap().position;
    let p1 = reread.node("p1").unwrap().position;
    assert!(p0.y < p1.y);
}

#[test]
fn names_are_unique_per_scope_only() {
    let mut doc = scenario_a();
    doc.add_page("N", Page::new("P2").with_name("second")).unwrap();
    doc.add_place("P2", Place::new("q0").with_name("p0")).unwrap();
    assert_eq!(
        doc.find_by_name("P2", "p0").map(|object| object.id().as_str()),
        Some("q0")
    );

    let err = doc
        .add_page("N", Page::new("P3").with_name("second"))
        .unwrap_err();
    assert!(matches!(err, NetError::DuplicateName { .. }));
    assert_eq!(doc.get::<PetriNet>("N").unwrap().count_name("second"), 1);

    let err = doc.add_net(PetriNet::new("P1", NetFormat::Symmetric)).unwrap_err();
    assert!(matches!(err, NetError::DuplicateId(_)));
}

fn hierarchical_net() -> Document {
    let mut doc = Document::new();
    doc.add_net(PetriNet::new("N", NetFormat::Symmetric).with_name("demo"))
        .unwrap();
    doc.add_page("N", Page::new("P1").with_name("main")).unwrap();
    doc.add_page("P1", Page::new("P2").with_name("inner")).unwrap();

    let mut p0 = Place::new("p0")
        .with_name("ready")
        .with_tokens(3)
        .with_position(10.0, 20.5);
    p0.marking_offset = Point::new(2.0, -3.25);
    doc.add_place("P1", p0).unwrap();
    doc.add_transition("P1", Transition::new("t0").with_name("go").with_position(60.0, 20.5))
        .unwrap();
    let mut a0 = Arc::new("a0", "p0", "t0").with_name("consume");
    a0.curve = vec![Point::new(30.0, 10.0), Point::new(45.5, 12.125)];
    doc.add_arc("P1", a0).unwrap();

    doc.add_place("P2", Place::new("q").with_position(1.0, 2.0))
        .unwrap();
    doc.add_place("P2", Place::new("p0_ref").with_reference("p0"))
        .unwrap();
    doc.add_transition("P2", Transition::new("t0_ref").with_reference("t0"))
        .unwrap();
    doc.add_arc("P2", Arc::new("a1", "p0_ref", "t0_ref").with_kind(ArcKind::Read))
        .unwrap();
    doc.add_arc("P2", Arc::new("a2", "t0_ref", "q")).unwrap();

    // 在 P1 中引用子页面上的节点，写出后成为前向引用
    doc.add_place("P1", Place::new("q_ref").with_reference("q"))
        .unwrap();
    doc
}

fn sorted_ids(doc: &Document) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = doc.iter().map(|object| object.id().clone()).collect();
    ids.sort();
    ids
}

#[test]
fn hierarchical_net_round_trips_through_pnml() {
    let doc = hierarchical_net();
    let xml = pnml::to_pnml_string(&doc);
    assert!(xml.contains(r#"<referenceTransition id="t0_ref" ref="t0">"#));

    let mut reread = Document::new();
    pnml::read_str(&mut reread, &xml).unwrap();
    assert_eq!(sorted_ids(&reread), sorted_ids(&doc));

    for object in doc.iter() {
        let id = object.id().as_str();
        let copy = reread.object(id).unwrap();
        assert_eq!(copy.kind(), object.kind(), "{id}");
        assert_eq!(copy.name(), object.name(), "{id}");
        assert_eq!(copy.owner(), object.owner(), "{id}");
        match object {
            Object::Net(net) => {
                let copy = reread.get::<PetriNet>(id).unwrap();
                assert_eq!(copy.format, net.format);
                assert!(copy.pages().eq(net.pages()));
            }
            Object::Page(page) => {
                let copy = reread.get::<Page>(id).unwrap();
                assert!(copy.pages().eq(page.pages()));
                assert_eq!(copy.node_count(), page.node_count());
                assert_eq!(copy.arc_count(), page.arc_count());
            }
            // 库所、迁移、弧逐字段比较：标记、偏移、位置、曲线、别名集合
            Object::Place(place) => assert_eq!(reread.get::<Place>(id), Some(place)),
            Object::Transition(transition) => {
                assert_eq!(reread.get::<Transition>(id), Some(transition))
            }
            Object::Arc(arc) => assert_eq!(reread.get::<Arc>(id), Some(arc)),
        }
    }

    let p0 = reread.node("p0").unwrap();
    assert!(p0.referenced_by().contains("p0_ref"));
    assert!(reread.node("q").unwrap().referenced_by().contains("q_ref"));
    assert_eq!(reread.get::<Arc>("a1").unwrap().kind, ArcKind::Read);
    assert_relative_eq!(reread.get::<Arc>("a0").unwrap().curve[1].y, 12.125);
    assert_relative_eq!(reread.get::<Place>("p0").unwrap().marking_offset.y, -3.25);
}
