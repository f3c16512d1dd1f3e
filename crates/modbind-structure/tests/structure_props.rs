//! Property tests for the module structure model

use modbind_structure::codec::{decode_body, encode_body};
use modbind_structure::prelude::*;
use proptest::prelude::*;

/// Build a tree from (parent pick, heading) pairs; node i attaches to an
/// earlier node chosen by `pick % i`.
fn build(shape: &[(usize, bool)]) -> ModuleStructure {
    let mut tree = ModuleStructure::new(
        Binding::new("https://rm/resources/M/structure").with_module("https://rm/resources/M"),
    );
    let mut nodes = vec![tree.root()];
    for (i, (pick, heading)) in shape.iter().enumerate() {
        let parent = nodes[pick % nodes.len()];
        let mut binding = Binding::new(format!("https://rm/resources/MB_{i}"))
            .with_artifact(format!("https://rm/resources/CA_{i}"))
            .with_module("https://rm/resources/M")
            .with_component("https://rm/cm/component/C");
        if *heading {
            binding = binding.heading();
        }
        nodes.push(tree.append_child(parent, binding).unwrap());
    }
    tree
}

fn shape_strategy() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0usize..64, any::<bool>()), 0..40)
}

proptest! {
    #[test]
    fn markup_round_trip(shape in shape_strategy()) {
        let tree = build(&shape);
        let body = encode_body(&tree, WireForm::Markup).unwrap();
        prop_assert_eq!(decode_body(WireForm::Markup, &body).unwrap(), tree);
    }

    #[test]
    fn flat_list_round_trip(shape in shape_strategy()) {
        let tree = build(&shape);
        let body = encode_body(&tree, WireForm::FlatList).unwrap();
        prop_assert_eq!(decode_body(WireForm::FlatList, &body).unwrap(), tree);
    }

    #[test]
    fn append_never_reorders_siblings(shape in shape_strategy(), pick in 0usize..64) {
        let mut tree = build(&shape);
        let nodes: Vec<_> = std::iter::once(tree.root())
            .chain(tree.walk().filter_map(|e| match e {
                WalkEvent::Node { node, .. } => Some(node),
                _ => None,
            }))
            .collect();
        let parent = nodes[pick % nodes.len()];
        let before = tree.children(parent).to_vec();
        let added = tree.append_child(parent, Binding::new("fresh")).unwrap();
        let after = tree.children(parent);

        prop_assert_eq!(&after[..before.len()], before.as_slice());
        prop_assert_eq!(after.last().copied(), Some(added));
    }

    #[test]
    fn walk_levels_balance(shape in shape_strategy()) {
        let tree = build(&shape);
        let mut open = 0i64;
        let mut nodes = 0usize;
        for event in tree.walk() {
            match event {
                WalkEvent::EnterLevel { .. } => open += 1,
                WalkEvent::ExitLevel { .. } => open -= 1,
                WalkEvent::Node { .. } => nodes += 1,
            }
            prop_assert!(open >= 0);
        }
        prop_assert_eq!(open, 0);
        prop_assert_eq!(nodes, tree.binding_count() - 1);
        prop_assert_eq!(tree.section_labels().unwrap().len(), nodes);
    }
}

#[test]
fn single_level_outline_labels() {
    let tree = build(&[(0, true), (0, false), (0, true), (0, false), (0, false)]);
    let labels: Vec<String> = tree
        .section_labels()
        .unwrap()
        .into_iter()
        .map(|(_, l)| l.to_string())
        .collect();
    assert_eq!(labels, vec!["1", "1-1", "2", "2-1", "2-2"]);
}

#[test]
fn nested_outline_labels() {
    // heading > heading > leaf
    let tree = build(&[(0, true), (1, true), (2, false)]);
    let labels: Vec<String> = tree
        .section_labels()
        .unwrap()
        .into_iter()
        .map(|(_, l)| l.to_string())
        .collect();
    assert_eq!(labels, vec!["1", "1.1", "1.1-1"]);
}

#[test]
fn planned_binding_lands_in_first_heading() {
    let mut tree = build(&[(0, true), (0, true)]);
    let slot = FirstTopLevelSlot.locate(&tree).unwrap();
    let planner = InsertionPlanner::for_structure(&tree);
    let binding = planner
        .plan(
            &ResourceRef::new("https://rm/resources/NEW"),
            &ResourceRef::new("https://rm/resources/M"),
            &ResourceRef::new("https://rm/cm/component/C"),
        )
        .unwrap();
    let node = tree.insert(slot, binding).unwrap();

    let labels = tree.section_labels().unwrap();
    let (_, label) = labels.iter().find(|(n, _)| *n == node).unwrap();
    assert_eq!(label.as_str(), "1-1");
    assert_eq!(labels.last().unwrap().1.as_str(), "2");
}
