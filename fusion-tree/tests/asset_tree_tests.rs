use fusion_core::{
    needs_maintenance_soon, Asset, EntityId, FactoryAssetDetails, FactoryAssetDetailsWithFields,
    FieldDetails, OispAlertPriority,
};
use fusion_tree::{AssetTree, TreeRecord};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

fn details(id: EntityId, subsystems: Vec<EntityId>) -> FactoryAssetDetailsWithFields {
    FactoryAssetDetailsWithFields {
        details: FactoryAssetDetails::from_asset(
            Asset::new(id, 1, format!("asset-{id}")).with_subsystems(subsystems),
        ),
        fields: Vec::new(),
    }
}

fn flat_assets() -> impl Strategy<Value = Vec<Asset>> {
    prop::collection::btree_map(0i64..24, prop::collection::vec(0i64..30, 0..4), 0..24).prop_map(
        |by_id| {
            by_id
                .into_iter()
                .map(|(id, subsystems)| Asset::new(id, 1, "a").with_subsystems(subsystems))
                .collect()
        },
    )
}

#[test]
fn maintenance_flag_bubbles_up_from_subsystem() {
    let mut pump = details(3, Vec::new());
    pump.fields = vec![FieldDetails::new(1, "Days till maintenance", Some("9"))];
    let records = vec![details(1, vec![2]), details(2, vec![3]), pump, details(4, Vec::new())];

    let tree = AssetTree::build(&records, None);
    let line = tree.find(1).unwrap();
    let other = tree.find(4).unwrap();
    assert!(tree.children_need_maintenance(line, needs_maintenance_soon));
    assert!(!tree.children_need_maintenance(other, needs_maintenance_soon));
}

#[test]
fn alert_summary_uses_wire_priorities() {
    let mut parent = details(1, vec![2]);
    parent.details.open_alert_priority = Some(OispAlertPriority::Medium);
    let mut child = details(2, Vec::new());
    child.details.open_alert_priority = Some(OispAlertPriority::High);

    let mut tree = AssetTree::build(&[parent, child], None);
    let root = tree.roots()[0];
    assert_eq!(tree.max_open_alert_priority(root), Some(OispAlertPriority::High));
    tree.toggle(root);
    assert_eq!(tree.max_open_alert_priority(root), Some(OispAlertPriority::Medium));
}

proptest! {
    #[test]
    fn children_are_resolved_subsystems(assets in flat_assets()) {
        let tree = AssetTree::build(&assets, None);
        let known: HashSet<EntityId> = assets.iter().map(|a| a.id).collect();

        for (id, node) in tree.iter_depth_first() {
            let listed = node.record().subsystem_ids();
            let children: Vec<EntityId> = tree
                .children(id)
                .iter()
                .map(|child| tree.record(*child).unwrap().record_id())
                .collect();
            let unique: HashSet<EntityId> = children.iter().copied().collect();
            prop_assert_eq!(unique.len(), children.len());
            for child in &children {
                prop_assert!(listed.contains(child));
                prop_assert!(known.contains(child));
            }
            for child in tree.children(id) {
                prop_assert_eq!(tree.parent(*child), Some(id));
                prop_assert_eq!(tree.depth(*child), Some(node.depth() + 1));
            }
        }
    }

    #[test]
    fn roots_are_unreferenced(assets in flat_assets()) {
        let tree = AssetTree::build(&assets, None);
        let referenced: HashSet<EntityId> =
            assets.iter().flat_map(|a| a.subsystem_ids.iter().copied()).collect();
        for root in tree.roots() {
            let id = tree.record(*root).unwrap().id;
            prop_assert!(!referenced.contains(&id));
            prop_assert!(tree.node(*root).unwrap().is_root());
        }
    }

    #[test]
    fn expand_state_round_trips(assets in flat_assets(), picks in prop::collection::vec(any::<prop::sample::Index>(), 0..6)) {
        let mut tree = AssetTree::build(&assets, None);
        if !tree.is_empty() {
            let nodes: Vec<_> = tree.iter_depth_first().map(|(id, _)| id).collect();
            for pick in &picks {
                tree.set_expanded(*pick.get(&nodes), true);
            }
        }
        let expanded: BTreeSet<EntityId> = tree.expanded_ids();

        let rebuilt = AssetTree::build(&assets, Some(&tree));
        prop_assert_eq!(rebuilt.expanded_ids(), expanded);
    }
}
