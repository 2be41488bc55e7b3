use rszkit_testkit::{DAMAGE_CURVE, GAME_OBJECT, TRANSFORM, WEAPON_PARAM, WEAPON_SETTINGS, sample_prefab_block, sample_registry_json};

use crate::rsz::{
	ClassRegistry, ErrorKind, GameObjectInfo, GameObjectNode, Instance, InstanceHandle, ObjectGraph, RebuildOptions, RszBlock, RszError, Value,
};

fn registry() -> ClassRegistry {
	ClassRegistry::from_json_str(&sample_registry_json()).expect("registry parses")
}

fn info(object_id: i32, parent_id: i32, component_count: i32) -> GameObjectInfo {
	GameObjectInfo {
		object_id,
		parent_id,
		component_count,
	}
}

fn sample_infos() -> Vec<GameObjectInfo> {
	vec![info(0, -1, 2), info(3, 0, 1)]
}

fn sample_block(registry: &ClassRegistry) -> RszBlock {
	RszBlock::from_bytes(&sample_prefab_block(), registry, 71).expect("sample block reads")
}

fn add(block: &mut RszBlock, registry: &ClassRegistry, type_id: u32) -> InstanceHandle {
	let class = registry.get(type_id).expect("class registered").clone();
	block.add_instance(Instance::new(class)).expect("instance added")
}

fn h(ordinal: u32) -> InstanceHandle {
	InstanceHandle::new(ordinal)
}

mod build {
	use super::*;

	#[test]
	fn root_with_one_component_and_one_child() {
		let registry = registry();
		let mut block = RszBlock::new(16, 71);
		for type_id in [GAME_OBJECT, TRANSFORM, GAME_OBJECT] {
			let handle = add(&mut block, &registry, type_id);
			block.push_object(handle.get()).expect("object added");
		}

		let graph = ObjectGraph::build(&block, &[info(0, -1, 1), info(2, 0, 0)]).expect("graph builds");
		assert_eq!(graph.roots().len(), 1);
		let root = &graph.roots()[0];
		assert_eq!(root.object_id, Some(0));
		assert_eq!(root.parent, None);
		assert_eq!(root.components, vec![h(2)]);
		assert_eq!(root.children.len(), 1);

		let child = &root.children[0];
		assert_eq!(child.object_id, Some(2));
		assert_eq!(child.instance, h(3));
		assert_eq!(child.parent, Some(h(1)));
		assert!(child.components.is_empty());
		assert_eq!(graph.node_count(), 2);
	}

	#[test]
	fn sample_prefab_builds_expected_forest() {
		let registry = registry();
		let block = sample_block(&registry);
		let graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");

		let root = &graph.roots()[0];
		assert_eq!(root.instance, h(1));
		assert_eq!(root.components, vec![h(2), h(5)]);
		assert_eq!(root.children[0].components, vec![h(7)]);
		assert_eq!(graph.find_node(h(6)).map(|node| node.object_id), Some(Some(3)));
		assert!(graph.find_node(h(5)).is_none());
	}

	#[test]
	fn dangling_parent_is_a_reference_error() {
		let registry = registry();
		let block = sample_block(&registry);
		let err = ObjectGraph::build(&block, &[info(0, -1, 2), info(3, 5, 1)]).expect_err("dangling parent");
		assert!(matches!(err, RszError::DanglingParent { object_id: 3, parent_id: 5 }));
		assert_eq!(err.kind(), ErrorKind::Reference);
	}

	#[test]
	fn duplicate_object_id_is_rejected() {
		let registry = registry();
		let block = sample_block(&registry);
		let err = ObjectGraph::build(&block, &[info(0, -1, 0), info(0, -1, 0)]).expect_err("duplicate id");
		assert!(matches!(err, RszError::DuplicateObjectId { object_id: 0 }));
	}

	#[test]
	fn parent_cycle_is_rejected() {
		let registry = registry();
		let block = sample_block(&registry);
		let err = ObjectGraph::build(&block, &[info(0, 3, 0), info(3, 0, 0)]).expect_err("cycle");
		assert!(matches!(err, RszError::ParentCycle { object_id: 0 }));
	}

	#[test]
	fn positions_outside_the_object_table_are_rejected() {
		let registry = registry();
		let block = sample_block(&registry);
		let err = ObjectGraph::build(&block, &[info(9, -1, 0)]).expect_err("object id out of range");
		assert!(matches!(err, RszError::ObjectIndexOutOfRange { index: 9, len: 5 }));

		let err = ObjectGraph::build(&block, &[info(3, -1, 4)]).expect_err("components out of range");
		assert!(matches!(err, RszError::ObjectIndexOutOfRange { index: 5, len: 5 }));
	}
}

mod rebuild {
	use super::*;

	#[test]
	fn consistent_tree_rebuild_is_a_no_op() {
		let registry = registry();
		let bytes = sample_prefab_block();
		let mut block = RszBlock::from_bytes(&bytes, &registry, 71).expect("block reads");
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		let before = graph.clone();

		let result = graph.rebuild(&mut block, &RebuildOptions::default()).expect("rebuild succeeds");
		assert_eq!(result.pruned, 0);
		assert_eq!(result.infos, sample_infos());
		assert_eq!(block.object_table(), &[1, 2, 5, 6, 7]);
		assert_eq!(graph, before);
		assert_eq!(block.to_bytes().expect("block writes"), bytes);
		let mut object_ids: Vec<_> = result.object_ids.into_iter().collect();
		object_ids.sort_unstable();
		assert_eq!(object_ids, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
	}

	#[test]
	fn removed_component_is_pruned_with_its_sub_instances() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		graph.roots_mut()[0].components.retain(|component| *component != h(5));

		let result = graph.rebuild(&mut block, &RebuildOptions::default()).expect("rebuild succeeds");
		assert_eq!(result.pruned, 3);
		assert_eq!(block.instances().len(), 5);
		assert_eq!(block.object_table(), &[1, 2, 3, 4]);
		assert_eq!(result.infos, vec![info(0, -1, 1), info(2, 0, 1)]);
		assert_eq!(block.user_data_entries().count(), 0);
		assert_eq!(result.object_ids.get(&3), Some(&2));
		assert_eq!(result.object_ids.get(&4), Some(&3));
		assert_eq!(result.object_ids.get(&2), None);

		let child = block.instance(3).expect("child object");
		assert_eq!(child.get_field("v0").expect("name").as_str(), Some("Child"));
		assert_eq!(child.ordinal(), Some(3));
	}

	#[test]
	fn referenced_instances_precede_their_referrer() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");

		let param = add(&mut block, &registry, WEAPON_PARAM);
		let curve = add(&mut block, &registry, DAMAGE_CURVE);
		block
			.instance_mut(param.get())
			.expect("param")
			.set_field("settings", Value::Ref(curve.get()))
			.expect("ref set");
		let node_identity = add(&mut block, &registry, GAME_OBJECT);
		let mut node = GameObjectNode::new(node_identity);
		node.components.push(param);
		graph.roots_mut()[0].push_child(node);

		let result = graph.rebuild(&mut block, &RebuildOptions::default()).expect("rebuild succeeds");
		assert_eq!(result.pruned, 0);
		assert_eq!(result.infos.len(), 3);
		assert_eq!(result.infos[2], info(5, 0, 1));

		let names: Vec<_> = block.instances()[8..].iter().map(Instance::name).collect();
		assert_eq!(names, ["via.GameObject", "app.DamageCurve", "app.WeaponParam"]);
		assert_eq!(block.instance(10).expect("param").get_field("settings").expect("settings"), &Value::Ref(9));
		assert_eq!(block.object_table(), &[1, 2, 5, 6, 7, 8, 10]);
	}

	#[test]
	fn rebuilt_tables_build_an_isomorphic_tree() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		let extra = add(&mut block, &registry, GAME_OBJECT);
		graph.roots_mut()[0].children[0].push_child(GameObjectNode::new(extra));

		let result = graph.rebuild(&mut block, &RebuildOptions::default()).expect("rebuild succeeds");
		let rebuilt = ObjectGraph::build(&block, &result.infos).expect("tables rebuild a tree");
		assert_eq!(rebuilt, graph);

		let grandchild = &rebuilt.roots()[0].children[0].children[0];
		assert_eq!(block.instance(grandchild.instance.get()).expect("grandchild").name(), "via.GameObject");
		assert_eq!(grandchild.parent, Some(rebuilt.roots()[0].children[0].instance));
	}

	#[test]
	fn null_identity_fails_and_leaves_tables_untouched() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		graph.roots_mut()[0].push_child(GameObjectNode::new(InstanceHandle::NULL));

		let err = graph.rebuild(&mut block, &RebuildOptions::default()).expect_err("null identity");
		assert!(matches!(err, RszError::NullInstanceInTree));
		assert_eq!(block.instances().len(), 8);
		assert_eq!(block.object_table(), &[1, 2, 5, 6, 7]);
	}

	#[test]
	fn dangling_reference_fails_the_rebuild() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		block
			.instance_mut(5)
			.expect("param")
			.set_field("settings", Value::Ref(40))
			.expect("ref set");

		let err = graph.rebuild(&mut block, &RebuildOptions::default()).expect_err("dangling ref");
		assert!(matches!(err, RszError::OrdinalOutOfRange { ordinal: 40, len: 8 }));
	}

	#[test]
	fn nested_components_can_stay_out_of_the_object_table() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		let options = RebuildOptions {
			register_nested_components: false,
		};

		let result = graph.rebuild(&mut block, &options).expect("rebuild succeeds");
		assert_eq!(result.pruned, 0);
		assert_eq!(result.infos, vec![info(0, -1, 2), info(3, 0, 0)]);
		assert_eq!(block.object_table(), &[1, 2, 5, 6]);
		assert_eq!(graph.roots()[0].children[0].components, vec![h(7)]);

		let again = graph.rebuild(&mut block, &options).expect("second rebuild succeeds");
		assert_eq!(again.pruned, 0);
		assert_eq!(again.infos, result.infos);
		assert_eq!(block.instances().len(), 8);
		assert_eq!(block.object_table(), &[1, 2, 5, 6]);
		assert_eq!(graph.roots()[0].children[0].components, vec![h(7)]);
	}

	#[test]
	fn repeated_node_is_visited_once() {
		let registry = registry();
		let mut block = sample_block(&registry);
		let mut graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		let copy = graph.roots()[0].children[0].clone();
		graph.roots_mut().push(copy);

		let result = graph.rebuild(&mut block, &RebuildOptions::default()).expect("rebuild succeeds");
		assert_eq!(result.infos, sample_infos());
		assert_eq!(graph.node_count(), 2);
	}
}

mod adapt {
	use super::*;

	#[test]
	fn copies_subtree_into_a_fresh_arena() {
		let registry = registry();
		let block = sample_block(&registry);
		let graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");

		let adapted = ObjectGraph::adapt(block.instances(), &graph.roots()[0]).expect("tree adapts");
		assert_eq!(adapted.instances.len(), 8);
		assert!(adapted.instances[0].is_null());
		assert_eq!(adapted.root.object_id, None);
		assert_eq!(adapted.root.parent, None);
		assert_eq!(adapted.root.components, vec![h(2), h(3)]);
		assert_eq!(adapted.root.children[0].instance, h(6));
		assert_eq!(adapted.root.children[0].parent, Some(h(1)));
		assert_eq!(adapted.root.children[0].object_id, None);

		let param = &adapted.instances[3];
		assert_eq!(param.type_id(), WEAPON_PARAM);
		assert_eq!(param.ordinal(), None);
		assert_eq!(param.references(), vec![4, 5]);

		let settings = &adapted.instances[5];
		assert_eq!(settings.type_id(), WEAPON_SETTINGS);
		let entry = settings.user_data().expect("user data reattached");
		assert_eq!(entry.instance_id, 0);
		assert_eq!(block.user_data_for(4).expect("source entry").instance_id, 4);
	}

	#[test]
	fn adapted_child_rebuilds_as_its_own_root() {
		let registry = registry();
		let block = sample_block(&registry);
		let graph = ObjectGraph::build(&block, &sample_infos()).expect("graph builds");
		let adapted = ObjectGraph::adapt(block.instances(), &graph.roots()[0].children[0]).expect("tree adapts");

		let mut target = RszBlock::from_arena(16, 71, adapted.instances);
		let mut target_graph = ObjectGraph::from_roots(vec![adapted.root]);
		let result = target_graph.rebuild(&mut target, &RebuildOptions::default()).expect("rebuild succeeds");
		assert_eq!(result.pruned, 0);
		assert_eq!(result.infos, vec![info(0, -1, 1)]);
		assert_eq!(target.object_table(), &[1, 2]);
		assert_eq!(target.instance(1).expect("identity").get_field("v0").expect("name").as_str(), Some("Child"));
	}

	#[test]
	fn null_component_cannot_be_adapted() {
		let registry = registry();
		let block = sample_block(&registry);
		let mut node = GameObjectNode::new(h(1));
		node.components.push(InstanceHandle::NULL);
		let err = ObjectGraph::adapt(block.instances(), &node).expect_err("null component");
		assert!(matches!(err, RszError::NullInstanceInTree));
	}
}
