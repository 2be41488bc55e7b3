use rszkit_testkit::{
	BlockLayout, ByteBuf, GAME_OBJECT, GAME_OBJECT_CRC, PfbLayout, SETTINGS_PATH, TRANSFORM, TRANSFORM_CRC, UserDataLayout, WEAPON_SETTINGS, WEAPON_SETTINGS_CRC, pfb,
	put_game_object, put_transform, rsz_block, sample_pfb, sample_prefab_block, sample_registry_json, scratch_dir,
};

use crate::rsz::{
	ClassRegistry, ContainerState, ErrorKind, GameObjectNode, GameObjectRefInfo, GameProfile, Instance, PfbFile, RszError, Value,
};

fn registry() -> ClassRegistry {
	ClassRegistry::from_json_str(&sample_registry_json()).expect("registry parses")
}

fn re4() -> GameProfile {
	GameProfile::for_game("re4").expect("re4 profile")
}

fn open_sample(registry: &ClassRegistry) -> PfbFile {
	PfbFile::from_bytes(&sample_pfb(), re4(), registry).expect("sample prefab reads")
}

#[test]
fn reads_side_tables_and_block() {
	let registry = registry();
	let file = open_sample(&registry);
	assert_eq!(file.state(), ContainerState::Loaded);
	assert_eq!(file.game_object_infos().len(), 2);
	assert_eq!(
		file.ref_infos(),
		&[GameObjectRefInfo {
			object_id: 0,
			property_id: 7,
			array_index: -1,
			target_id: 3,
		}]
	);
	assert_eq!(file.resources()[0].path, "weapon/model.mesh");
	assert_eq!(file.userdata_infos()[0].path, SETTINGS_PATH);
	assert_eq!(file.userdata_infos()[0].crc, WEAPON_SETTINGS_CRC);
	assert_eq!(file.block().instances().len(), 8);
	assert_eq!(file.extension(), ".pfb.17");
}

#[test]
fn unmodified_prefab_round_trips_byte_exact() {
	let registry = registry();
	let bytes = sample_pfb();
	let file = PfbFile::from_bytes(&bytes, re4(), &registry).expect("prefab reads");
	assert_eq!(file.to_bytes().expect("prefab writes"), bytes);
}

#[test]
fn one_root_with_one_component_and_one_child() {
	let payload = |buf: &mut ByteBuf| {
		put_game_object(buf, "Parent", true, 1.0);
		put_transform(buf, [0.0; 4], [0.0, 0.0, 0.0, 1.0]);
		put_game_object(buf, "Kid", true, 1.0);
	};
	let bytes = pfb(&PfbLayout {
		infos: vec![(0, -1, 1), (2, 0, 0)],
		ref_infos: Vec::new(),
		resources: Vec::new(),
		userdata: Vec::new(),
		rsz: rsz_block(&BlockLayout {
			version: 16,
			object_table: vec![1, 2, 3],
			directory: vec![(0, 0), (GAME_OBJECT, GAME_OBJECT_CRC), (TRANSFORM, TRANSFORM_CRC), (GAME_OBJECT, GAME_OBJECT_CRC)],
			user_data: UserDataLayout::Modern(Vec::new()),
			payload: &payload,
		}),
	});

	let registry = registry();
	let mut file = PfbFile::from_bytes(&bytes, re4(), &registry).expect("prefab reads");
	let roots = file.root_objects().expect("tree builds").to_vec();
	assert_eq!(roots.len(), 1);
	assert_eq!(roots[0].components.len(), 1);
	assert_eq!(file.block().object_table()[1], roots[0].components[0].get());
	assert_eq!(roots[0].children.len(), 1);
	assert_eq!(file.state(), ContainerState::TreeBuilt);
	assert_eq!(file.to_bytes().expect("tree-built prefab writes"), bytes);
}

#[test]
fn state_machine_blocks_writes_until_rebuild() {
	let registry = registry();
	let mut file = open_sample(&registry);
	file.root_objects().expect("tree builds");
	assert_eq!(file.state(), ContainerState::TreeBuilt);

	file.root_objects_mut().expect("tree editable")[0].components.pop();
	assert!(file.is_dirty());
	let err = file.to_bytes().expect_err("dirty write");
	assert!(matches!(err, RszError::InvalidState { op: "write", state: "dirty" }));
	assert_eq!(err.kind(), ErrorKind::Usage);

	let pruned = file.rebuild().expect("rebuild succeeds");
	assert_eq!(pruned, 3);
	assert_eq!(file.state(), ContainerState::Writable);
	assert!(file.userdata_infos().is_empty());
	assert_eq!(file.ref_infos()[0].target_id, 2);
	assert_eq!(file.dropped_ref_infos(), 0);

	let path = scratch_dir("pfb_state_machine").join("edited.pfb.17");
	file.write(&path).expect("prefab written");
	assert_eq!(file.state(), ContainerState::Written);

	let reread = PfbFile::open(&path, re4(), &registry).expect("written prefab reads");
	assert_eq!(reread.block().instances().len(), 5);
	assert_eq!(reread.game_object_infos(), file.game_object_infos());
}

#[test]
fn consistent_rebuild_keeps_bytes() {
	let registry = registry();
	let bytes = sample_pfb();
	let mut file = PfbFile::from_bytes(&bytes, re4(), &registry).expect("prefab reads");
	assert_eq!(file.rebuild().expect("rebuild succeeds"), 0);
	assert_eq!(file.to_bytes().expect("prefab writes"), bytes);
}

#[test]
fn rebuild_keeps_references_between_components() {
	let bytes = pfb(&PfbLayout {
		infos: vec![(0, -1, 2), (3, 0, 1)],
		ref_infos: vec![(2, 7, -1, 4), (1, 3, 0, 3)],
		resources: vec!["weapon/model.mesh"],
		userdata: vec![(WEAPON_SETTINGS, WEAPON_SETTINGS_CRC, SETTINGS_PATH)],
		rsz: sample_prefab_block(),
	});
	let registry = registry();
	let mut file = PfbFile::from_bytes(&bytes, re4(), &registry).expect("prefab reads");
	let before = file.ref_infos().to_vec();

	assert_eq!(file.rebuild().expect("rebuild succeeds"), 0);
	assert_eq!(file.ref_infos(), before.as_slice());
	assert_eq!(file.dropped_ref_infos(), 0);
	assert_eq!(file.to_bytes().expect("prefab writes"), bytes);
}

#[test]
fn rebuild_drops_references_to_pruned_components() {
	let bytes = pfb(&PfbLayout {
		infos: vec![(0, -1, 2), (3, 0, 1)],
		ref_infos: vec![(2, 7, -1, 4), (0, 7, -1, 3)],
		resources: vec!["weapon/model.mesh"],
		userdata: vec![(WEAPON_SETTINGS, WEAPON_SETTINGS_CRC, SETTINGS_PATH)],
		rsz: sample_prefab_block(),
	});
	let registry = registry();
	let mut file = PfbFile::from_bytes(&bytes, re4(), &registry).expect("prefab reads");
	file.root_objects_mut().expect("tree editable")[0].components.pop();

	assert_eq!(file.rebuild().expect("rebuild succeeds"), 3);
	assert_eq!(file.dropped_ref_infos(), 1);
	assert_eq!(
		file.ref_infos(),
		&[GameObjectRefInfo {
			object_id: 0,
			property_id: 7,
			array_index: -1,
			target_id: 2,
		}]
	);
}

#[test]
fn field_edit_then_rebuild_round_trips() {
	let registry = registry();
	let mut file = open_sample(&registry);
	file.block_mut()
		.instance_mut(1)
		.expect("root object")
		.set_field("v0", Value::String("Renamed".to_owned()))
		.expect("name set");
	assert!(file.to_bytes().is_err());
	file.rebuild().expect("rebuild succeeds");

	let written = file.to_bytes().expect("prefab writes");
	let reread = PfbFile::from_bytes(&written, re4(), &registry).expect("prefab rereads");
	assert_eq!(reread.block().instance(1).expect("root").get_field("v0").expect("name").as_str(), Some("Renamed"));
}

#[test]
fn new_child_is_registered_on_rebuild() {
	let registry = registry();
	let mut file = open_sample(&registry);
	let class = registry.get(GAME_OBJECT).expect("game object class").clone();
	let handle = file.add_instance(Instance::new(class)).expect("instance added");
	file.root_objects_mut().expect("tree editable")[0].push_child(GameObjectNode::new(handle));

	assert_eq!(file.rebuild().expect("rebuild succeeds"), 0);
	assert_eq!(file.game_object_infos().len(), 3);
	assert_eq!(file.block().object_table().len(), 6);
	assert_eq!(file.graph().expect("graph kept").node_count(), 3);
}

#[test]
fn prefab_from_scene_object_copies_subtree() {
	let registry = registry();
	let mut scene = open_sample(&registry);
	let root = scene.root_objects().expect("tree builds")[0].clone();

	let prefab = PfbFile::from_game_object(re4(), scene.block(), &root).expect("prefab adapts");
	assert_eq!(prefab.state(), ContainerState::Writable);
	assert_eq!(prefab.block().instances().len(), 8);
	assert_eq!(prefab.game_object_infos().len(), 2);
	assert_eq!(prefab.userdata_infos().len(), 1);
	assert_eq!(prefab.userdata_infos()[0].type_id, WEAPON_SETTINGS);
	assert_eq!(prefab.block().user_data_for(4).expect("entry").instance_id, 4);

	let bytes = prefab.to_bytes().expect("prefab writes");
	let reread = PfbFile::from_bytes(&bytes, re4(), &registry).expect("prefab rereads");
	assert_eq!(reread.block().instances().len(), 8);
}

#[test]
fn bad_magic_leaves_container_unloaded() {
	let registry = registry();
	let mut bytes = sample_pfb();
	bytes[0] = 0;
	let err = PfbFile::from_bytes(&bytes, re4(), &registry).expect_err("bad magic");
	assert!(matches!(err, RszError::BadMagic { container: "PFB", .. }));

	let mut file = open_sample(&registry);
	assert!(file.read(&bytes, &registry).is_err());
	assert_eq!(file.state(), ContainerState::Unloaded);
	assert!(file.block().instances().len() == 1);
	assert!(matches!(file.to_bytes(), Err(RszError::InvalidState { state: "unloaded", .. })));
}
