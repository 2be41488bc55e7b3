use rszkit_testkit::{GAME_OBJECT, WEAPON_PARAM, WEAPON_PARAM_CRC, sample_registry_json};

use crate::rsz::{ClassRegistry, ErrorKind, FieldKind, GameProfile, RszError};

#[test]
fn sample_descriptor_resolves_by_id_and_name() {
	let registry = ClassRegistry::from_json_str(&sample_registry_json()).expect("registry parses");

	let by_id = registry.lookup(WEAPON_PARAM).expect("class by id");
	assert_eq!(by_id.name.as_ref(), "app.WeaponParam");
	assert_eq!(by_id.crc, WEAPON_PARAM_CRC);

	let by_name = registry.lookup_by_name("app.WeaponParam").expect("class by name");
	assert_eq!(by_name.type_id, WEAPON_PARAM);

	let (index, tags) = by_id.field("tags").expect("tags field");
	assert_eq!(index, 2);
	assert_eq!(tags.kind, FieldKind::String);
	assert!(tags.array);
}

#[test]
fn unknown_type_tags_become_raw_compounds() {
	let registry = ClassRegistry::from_json_str(&sample_registry_json()).expect("registry parses");
	let transform = registry.get_by_name("via.Transform").expect("transform");
	let (_, position) = transform.field("v0").expect("position");
	assert_eq!(position.kind, FieldKind::Raw);
	assert_eq!(position.size, 16);
	assert_eq!(position.align, 16);
	assert_eq!(position.type_tag.as_ref(), "Vec4");
}

#[test]
fn missing_class_reports_not_found() {
	let registry = ClassRegistry::from_json_str(&sample_registry_json()).expect("registry parses");
	assert!(registry.lookup(0xDEAD_BEEF).is_none());
	let err = registry.get(0xDEAD_BEEF).expect_err("missing class");
	assert!(matches!(err, RszError::ClassNotFound { ref key } if key == "0xdeadbeef"));
	assert_eq!(err.kind(), ErrorKind::Schema);
	assert!(registry.lookup(GAME_OBJECT).is_some());
}

#[test]
fn duplicate_type_ids_after_hex_parse_are_rejected() {
	let text = r#"{
		"1a": { "name": "a.One", "crc": "1", "fields": [] },
		"0x1A": { "name": "a.Two", "crc": "2", "fields": [] }
	}"#;
	let err = ClassRegistry::from_json_str(text).expect_err("duplicate id");
	assert!(matches!(err, RszError::RegistryInvalid { .. }));
}

#[test]
fn fixed_width_size_mismatch_is_rejected() {
	let text = r#"{
		"10": { "name": "a.Bad", "crc": "0", "fields": [
			{ "name": "v0", "type": "S32", "size": 2, "align": 4 }
		] }
	}"#;
	let err = ClassRegistry::from_json_str(text).expect_err("bad size");
	assert!(matches!(err, RszError::RegistryInvalid { .. }));
}

#[test]
fn malformed_json_is_a_registry_error() {
	let err = ClassRegistry::from_json_str("{ not json").expect_err("bad json");
	assert!(matches!(err, RszError::RegistryJson(_)));
}

#[test]
fn profile_resolves_descriptor_file_name() {
	let profile = GameProfile::for_game("re4").expect("known game");
	let dir = rszkit_testkit::scratch_dir("registry_profile");
	std::fs::write(dir.join("rszre4.json"), sample_registry_json()).expect("descriptor written");

	let registry = ClassRegistry::load_for_profile(&dir, &profile).expect("registry loads");
	assert!(registry.len() >= 5);
}
