use crate::rsz::bytes::{Cursor, Writer};
use crate::rsz::{ErrorKind, RszError};

#[test]
fn reads_little_endian_scalars_in_order() {
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&0x1122_3344_u32.to_le_bytes());
	bytes.extend_from_slice(&(-7_i32).to_le_bytes());
	bytes.extend_from_slice(&0x0102_0304_0506_0708_u64.to_le_bytes());

	let mut cursor = Cursor::new(&bytes);
	assert_eq!(cursor.read_u32().expect("u32"), 0x1122_3344);
	assert_eq!(cursor.read_i32().expect("i32"), -7);
	assert_eq!(cursor.read_u64().expect("u64"), 0x0102_0304_0506_0708);
	assert_eq!(cursor.remaining(), 0);
}

#[test]
fn read_past_end_is_io_boundary_error() {
	let bytes = [1_u8, 2, 3];
	let mut cursor = Cursor::new(&bytes);
	let err = cursor.read_u32().expect_err("short buffer");
	assert!(matches!(err, RszError::UnexpectedEof { at: 0, need: 4, rem: 3 }));
	assert_eq!(err.kind(), ErrorKind::IoBoundary);
}

#[test]
fn child_cursor_positions_are_relative_to_base() {
	let mut bytes = vec![0xFF_u8; 8];
	bytes.extend_from_slice(&42_u32.to_le_bytes());
	bytes.extend_from_slice(&[0, 0, 0, 0]);
	bytes.extend_from_slice(&99_u32.to_le_bytes());

	let cursor = Cursor::new(&bytes);
	let mut child = cursor.with_base(8).expect("base in range");
	assert_eq!(child.tell(), 0);
	assert_eq!(child.base(), 8);
	assert_eq!(child.read_u32().expect("first"), 42);
	child.seek(8).expect("seek within child");
	assert_eq!(child.read_u32().expect("second"), 99);
}

#[test]
fn align_skips_to_multiple_relative_to_base() {
	let bytes = [0_u8; 32];
	let cursor = Cursor::new(&bytes);
	let mut child = cursor.with_base(3).expect("base in range");
	child.read_u8().expect("one byte");
	child.align(4).expect("align");
	assert_eq!(child.tell(), 4);
	child.align(4).expect("already aligned");
	assert_eq!(child.tell(), 4);
}

#[test]
fn wide_string_at_offset_does_not_move_cursor() {
	let mut writer = Writer::new();
	writer.write_u32(7);
	writer.write_wstring("path/to.user");
	let bytes = writer.into_bytes();

	let mut cursor = Cursor::new(&bytes);
	let text = cursor.read_wstring_at(4).expect("string reads");
	assert_eq!(text, "path/to.user");
	assert_eq!(cursor.tell(), 0);
	assert_eq!(cursor.read_u32().expect("u32"), 7);
}

#[test]
fn unterminated_wide_string_is_rejected() {
	let bytes = [b'a', 0, b'b', 0];
	let cursor = Cursor::new(&bytes);
	let err = cursor.read_wstring_at(0).expect_err("no terminator");
	assert!(matches!(err, RszError::UnterminatedString { at: 0 }));
}

#[test]
fn writer_align_pads_with_zeros() {
	let mut writer = Writer::new();
	writer.write_u8(0xAB);
	writer.align(16);
	assert_eq!(writer.tell() % 16, 0);
	assert_eq!(writer.tell(), 16);
	let bytes = writer.into_bytes();
	assert!(bytes[1..].iter().all(|byte| *byte == 0));
}

#[test]
fn deferred_strings_patch_placeholders_on_flush() {
	let mut writer = Writer::new();
	let first = writer.defer_wstring("a");
	let second = writer.defer_wstring("bc");
	assert_eq!(writer.pending_strings(), 2);
	writer.flush_deferred_strings().expect("flush");
	assert_eq!(writer.pending_strings(), 0);

	let bytes = writer.into_bytes();
	let mut cursor = Cursor::new(&bytes);
	cursor.seek(first.position()).expect("seek");
	let first_offset = cursor.read_u64().expect("offset");
	cursor.seek(second.position()).expect("seek");
	let second_offset = cursor.read_u64().expect("offset");

	assert_eq!(first_offset, 16);
	assert_eq!(second_offset, 20);
	assert_eq!(cursor.read_wstring_at(first_offset).expect("first"), "a");
	assert_eq!(cursor.read_wstring_at(second_offset).expect("second"), "bc");
}

#[test]
fn first_flush_without_strings_is_allowed_second_is_not() {
	let mut writer = Writer::new();
	writer.flush_deferred_strings().expect("empty first flush");
	let err = writer.flush_deferred_strings().expect_err("second empty flush");
	assert!(matches!(err, RszError::StringTableEmpty));
}

#[test]
fn patch_keeps_write_position() {
	let mut writer = Writer::new();
	writer.write_u64(0);
	writer.write_u32(5);
	writer.patch_u64(0, 0xDEAD_BEEF);
	assert_eq!(writer.tell(), 12);

	let bytes = writer.into_bytes();
	let mut cursor = Cursor::new(&bytes);
	assert_eq!(cursor.read_u64().expect("patched"), 0xDEAD_BEEF);
	assert_eq!(cursor.read_u32().expect("tail"), 5);
}

#[test]
fn append_aligned_returns_block_start() {
	let mut writer = Writer::new();
	writer.write_bytes(&[1, 2, 3]);
	let start = writer.append_aligned(&[9, 9], 16);
	assert_eq!(start, 16);
	assert_eq!(writer.len(), 18);
}

#[test]
fn invalid_utf16_path_is_rejected() {
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&0xD800_u16.to_le_bytes());
	bytes.extend_from_slice(&0_u16.to_le_bytes());
	let err = Cursor::new(&bytes).read_wstring_at(0).expect_err("lone surrogate");
	assert!(matches!(err, RszError::InvalidUtf16 { at: 0 }));
	assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn raw_utf16_units_round_trip() {
	let mut writer = Writer::new();
	writer.write_utf16(&[0xDC00, 0x0041]);
	let bytes = writer.into_bytes();
	assert_eq!(bytes.len(), 4);
	let mut cursor = Cursor::new(&bytes);
	assert_eq!(cursor.read_utf16(2).expect("units"), vec![0xDC00, 0x0041]);
	assert_eq!(cursor.remaining(), 0);
}
