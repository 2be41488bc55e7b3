use crate::rsz::{Result, RszError};

/// Fixed-size little-endian on-disk record.
pub trait Record: Sized {
	/// Encoded size in bytes.
	const SIZE: usize;

	/// Read one record at the cursor position.
	fn read(cursor: &mut Cursor<'_>) -> Result<Self>;

	/// Append one record at the writer position.
	fn write(&self, writer: &mut Writer);
}

/// Bounded reader over an immutable byte slice, anchored at a base offset.
///
/// Positions reported by [`Cursor::tell`] and accepted by [`Cursor::seek`] are
/// relative to the base, so a cursor created with [`Cursor::with_base`] reads an
/// embedded container as if it started at offset 0.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	bytes: &'a [u8],
	base: usize,
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0 with base 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, base: 0, pos: 0 }
	}

	/// Create a child cursor whose position 0 is `offset` relative to this cursor's base.
	pub fn with_base(&self, offset: usize) -> Result<Cursor<'a>> {
		let base = self.base.checked_add(offset).ok_or(RszError::UnexpectedEof {
			at: usize::MAX,
			need: 0,
			rem: 0,
		})?;
		if base > self.bytes.len() {
			return Err(RszError::UnexpectedEof {
				at: base,
				need: 0,
				rem: 0,
			});
		}
		Ok(Cursor {
			bytes: self.bytes,
			base,
			pos: 0,
		})
	}

	/// Return the current position relative to the base.
	pub fn tell(&self) -> usize {
		self.pos
	}

	/// Return the absolute base offset of this cursor.
	pub fn base(&self) -> usize {
		self.base
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.base + self.pos)
	}

	/// Move to `pos`, relative to the base.
	pub fn seek(&mut self, pos: usize) -> Result<()> {
		let abs = self.base.saturating_add(pos);
		if abs > self.bytes.len() {
			return Err(RszError::UnexpectedEof {
				at: abs,
				need: 0,
				rem: 0,
			});
		}
		self.pos = pos;
		Ok(())
	}

	/// Seek to an on-disk `u64` offset.
	pub fn seek_u64(&mut self, pos: u64) -> Result<()> {
		let pos = usize::try_from(pos).map_err(|_| RszError::UnexpectedEof {
			at: usize::MAX,
			need: 0,
			rem: self.remaining(),
		})?;
		self.seek(pos)
	}

	/// Skip forward to the next multiple of `n` relative to the base.
	pub fn align(&mut self, n: usize) -> Result<()> {
		let skip = padding_for(self.pos, n);
		let _ = self.read_exact(skip)?;
		Ok(())
	}

	/// Read exactly `n` bytes and advance the cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		let start = self.base + self.pos;
		if n > self.remaining() {
			return Err(RszError::UnexpectedEof {
				at: start,
				need: n,
				rem: self.remaining(),
			});
		}

		self.pos += n;
		Ok(&self.bytes[start..start + n])
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut out = [0_u8; N];
		out.copy_from_slice(raw);
		Ok(out)
	}

	/// Read a `u8`.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_array::<1>()?[0])
	}

	/// Read a little-endian `u16`.
	pub fn read_u16(&mut self) -> Result<u16> {
		self.read_array().map(u16::from_le_bytes)
	}

	/// Read a little-endian `u32`.
	pub fn read_u32(&mut self) -> Result<u32> {
		self.read_array().map(u32::from_le_bytes)
	}

	/// Read a little-endian `i32`.
	pub fn read_i32(&mut self) -> Result<i32> {
		self.read_array().map(i32::from_le_bytes)
	}

	/// Read a little-endian `u64`.
	pub fn read_u64(&mut self) -> Result<u64> {
		self.read_array().map(u64::from_le_bytes)
	}

	/// Read a little-endian `i64`.
	pub fn read_i64(&mut self) -> Result<i64> {
		self.read_array().map(i64::from_le_bytes)
	}

	/// Read a fixed-size record.
	pub fn read_record<R: Record>(&mut self) -> Result<R> {
		R::read(self)
	}

	/// Read `count` consecutive records.
	pub fn read_records<R: Record>(&mut self, count: usize) -> Result<Vec<R>> {
		let mut out = Vec::with_capacity(count.min(self.remaining() / R::SIZE.max(1)));
		for _ in 0..count {
			out.push(R::read(self)?);
		}
		Ok(out)
	}

	/// Read `units` raw UTF-16 code units in place.
	pub fn read_utf16(&mut self, units: usize) -> Result<Vec<u16>> {
		let need = units.checked_mul(2).ok_or(RszError::UnexpectedEof {
			at: self.base + self.pos,
			need: usize::MAX,
			rem: self.remaining(),
		})?;
		let raw = self.read_exact(need)?;
		Ok(raw.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect())
	}

	/// Read a NUL-terminated UTF-16 string at `offset` without moving the cursor.
	pub fn read_wstring_at(&self, offset: u64) -> Result<String> {
		let start = usize::try_from(offset)
			.ok()
			.and_then(|offset| self.base.checked_add(offset))
			.filter(|start| *start <= self.bytes.len())
			.ok_or(RszError::UnexpectedEof {
				at: usize::MAX,
				need: 2,
				rem: 0,
			})?;

		let mut chars = Vec::new();
		for pair in self.bytes[start..].chunks_exact(2) {
			let unit = u16::from_le_bytes([pair[0], pair[1]]);
			if unit == 0 {
				return String::from_utf16(&chars).map_err(|_| RszError::InvalidUtf16 { at: start });
			}
			chars.push(unit);
		}
		Err(RszError::UnterminatedString { at: start })
	}
}

/// Growable little-endian writer with deferred string placement.
///
/// Strings registered through [`Writer::defer_wstring`] get an 8-byte offset
/// placeholder at the current position; [`Writer::flush_deferred_strings`]
/// appends the string bodies and patches every placeholder.
#[derive(Debug, Default)]
pub struct Writer {
	buf: Vec<u8>,
	pos: usize,
	pending: Vec<DeferredString>,
	flushed: bool,
}

/// Placeholder for a string whose offset is patched on flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredSlot(usize);

impl DeferredSlot {
	/// Position of the 8-byte offset placeholder.
	pub fn position(self) -> usize {
		self.0
	}
}

#[derive(Debug)]
struct DeferredString {
	slot: DeferredSlot,
	text: String,
}

impl Writer {
	/// Create an empty writer.
	pub fn new() -> Self {
		Self::default()
	}

	/// Return the current write position.
	pub fn tell(&self) -> usize {
		self.pos
	}

	/// Return the number of bytes written so far.
	pub fn len(&self) -> usize {
		self.buf.len()
	}

	/// Whether nothing has been written yet.
	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	/// Move to `pos`, zero-filling when it lies past the end.
	pub fn seek(&mut self, pos: usize) {
		if pos > self.buf.len() {
			self.buf.resize(pos, 0);
		}
		self.pos = pos;
	}

	/// Seek to the end of the written data.
	pub fn seek_end(&mut self) {
		self.pos = self.buf.len();
	}

	/// Write raw bytes at the current position.
	pub fn write_bytes(&mut self, bytes: &[u8]) {
		let end = self.pos + bytes.len();
		if end > self.buf.len() {
			self.buf.resize(end, 0);
		}
		self.buf[self.pos..end].copy_from_slice(bytes);
		self.pos = end;
	}

	/// Write zero bytes up to the next multiple of `n`.
	pub fn align(&mut self, n: usize) {
		let pad = padding_for(self.pos, n);
		if pad > 0 {
			self.write_bytes(&vec![0_u8; pad]);
		}
	}

	/// Write a `u8`.
	pub fn write_u8(&mut self, value: u8) {
		self.write_bytes(&[value]);
	}

	/// Write a little-endian `u16`.
	pub fn write_u16(&mut self, value: u16) {
		self.write_bytes(&value.to_le_bytes());
	}

	/// Write a little-endian `u32`.
	pub fn write_u32(&mut self, value: u32) {
		self.write_bytes(&value.to_le_bytes());
	}

	/// Write a little-endian `i32`.
	pub fn write_i32(&mut self, value: i32) {
		self.write_bytes(&value.to_le_bytes());
	}

	/// Write a little-endian `u64`.
	pub fn write_u64(&mut self, value: u64) {
		self.write_bytes(&value.to_le_bytes());
	}

	/// Write a little-endian `i64`.
	pub fn write_i64(&mut self, value: i64) {
		self.write_bytes(&value.to_le_bytes());
	}

	/// Write a record at the current position.
	pub fn write_record<R: Record>(&mut self, record: &R) {
		record.write(self);
	}

	/// Write records back to back.
	pub fn write_records<R: Record>(&mut self, records: &[R]) {
		for record in records {
			record.write(self);
		}
	}

	/// Overwrite a `u32` at `at` without moving the cursor.
	pub fn patch_u32(&mut self, at: usize, value: u32) {
		self.patch_bytes(at, &value.to_le_bytes());
	}

	/// Overwrite a `u64` at `at` without moving the cursor.
	pub fn patch_u64(&mut self, at: usize, value: u64) {
		self.patch_bytes(at, &value.to_le_bytes());
	}

	fn patch_bytes(&mut self, at: usize, bytes: &[u8]) {
		let saved = self.pos;
		self.seek(at);
		self.write_bytes(bytes);
		self.pos = saved;
	}

	/// Write UTF-16 code units of `text` followed by a NUL terminator.
	pub fn write_wstring(&mut self, text: &str) {
		for unit in text.encode_utf16() {
			self.write_u16(unit);
		}
		self.write_u16(0);
	}

	/// Write raw UTF-16 code units with no terminator added.
	pub fn write_utf16(&mut self, units: &[u16]) {
		for unit in units {
			self.write_u16(*unit);
		}
	}

	/// Reserve an 8-byte offset for `text`, resolved by the next flush.
	pub fn defer_wstring(&mut self, text: &str) -> DeferredSlot {
		let slot = DeferredSlot(self.pos);
		self.write_u64(0);
		self.pending.push(DeferredString {
			slot,
			text: text.to_owned(),
		});
		slot
	}

	/// Number of strings waiting for a flush.
	pub fn pending_strings(&self) -> usize {
		self.pending.len()
	}

	/// Append every pending string at the current position and patch its placeholder.
	pub fn flush_deferred_strings(&mut self) -> Result<()> {
		if self.pending.is_empty() && self.flushed {
			return Err(RszError::StringTableEmpty);
		}

		for item in std::mem::take(&mut self.pending) {
			let offset = self.pos as u64;
			self.write_wstring(&item.text);
			self.patch_u64(item.slot.position(), offset);
		}
		self.flushed = true;
		Ok(())
	}

	/// Align to `n`, append a standalone block, and return its start offset.
	pub fn append_aligned(&mut self, bytes: &[u8], n: usize) -> usize {
		self.align(n);
		let start = self.pos;
		self.write_bytes(bytes);
		start
	}

	/// Consume the writer and return the written bytes.
	pub fn into_bytes(self) -> Vec<u8> {
		self.buf
	}
}

/// Convert an in-memory length to an on-disk `u32`.
pub(crate) fn to_u32(what: &'static str, value: usize) -> Result<u32> {
	u32::try_from(value).map_err(|_| RszError::ValueOutOfRange { what, value: value as u64 })
}

/// Convert an on-disk count to an in-memory length.
pub(crate) fn to_usize(what: &'static str, value: u64) -> Result<usize> {
	usize::try_from(value).map_err(|_| RszError::ValueOutOfRange { what, value })
}

/// Convert an in-memory length to an on-disk `i32`.
pub(crate) fn to_i32(what: &'static str, value: usize) -> Result<i32> {
	i32::try_from(value).map_err(|_| RszError::ValueOutOfRange { what, value: value as u64 })
}

/// Convert a signed on-disk count or offset to an in-memory length.
pub(crate) fn signed_to_usize(what: &'static str, value: i64) -> Result<usize> {
	let value = u64::try_from(value).map_err(|_| RszError::ValueOutOfRange { what, value: value as u64 })?;
	to_usize(what, value)
}

fn padding_for(pos: usize, n: usize) -> usize {
	if n <= 1 {
		return 0;
	}
	(n - pos % n) % n
}

#[cfg(test)]
mod tests;
