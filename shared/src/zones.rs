//! The zone table: the single piece of state shared between the command
//! processor and the frame producer.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::{LED_STRIPS, MAX_ZONES_PER_STRIP};

/// One contiguous run on a strip: `off` dark pixels followed by `on` lit
/// pixels rendered with `effect`. Zones are laid out back to back in slot
/// order, so the run's start position is the sum of all preceding
/// `off + on` lengths.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Zone {
	/// Top byte zero: literal static RGB color. Nonzero: animation effect id.
	pub effect: u32,
	/// Gap length in pixels before the lit run.
	pub off: u16,
	/// Lit run length in pixels.
	pub on: u16,
}

impl Zone {
	pub const fn new() -> Self {
		Self {
			effect: 0,
			off: 0,
			on: 0,
		}
	}
}

/// Which field of a [`Zone`] a command addresses.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ZoneField {
	Off,
	On,
	Effect,
}

impl ZoneField {
	/// Width of the field's value on the wire, in bytes.
	pub const fn value_len(self) -> usize {
		match self {
			Self::Off | Self::On => 2,
			Self::Effect => 4,
		}
	}

	/// Binary-mode command byte that selects this field.
	pub const fn command_byte(self) -> u8 {
		match self {
			Self::Off => b'D',
			Self::On => b'L',
			Self::Effect => b'E',
		}
	}
}

/// Plain matrix of zones, indexed by (strip, zone slot). `Copy` so a
/// consistent snapshot is a single memcpy under the lock.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ZoneTable(pub [[Zone; MAX_ZONES_PER_STRIP]; LED_STRIPS]);

impl ZoneTable {
	pub const fn new() -> Self {
		Self([[Zone::new(); MAX_ZONES_PER_STRIP]; LED_STRIPS])
	}

	pub fn reset(&mut self) {
		self.0 = [[Zone::new(); MAX_ZONES_PER_STRIP]; LED_STRIPS];
	}
}

impl Default for ZoneTable {
	fn default() -> Self {
		Self::new()
	}
}

/// A field update was addressed outside the table.
#[derive(Clone, Copy, PartialEq, Eq, Debug, derive_more::Display, derive_more::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApplyError {
	#[display("strip index out of range")]
	StripOutOfRange,
	#[display("zone index out of range")]
	ZoneOutOfRange,
}

/// Lock-protected [`ZoneTable`]. Both execution contexts go through this;
/// neither ever holds the lock across an await point or an I/O call, so
/// contention is bounded by a copy or a single field write.
pub struct ZoneStore {
	table: Mutex<CriticalSectionRawMutex, RefCell<ZoneTable>>,
}

impl ZoneStore {
	pub const fn new() -> Self {
		Self {
			table: Mutex::new(RefCell::new(ZoneTable::new())),
		}
	}

	/// Copy the whole table out under the lock. The caller renders from the
	/// copy, so updates applied after this returns are not observed until
	/// the next frame.
	pub fn snapshot(&self) -> ZoneTable {
		self.table.lock(|table| *table.borrow())
	}

	/// Write one field of one zone under the lock. Out-of-range indices are
	/// a no-op reported to the caller; `on`/`off` values truncate to 16 bits.
	pub fn apply(
		&self,
		strip: usize,
		zone: usize,
		field: ZoneField,
		value: u32,
	) -> Result<(), ApplyError> {
		if strip >= LED_STRIPS {
			return Err(ApplyError::StripOutOfRange);
		}
		if zone >= MAX_ZONES_PER_STRIP {
			return Err(ApplyError::ZoneOutOfRange);
		}

		self.table.lock(|table| {
			let mut table = table.borrow_mut();
			let zone = &mut table.0[strip][zone];
			match field {
				ZoneField::Off => zone.off = value as u16,
				ZoneField::On => zone.on = value as u16,
				ZoneField::Effect => zone.effect = value,
			}
		});

		Ok(())
	}

	/// Zero every zone on every strip under the lock.
	pub fn reset_all(&self) {
		self.table.lock(|table| table.borrow_mut().reset());
	}
}

impl Default for ZoneStore {
	fn default() -> Self {
		Self::new()
	}
}
