//! Zone-to-pixel renderer: expands the sparse zone table into one dense
//! 24-bit color per (strip, pixel) for the current frame.

use crate::{
	zones::ZoneTable,
	LED_STRIPS,
	MAX_STRIP_LENGTH,
};

/// Pack 8-bit channels into the `0x00RRGGBB` layout used throughout.
pub const fn rgb_u32(r: u8, g: u8, b: u8) -> u32 {
	((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Dense per-strip pixel colors for one frame. Fixed capacity, recomputed
/// in place every frame; never touched by the protocol side.
pub struct PixelBuffer(pub [[u32; MAX_STRIP_LENGTH]; LED_STRIPS]);

impl PixelBuffer {
	pub const fn new() -> Self {
		Self([[0; MAX_STRIP_LENGTH]; LED_STRIPS])
	}

	pub fn clear(&mut self) {
		self.0 = [[0; MAX_STRIP_LENGTH]; LED_STRIPS];
	}
}

impl Default for PixelBuffer {
	fn default() -> Self {
		Self::new()
	}
}

/// Color of one pixel, dispatched on the effect id in the top byte.
///
/// Effect ids are pure functions of (frame, offset within the zone's lit
/// run); adding an id means adding a match arm here and nothing else.
/// Id 0 is the static case: the low 24 bits are the color, invariant in
/// both frame and offset.
fn render_pixel(frame: u32, offset: u32, effect: u32) -> u32 {
	let _ = (frame, offset);
	match effect >> 24 {
		0 => effect,
		// placeholder for not-yet-implemented animation effects
		_ => rgb_u32(0xFF, 0, 0),
	}
}

/// Render one frame from a zone table snapshot.
///
/// The buffer is fully cleared first so a zone that shrank or disappeared
/// since the last frame leaves no stale lit pixels. Runs that extend past
/// the strip length are silently clipped.
pub fn render_zones(frame: u32, zones: &ZoneTable, pixels: &mut PixelBuffer) {
	pixels.clear();

	for (strip, slots) in zones.0.iter().enumerate() {
		let mut cursor: usize = 0;

		for zone in slots {
			cursor += zone.off as usize;

			for offset in 0..zone.on as u32 {
				let position = cursor + offset as usize;
				if position >= MAX_STRIP_LENGTH {
					break;
				}
				pixels.0[strip][position] = render_pixel(frame, offset, zone.effect);
			}

			cursor += zone.on as usize;
		}
	}
}
