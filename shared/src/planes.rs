//! Bit-plane transposer: reorganizes "5 strips x 300 pixels x 24 bits"
//! into "300 positions x 24 words" so one output channel can drive the
//! corresponding bit of all strips at once.

use bytemuck::{Pod, Zeroable};

use crate::{
	render::PixelBuffer,
	COLOR_BITS,
	LED_STRIPS,
	MAX_STRIP_LENGTH,
};

/// All color bits of one pixel position across every strip, most
/// significant color bit first. Word `b`'s low [`LED_STRIPS`] bits carry,
/// per strip, whether color bit `b` is set at this position.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct PixelPlanes {
	pub bit_planes: [u32; COLOR_BITS],
}

impl PixelPlanes {
	pub const fn new() -> Self {
		Self {
			bit_planes: [0; COLOR_BITS],
		}
	}
}

impl Default for PixelPlanes {
	fn default() -> Self {
		Self::new()
	}
}

/// One bit-plane frame: the exact word sequence a transfer streams out.
/// Two of these exist for the process lifetime and alternate between
/// "being transposed into" and "being streamed".
#[repr(C)]
pub struct FrameBuffer(pub [PixelPlanes; MAX_STRIP_LENGTH]);

impl FrameBuffer {
	pub const fn new() -> Self {
		Self([PixelPlanes::new(); MAX_STRIP_LENGTH])
	}

	/// The frame as the flat 7200-word sequence handed to the serializer.
	pub fn words(&self) -> &[u32] {
		bytemuck::cast_slice(&self.0)
	}
}

impl Default for FrameBuffer {
	fn default() -> Self {
		Self::new()
	}
}

/// Transpose a dense pixel buffer into `frame`, overwriting it entirely.
///
/// Cost is constant: every word of the frame is computed regardless of how
/// few pixels are lit. The inner loop is a mask test and a shift, no
/// per-pixel dispatch.
pub fn transpose(pixels: &PixelBuffer, frame: &mut FrameBuffer) {
	for (position, planes) in frame.0.iter_mut().enumerate() {
		for (bit, plane) in planes.bit_planes.iter_mut().enumerate() {
			let mask = 0x0080_0000 >> bit;
			let mut word = 0u32;

			for strip in 0..LED_STRIPS {
				if pixels.0[strip][position] & mask != 0 {
					word |= 1 << strip;
				}
			}

			*plane = word;
		}
	}
}
