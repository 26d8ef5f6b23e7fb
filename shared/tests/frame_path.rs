//! End-to-end: commands in over the byte stream, bit-plane words out.

use core::convert::Infallible;

use embassy_futures::block_on;
use embedded_io_async::{Read, Write};
use zone_ws2812_shared::{
	planes::{transpose, FrameBuffer},
	protocol::{self, ProtocolError},
	render::{render_zones, PixelBuffer},
	zones::ZoneStore,
	COLOR_BITS,
	WORDS_PER_FRAME,
};

struct ScriptedStream {
	input: Vec<u8>,
	cursor: usize,
	output: Vec<u8>,
}

impl embedded_io_async::ErrorType for ScriptedStream {
	type Error = Infallible;
}

impl Read for ScriptedStream {
	async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
		let n = buf.len().min(self.input.len() - self.cursor);
		buf[..n].copy_from_slice(&self.input[self.cursor..self.cursor + n]);
		self.cursor += n;
		Ok(n)
	}
}

impl Write for ScriptedStream {
	async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
		self.output.extend_from_slice(buf);
		Ok(buf.len())
	}

	async fn flush(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}
}

fn send(zones: &ZoneStore, input: &[u8]) {
	let mut io = ScriptedStream {
		input: input.to_vec(),
		cursor: 0,
		output: Vec::new(),
	};
	assert_eq!(block_on(protocol::run(&mut io, zones)), ProtocolError::Eof);
}

#[test]
fn configured_zones_reach_the_wire_words() {
	let zones = ZoneStore::new();

	// strip 2, zone 0: 4 dark pixels then 2 pixels of 0x00FF8010
	send(&zones, &[b'E', 2, 0, 0x00, 0xFF, 0x80, 0x10]);
	send(&zones, &[b'D', 2, 0, 0x00, 0x04]);
	send(&zones, &[b'L', 2, 0, 0x00, 0x02]);

	let snapshot = zones.snapshot();
	let mut pixels = PixelBuffer::new();
	render_zones(0, &snapshot, &mut pixels);

	assert_eq!(pixels.0[2][3], 0);
	assert_eq!(pixels.0[2][4], 0x00FF_8010);
	assert_eq!(pixels.0[2][5], 0x00FF_8010);
	assert_eq!(pixels.0[2][6], 0);

	let mut frame = FrameBuffer::new();
	transpose(&pixels, &mut frame);

	let words = frame.words();
	assert_eq!(words.len(), WORDS_PER_FRAME);

	// color 0x00FF8010, bit planes indexed MSB first: bits 0..8 of the
	// 24-bit color are 1111_1111 (0xFF), then 1000_0000 (0x80), then
	// 0001_0000 (0x10). Strip 2 contributes bit 2 of each word.
	let pixel_words = &words[4 * COLOR_BITS..5 * COLOR_BITS];
	let expected_bits: u32 = 0x00FF_8010;
	for (bit, &word) in pixel_words.iter().enumerate() {
		let set = expected_bits & (0x0080_0000 >> bit) != 0;
		assert_eq!(word, if set { 1 << 2 } else { 0 }, "bit {bit}");
	}

	// dark pixel positions produce all-zero words
	assert!(words[..4 * COLOR_BITS].iter().all(|&word| word == 0));
}

#[test]
fn reset_clears_the_rendered_frame() {
	let zones = ZoneStore::new();
	send(&zones, &[b'E', 0, 0, 0x00, 0xFF, 0xFF, 0xFF]);
	send(&zones, &[b'L', 0, 0, 0x01, 0x00]);

	send(&zones, &[b'R']);

	let mut pixels = PixelBuffer::new();
	render_zones(7, &zones.snapshot(), &mut pixels);
	let mut frame = FrameBuffer::new();
	transpose(&pixels, &mut frame);

	assert!(frame.words().iter().all(|&word| word == 0));
}
