//! Serial command protocol.
//!
//! One command per loop iteration, read from a byte stream. Lowercase
//! command letters select interactive mode (hex fields, every byte echoed
//! back), uppercase the binary equivalent (raw bytes, silent). The
//! processor's only side effect beyond the stream itself is mutating the
//! zone store; it never touches the output pipeline.
//!
//! Grammar:
//!
//! ```text
//! R | r                      reset all zones (r echoes)
//! eSZZvvvvvvvv               set effect, hex: strip, zone slot, 8-digit value
//! lSZZvvvv                   set lit length, 4-digit value
//! dSZZvvvv                   set gap length, 4-digit value
//! E/L/D + raw bytes          same fields as [strip][zone][big-endian value]
//! \n | \r                    ignored
//! ```

use embedded_io_async::{Read, ReadExactError, Write};

use crate::zones::{ApplyError, ZoneField, ZoneStore};

/// Longest binary command: letter + strip + zone + 4 value bytes.
pub const MAX_COMMAND_LEN: usize = 7;

pub const CMD_RESET: u8 = b'R';

/// How field values arrive on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
	Interactive,
	Binary,
}

/// A classified leading command byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Command {
	Newline,
	Reset { echo: bool },
	Set { field: ZoneField, mode: Mode },
	Unknown,
}

fn classify(byte: u8) -> Command {
	let mode = if byte.is_ascii_lowercase() {
		Mode::Interactive
	} else {
		Mode::Binary
	};

	match byte {
		b'\n' | b'\r' => Command::Newline,
		b'r' => Command::Reset { echo: true },
		b'R' => Command::Reset { echo: false },
		b'e' | b'E' => Command::Set {
			field: ZoneField::Effect,
			mode,
		},
		b'l' | b'L' => Command::Set {
			field: ZoneField::On,
			mode,
		},
		b'd' | b'D' => Command::Set {
			field: ZoneField::Off,
			mode,
		},
		_ => Command::Unknown,
	}
}

/// The stream failed or ended. The device transport never ends, so `Eof`
/// there means the peer disconnected; on the host side it ends a test
/// input.
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError<E> {
	Stream(E),
	Eof,
}

impl<E> From<E> for ProtocolError<E> {
	fn from(error: E) -> Self {
		Self::Stream(error)
	}
}

impl<E> From<ReadExactError<E>> for ProtocolError<E> {
	fn from(error: ReadExactError<E>) -> Self {
		match error {
			ReadExactError::UnexpectedEof => Self::Eof,
			ReadExactError::Other(error) => Self::Stream(error),
		}
	}
}

impl<E: core::fmt::Display> core::fmt::Display for ProtocolError<E> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			Self::Stream(error) => write!(f, "stream error: {error}"),
			Self::Eof => write!(f, "stream ended"),
		}
	}
}

/// Encode a binary-mode field update, for the host side of the link.
/// The device's decoder accepts exactly this shape.
pub fn encode_set(
	field: ZoneField,
	strip: u8,
	zone: u8,
	value: u32,
	buf: &mut [u8; MAX_COMMAND_LEN],
) -> &[u8] {
	let width = field.value_len();

	buf[0] = field.command_byte();
	buf[1] = strip;
	buf[2] = zone;
	buf[3..3 + width].copy_from_slice(&value.to_be_bytes()[4 - width..]);

	&buf[..3 + width]
}

/// Value of an ASCII hex digit; anything else contributes zero.
fn hex_digit(byte: u8) -> u8 {
	match byte {
		b'0'..=b'9' => byte - b'0',
		b'a'..=b'f' => byte - b'a' + 10,
		b'A'..=b'F' => byte - b'A' + 10,
		_ => 0,
	}
}

/// Big-endian value of a run of hex digits, however many were received.
fn hex_value(digits: &[u8]) -> u32 {
	digits
		.iter()
		.fold(0, |value, &digit| (value << 4) | u32::from(hex_digit(digit)))
}

async fn read_byte<S: Read + Write>(io: &mut S) -> Result<u8, ProtocolError<S::Error>> {
	let mut byte = [0u8; 1];
	io.read_exact(&mut byte).await?;
	Ok(byte[0])
}

/// Read and echo one byte; carriage return is additionally echoed as a
/// newline so interactive terminals behave.
async fn read_byte_echoed<S: Read + Write>(io: &mut S) -> Result<u8, ProtocolError<S::Error>> {
	let byte = read_byte(io).await?;
	io.write_all(&[byte]).await?;
	if byte == b'\r' {
		io.write_all(b"\n").await?;
	}
	Ok(byte)
}

/// Read up to `max` echoed bytes into `buf`, stopping early at a line
/// terminator (echoed, not stored). Returns the number of bytes stored.
async fn read_line<S: Read + Write>(
	io: &mut S,
	buf: &mut [u8],
	max: usize,
) -> Result<usize, ProtocolError<S::Error>> {
	let mut len = 0;

	while len < max {
		let byte = read_byte_echoed(io).await?;
		if byte == b'\n' || byte == b'\r' {
			break;
		}
		buf[len] = byte;
		len += 1;
	}

	Ok(len)
}

/// Read, parse, and apply exactly one command. Malformed or out-of-range
/// commands are dropped (with a diagnostic in interactive mode) and the
/// stream stays usable; only a stream failure is an error.
pub async fn process_command<S: Read + Write>(
	io: &mut S,
	zones: &ZoneStore,
) -> Result<(), ProtocolError<S::Error>> {
	let first = read_byte(io).await?;

	let (field, mode) = match classify(first) {
		Command::Newline => {
			io.write_all(b"\n").await?;
			return Ok(());
		}
		Command::Reset { echo } => {
			if echo {
				io.write_all(&[first, b'\n']).await?;
			}
			zones.reset_all();
			return Ok(());
		}
		Command::Unknown => {
			io.write_all(b"\nInvalid command\n").await?;
			return Ok(());
		}
		Command::Set { field, mode } => (field, mode),
	};

	let width = field.value_len();

	let (strip, zone, value) = match mode {
		Mode::Interactive => {
			io.write_all(&[first]).await?;

			let mut line = [0u8; 8];
			let len = read_line(io, &mut line, 3).await?;
			if len < 3 {
				io.write_all(b"Command too short\n").await?;
				return Ok(());
			}
			let strip = hex_digit(line[0]);
			let zone = (hex_digit(line[1]) << 4) | hex_digit(line[2]);

			let len = read_line(io, &mut line, width * 2).await?;
			let value = hex_value(&line[..len]);
			if len == width * 2 {
				io.write_all(b"\n").await?;
			}

			(strip, zone, value)
		}
		Mode::Binary => {
			let strip = read_byte(io).await?;
			let zone = read_byte(io).await?;

			let mut raw = [0u8; 4];
			io.read_exact(&mut raw[..width]).await?;
			let value = raw[..width]
				.iter()
				.fold(0u32, |value, &byte| (value << 8) | u32::from(byte));

			(strip, zone, value)
		}
	};

	match zones.apply(strip as usize, zone as usize, field, value) {
		Ok(()) => {}
		Err(error) => {
			if mode == Mode::Interactive {
				let diagnostic: &[u8] = match error {
					ApplyError::StripOutOfRange => b"Strip count too high\n",
					ApplyError::ZoneOutOfRange => b"Zone count too high\n",
				};
				io.write_all(diagnostic).await?;
			}
		}
	}

	Ok(())
}

/// Process commands until the stream fails. Runs unboundedly on the
/// device; the caller decides what a stream failure means (on USB:
/// disconnect, wait for the next connection).
pub async fn run<S: Read + Write>(io: &mut S, zones: &ZoneStore) -> ProtocolError<S::Error> {
	loop {
		if let Err(error) = process_command(io, zones).await {
			return error;
		}
	}
}

#[cfg(test)]
mod tests {
	use core::convert::Infallible;

	use embassy_futures::block_on;

	use super::*;
	use crate::zones::{ZoneField, ZoneStore, ZoneTable};
	use crate::{LED_STRIPS, MAX_ZONES_PER_STRIP};

	/// In-memory bidirectional stream: commands in, echo and diagnostics out.
	struct TestStream {
		input: Vec<u8>,
		cursor: usize,
		output: Vec<u8>,
	}

	impl TestStream {
		fn new(input: &[u8]) -> Self {
			Self {
				input: input.to_vec(),
				cursor: 0,
				output: Vec::new(),
			}
		}
	}

	impl embedded_io_async::ErrorType for TestStream {
		type Error = Infallible;
	}

	impl Read for TestStream {
		async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
			let n = buf.len().min(self.input.len() - self.cursor);
			buf[..n].copy_from_slice(&self.input[self.cursor..self.cursor + n]);
			self.cursor += n;
			Ok(n)
		}
	}

	impl Write for TestStream {
		async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
			self.output.extend_from_slice(buf);
			Ok(buf.len())
		}

		async fn flush(&mut self) -> Result<(), Self::Error> {
			Ok(())
		}
	}

	/// Feed the whole input through the processor; the input running out
	/// ends the run.
	fn run_input(zones: &ZoneStore, input: &[u8]) -> Vec<u8> {
		let mut io = TestStream::new(input);
		assert_eq!(block_on(run(&mut io, zones)), ProtocolError::Eof);
		io.output
	}

	#[test]
	fn binary_set_effect_round_trips() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, &[b'E', 0x02, 0x05, 0x00, 0xFF, 0x80, 0x10]);

		assert!(output.is_empty(), "binary mode is silent");
		let mut expected = ZoneTable::new();
		expected.0[2][5].effect = 0x00FF_8010;
		assert_eq!(zones.snapshot(), expected);
	}

	#[test]
	fn binary_set_on_and_off() {
		let zones = ZoneStore::new();

		run_input(&zones, &[b'L', 1, 3, 0x00, 0xC8]);
		run_input(&zones, &[b'D', 1, 3, 0x00, 0x10]);

		let snapshot = zones.snapshot();
		assert_eq!(snapshot.0[1][3].on, 200);
		assert_eq!(snapshot.0[1][3].off, 16);
	}

	#[test]
	fn interactive_set_on_echoes_everything() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"l20500C8");

		assert_eq!(zones.snapshot().0[2][5].on, 200);
		assert_eq!(output, b"l20500C8\n");
	}

	#[test]
	fn interactive_set_effect() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"e41700FF8010");

		assert_eq!(zones.snapshot().0[4][0x17].effect, 0x00FF_8010);
		assert_eq!(output, b"e41700FF8010\n");
	}

	#[test]
	fn short_value_line_applies_the_partial_value() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"e205AB\n");

		assert_eq!(zones.snapshot().0[2][5].effect, 0xAB);
		// terminator echoed, but no extra completion newline
		assert_eq!(output, b"e205AB\n");
	}

	#[test]
	fn short_index_line_drops_the_command() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"e2\n");

		assert_eq!(zones.snapshot(), ZoneTable::new());
		assert!(output.ends_with(b"Command too short\n"));
	}

	#[test]
	fn carriage_return_echoes_as_crlf() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"l2\r");

		assert_eq!(output, b"l2\r\nCommand too short\n");
	}

	#[test]
	fn binary_bounds_rejection_changes_nothing() {
		let zones = ZoneStore::new();

		// strip count is 5; strip index 5 is the first invalid one
		let output = run_input(
			&zones,
			&[b'E', LED_STRIPS as u8, 0x00, 0x00, 0x00, 0x00, 0x01],
		);

		assert!(output.is_empty(), "binary mode reports nothing");
		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn interactive_bounds_rejection_is_diagnosed() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"e70000000001");
		assert!(output.ends_with(b"Strip count too high\n"));

		let output = run_input(&zones, b"l2FF0001");
		assert!(output.ends_with(b"Zone count too high\n"));

		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn zone_slot_bound_is_checked_in_binary_mode_too() {
		let zones = ZoneStore::new();

		run_input(&zones, &[b'L', 0, MAX_ZONES_PER_STRIP as u8, 0x00, 0x01]);

		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn reset_zeroes_the_table() {
		let zones = ZoneStore::new();
		run_input(&zones, &[b'E', 0, 0, 0x11, 0x22, 0x33, 0x44]);
		run_input(&zones, &[b'L', 4, 23, 0x01, 0x00]);
		assert_ne!(zones.snapshot(), ZoneTable::new());

		let output = run_input(&zones, &[b'R']);

		assert!(output.is_empty());
		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn interactive_reset_echoes() {
		let zones = ZoneStore::new();
		zones.apply(0, 0, ZoneField::On, 5).unwrap();

		let output = run_input(&zones, b"r");

		assert_eq!(output, b"r\n");
		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn unknown_commands_are_diagnosed_and_skipped() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"x");

		assert_eq!(output, b"\nInvalid command\n");
		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn bare_line_terminators_are_ignored() {
		let zones = ZoneStore::new();

		let output = run_input(&zones, b"\n\r");

		assert_eq!(output, b"\n\n");
		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn truncated_binary_command_mutates_nothing() {
		let zones = ZoneStore::new();

		// value cut short: stream ends mid-command
		run_input(&zones, &[b'E', 0, 0, 0xFF]);

		assert_eq!(zones.snapshot(), ZoneTable::new());
	}

	#[test]
	fn encoder_and_decoder_agree() {
		let zones = ZoneStore::new();
		let mut buf = [0u8; MAX_COMMAND_LEN];

		let cases = [
			(ZoneField::Effect, 2, 5, 0x00FF_8010),
			(ZoneField::On, 4, 23, 200),
			(ZoneField::Off, 0, 0, 0xFFFF),
		];

		for (field, strip, zone, value) in cases {
			let bytes = encode_set(field, strip, zone, value, &mut buf);
			run_input(&zones, bytes);
		}

		let snapshot = zones.snapshot();
		assert_eq!(snapshot.0[2][5].effect, 0x00FF_8010);
		assert_eq!(snapshot.0[4][23].on, 200);
		assert_eq!(snapshot.0[0][0].off, 0xFFFF);
	}

	#[test]
	fn commands_keep_flowing_after_a_bad_one() {
		let zones = ZoneStore::new();

		let mut input = Vec::new();
		input.extend_from_slice(b"x");
		input.extend_from_slice(&[b'L', 0, 1, 0x00, 0x0A]);

		run_input(&zones, &input);

		assert_eq!(zones.snapshot().0[0][1].on, 10);
	}
}
