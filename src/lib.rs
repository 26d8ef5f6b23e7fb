//! Host-side control of a zone-ws2812 device.
//!
//! The device divides each of its strips into up to 24 zones, each a gap
//! followed by a lit run with a color/effect code. This crate speaks the
//! binary side of the device's serial grammar: one command letter, raw
//! strip and zone-slot bytes, then a big-endian value. The device sends no
//! acknowledgements; commands are write-and-flush.
//!
//! A blocking implementation lives here; an async twin is available behind
//! the `tokio` feature.

#[cfg(feature = "tokio")]
pub mod tokio;

use std::{io::Write as _, time::Duration};

use serialport::{SerialPort, SerialPortType};
use tracing::debug;
use zone_ws2812_shared::{
	protocol::{encode_set, CMD_RESET, MAX_COMMAND_LEN},
	zones::ZoneField,
	DEVICE_PRODUCT_NAME,
	LED_STRIPS,
	MAX_ZONES_PER_STRIP,
};

const BAUD_RATE: u32 = 921_600;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("serial port: {0}")]
	Serial(#[from] serialport::Error),
	#[error("i/o: {0}")]
	Io(#[from] std::io::Error),
	#[error("strip index {0} out of range (device has 5 strips)")]
	StripOutOfRange(u8),
	#[error("zone index {0} out of range (24 zone slots per strip)")]
	ZoneOutOfRange(u8),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject indices the device would drop, before they hit the wire. The
/// device performs the same check but reports nothing in binary mode.
pub(crate) fn validate(strip: u8, zone: u8) -> Result<()> {
	if strip as usize >= LED_STRIPS {
		return Err(Error::StripOutOfRange(strip));
	}
	if zone as usize >= MAX_ZONES_PER_STRIP {
		return Err(Error::ZoneOutOfRange(zone));
	}
	Ok(())
}

pub struct ZoneWs2812 {
	port: Box<dyn SerialPort>,
}

impl ZoneWs2812 {
	/// Open the given serial device.
	pub fn new(serial_device: &str) -> Result<Self> {
		let builder = serialport::new(serial_device, BAUD_RATE).timeout(Duration::from_millis(50));
		let port = builder.open()?;

		Ok(Self { port })
	}

	/// Find the first connected device by its USB product name.
	///
	/// Returns `Ok(None)` when no port identifies itself as one; port
	/// enumeration without USB metadata (for example a plain TTY) cannot
	/// match, use [`ZoneWs2812::new`] with an explicit path instead.
	pub fn find() -> Result<Option<Self>> {
		let ports = serialport::available_ports()?;
		let underscored = DEVICE_PRODUCT_NAME.replace(' ', "_");
		let mut serial_device = None;

		for p in ports {
			if let SerialPortType::UsbPort(usb) = p.port_type {
				if usb.product.as_deref() == Some(DEVICE_PRODUCT_NAME)
					|| usb.product.as_deref() == Some(underscored.as_str())
				{
					serial_device = Some(p.port_name);
				}
			}
		}

		let Some(serial_device) = serial_device else {
			return Ok(None);
		};

		Ok(Some(Self::new(&serial_device)?))
	}

	/// Zero every zone on every strip.
	pub fn reset(&mut self) -> Result<()> {
		debug!("sending reset");
		self.port.write_all(&[CMD_RESET])?;
		self.port.flush()?;
		Ok(())
	}

	/// Set a zone's color/effect code. Top byte zero is a literal RGB
	/// color, nonzero selects an animation effect.
	pub fn set_effect(&mut self, strip: u8, zone: u8, effect: u32) -> Result<()> {
		self.set(ZoneField::Effect, strip, zone, effect)
	}

	/// Set a zone's lit run length in pixels.
	pub fn set_on(&mut self, strip: u8, zone: u8, length: u16) -> Result<()> {
		self.set(ZoneField::On, strip, zone, length.into())
	}

	/// Set a zone's gap length in pixels.
	pub fn set_off(&mut self, strip: u8, zone: u8, length: u16) -> Result<()> {
		self.set(ZoneField::Off, strip, zone, length.into())
	}

	fn set(&mut self, field: ZoneField, strip: u8, zone: u8, value: u32) -> Result<()> {
		validate(strip, zone)?;

		let mut buf = [0u8; MAX_COMMAND_LEN];
		let bytes = encode_set(field, strip, zone, value, &mut buf);
		debug!(?field, strip, zone, value, "sending field update");

		self.port.write_all(bytes)?;
		self.port.flush()?;
		Ok(())
	}
}
