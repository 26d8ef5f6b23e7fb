//! Async twin of the blocking driver, for tokio applications.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::debug;
use zone_ws2812_shared::{
	protocol::{encode_set, CMD_RESET, MAX_COMMAND_LEN},
	zones::ZoneField,
	DEVICE_PRODUCT_NAME,
};

use crate::{validate, Result};

const BAUD_RATE: u32 = 921_600;

pub struct ZoneWs2812 {
	port: SerialStream,
}

impl ZoneWs2812 {
	/// Open the given serial device.
	pub fn new(serial_device: &str) -> Result<Self> {
		let builder =
			tokio_serial::new(serial_device, BAUD_RATE).timeout(Duration::from_millis(50));
		let port = builder
			.open_native_async()
			.map_err(serialport::Error::from)?;

		Ok(Self { port })
	}

	/// Find the first connected device by its USB product name.
	pub fn find() -> Result<Option<Self>> {
		let ports = tokio_serial::available_ports().map_err(serialport::Error::from)?;
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
	pub async fn reset(&mut self) -> Result<()> {
		debug!("sending reset");
		self.port.write_all(&[CMD_RESET]).await?;
		self.port.flush().await?;
		Ok(())
	}

	/// Set a zone's color/effect code.
	pub async fn set_effect(&mut self, strip: u8, zone: u8, effect: u32) -> Result<()> {
		self.set(ZoneField::Effect, strip, zone, effect).await
	}

	/// Set a zone's lit run length in pixels.
	pub async fn set_on(&mut self, strip: u8, zone: u8, length: u16) -> Result<()> {
		self.set(ZoneField::On, strip, zone, length.into()).await
	}

	/// Set a zone's gap length in pixels.
	pub async fn set_off(&mut self, strip: u8, zone: u8, length: u16) -> Result<()> {
		self.set(ZoneField::Off, strip, zone, length.into()).await
	}

	async fn set(&mut self, field: ZoneField, strip: u8, zone: u8, value: u32) -> Result<()> {
		validate(strip, zone)?;

		let mut buf = [0u8; MAX_COMMAND_LEN];
		let bytes = encode_set(field, strip, zone, value, &mut buf);
		debug!(?field, strip, zone, value, "sending field update");

		self.port.write_all(bytes).await?;
		self.port.flush().await?;
		Ok(())
	}
}
