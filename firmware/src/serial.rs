//! USB CDC-ACM transport for the command protocol.
//!
//! The protocol processor itself lives in the shared crate and only sees a
//! byte stream; this module provides that stream on top of the CDC class
//! and keeps serving across reconnects.

use defmt::{info, panic};
use embassy_futures::join::join;
use embassy_rp::{
	peripherals::USB,
	usb::{Driver, Instance},
};
use embassy_usb::{
	class::cdc_acm::{CdcAcmClass, State},
	driver::EndpointError,
	Builder,
};
use embedded_io_async::{ErrorKind, Read, Write};
use zone_ws2812_shared::{
	protocol,
	DEVICE_MANUFACTURER,
	DEVICE_PRODUCT_ID,
	DEVICE_PRODUCT_NAME,
	DEVICE_VENDOR_ID,
};

use crate::globals::ZONES;

const PACKET_LEN: u8 = 64;

#[embassy_executor::task]
pub async fn usb_serial_task(driver: Driver<'static, USB>) {
	info!("usb task up on core 0");

	let mut config = embassy_usb::Config::new(DEVICE_VENDOR_ID, DEVICE_PRODUCT_ID);
	config.manufacturer = Some(DEVICE_MANUFACTURER);
	config.product = Some(DEVICE_PRODUCT_NAME);
	config.serial_number = Some("0001");
	config.max_power = 100;
	config.max_packet_size_0 = PACKET_LEN;

	// Required for windows compatiblity.
	// https://developer.nordicsemi.com/nRF_Connect_SDK/doc/1.9.1/kconfig/CONFIG_CDC_ACM_IAD.html#help
	config.device_class = 0xEF;
	config.device_sub_class = 0x02;
	config.device_protocol = 0x01;
	config.composite_with_iads = true;

	let mut config_descriptor = [0; 256];
	let mut bos_descriptor = [0; 256];
	let mut msos_descriptor = [0; 256];
	let mut control_buf = [0; 128];

	let mut state = State::new();

	let mut builder = Builder::new(
		driver,
		config,
		&mut config_descriptor,
		&mut bos_descriptor,
		&mut msos_descriptor,
		&mut control_buf,
	);

	let mut class = CdcAcmClass::new(&mut builder, &mut state, PACKET_LEN as u16);

	let mut usb = builder.build();

	join(usb.run(), async {
		loop {
			class.wait_connection().await;
			info!("connected");
			serve(&mut class).await;
			info!("disconnected");
		}
	})
	.await;
}

/// Run the command processor until the peer goes away.
async fn serve<'d, T: Instance + 'd>(class: &mut CdcAcmClass<'d, Driver<'d, T>>) {
	let mut io = UsbIo {
		class,
		buf: [0; PACKET_LEN as usize],
		start: 0,
		end: 0,
	};

	let _ = protocol::run(&mut io, &ZONES).await;
}

/// The host closed the connection or the endpoint was disabled.
#[derive(Debug)]
struct Disconnected;

impl From<EndpointError> for Disconnected {
	fn from(val: EndpointError) -> Self {
		match val {
			EndpointError::BufferOverflow => panic!("Buffer overflow"),
			EndpointError::Disabled => Disconnected,
		}
	}
}

impl embedded_io_async::Error for Disconnected {
	fn kind(&self) -> ErrorKind {
		ErrorKind::Other
	}
}

/// Byte-stream view of the CDC class for the protocol processor: packets
/// in, buffered out byte by byte; echo and diagnostics go out as single
/// packets.
struct UsbIo<'a, 'd, T: Instance + 'd> {
	class: &'a mut CdcAcmClass<'d, Driver<'d, T>>,
	buf: [u8; PACKET_LEN as usize],
	start: usize,
	end: usize,
}

impl<'a, 'd, T: Instance + 'd> embedded_io_async::ErrorType for UsbIo<'a, 'd, T> {
	type Error = Disconnected;
}

impl<'a, 'd, T: Instance + 'd> Read for UsbIo<'a, 'd, T> {
	async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
		// zero-length packets carry no data, keep waiting
		while self.start == self.end {
			let n = self.class.read_packet(&mut self.buf).await?;
			self.start = 0;
			self.end = n;
		}

		let n = buf.len().min(self.end - self.start);
		buf[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
		self.start += n;
		Ok(n)
	}
}

impl<'a, 'd, T: Instance + 'd> Write for UsbIo<'a, 'd, T> {
	async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
		let n = buf.len().min(self.class.max_packet_size() as usize);
		self.class.write_packet(&buf[..n]).await?;
		Ok(n)
	}

	// write_packet hands the data to the endpoint immediately
	async fn flush(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}
}
