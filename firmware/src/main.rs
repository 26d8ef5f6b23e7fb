#![no_std]
#![no_main]

mod globals;
mod serial;
mod ws2812;

extern crate defmt_rtt;
extern crate panic_probe;

use defmt::unwrap;
use embassy_executor::Executor;
use embassy_rp::{
	bind_interrupts,
	config::Config,
	multicore::{spawn_core1, Stack},
	peripherals::{PIO0, USB},
	pio::InterruptHandler as PioInterruptHandler,
	usb::{Driver, InterruptHandler as UsbInterruptHandler},
};
use static_cell::{ConstStaticCell, StaticCell};
use zone_ws2812_shared::{planes::FrameBuffer, render::PixelBuffer};

use crate::{
	globals::IDLE_FRAMES,
	serial::usb_serial_task,
	ws2812::{frame_task, output_task},
};

bind_interrupts!(struct Irqs {
	USBCTRL_IRQ => UsbInterruptHandler<USB>;
	PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

static mut CORE1_STACK: Stack<4096> = Stack::new();

#[cortex_m_rt::entry]
fn main() -> ! {
	static EXECUTOR0: StaticCell<Executor> = StaticCell::new();
	static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

	// the frame buffers and pixel buffer live in static memory for the
	// whole process lifetime; nothing display-sized is ever allocated
	// per frame
	static FRAME_BUFFERS: ConstStaticCell<[FrameBuffer; 2]> =
		ConstStaticCell::new([FrameBuffer::new(), FrameBuffer::new()]);
	static PIXELS: ConstStaticCell<PixelBuffer> = ConstStaticCell::new(PixelBuffer::new());

	let p = embassy_rp::init(Config::default());

	let [first, second] = FRAME_BUFFERS.take();
	// the channel is empty at startup, this cannot fail
	let _ = IDLE_FRAMES.try_send(second);
	let pixels = PIXELS.take();

	let pio = p.PIO0;
	let dma = p.DMA_CH0;
	let pins = (p.PIN_16, p.PIN_17, p.PIN_18, p.PIN_19, p.PIN_20);

	spawn_core1(
		p.CORE1,
		unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) },
		move || {
			let executor1 = EXECUTOR1.init(Executor::new());
			executor1.run(|spawner| {
				unwrap!(spawner.spawn(frame_task(pixels, first)));
				unwrap!(spawner.spawn(output_task(pio, dma, pins)));
			})
		},
	);

	let driver = Driver::new(p.USB, Irqs);

	let executor0 = EXECUTOR0.init(Executor::new());
	executor0.run(|spawner| {
		unwrap!(spawner.spawn(usb_serial_task(driver)));
	})
}
