//! Frame production and parallel WS2812 output.
//!
//! One PIO state machine drives all five strips: every 32-bit frame word
//! covers one WS2812 bit-time, its low five bits selecting which strips
//! stay high for the "1" pulse width. DMA feeds the state machine a whole
//! bit-plane frame at a time; after each transfer the lines are held low
//! for the reset delay before the next frame may start.

use defmt::{info, trace, unwrap};
use embassy_rp::{
	peripherals::{DMA_CH0, PIN_16, PIN_17, PIN_18, PIN_19, PIN_20, PIO0},
	pio::{Config, Direction, FifoJoin, Pio, ShiftConfig, ShiftDirection, StateMachine},
	Peri,
};
use embassy_time::Timer;
use fixed_macro::fixed;
use pio_proc::pio_asm;
use zone_ws2812_shared::{
	pipeline::{OutputPipeline, RESET_DELAY},
	planes::{transpose, FrameBuffer},
	render::{render_zones, PixelBuffer},
};

use crate::{
	globals::{IDLE_FRAMES, STREAM_FRAMES, ZONES},
	Irqs,
};

pub type StripPins = (
	Peri<'static, PIN_16>,
	Peri<'static, PIN_17>,
	Peri<'static, PIN_18>,
	Peri<'static, PIN_19>,
	Peri<'static, PIN_20>,
);

/// Render and transpose frames as fast as the output pipeline lets them
/// through. The zone snapshot is the only contact with the protocol side.
#[embassy_executor::task]
pub async fn frame_task(pixels: &'static mut PixelBuffer, first: &'static mut FrameBuffer) {
	info!("frame task up on core 1");

	let mut held = first;
	let mut frame: u32 = 0;

	loop {
		let snapshot = ZONES.snapshot();
		render_zones(frame, &snapshot, pixels);
		transpose(pixels, held);

		// gate: an idle buffer arrives once the previous transfer and its
		// reset delay have finished
		let idle = IDLE_FRAMES.receive().await;
		STREAM_FRAMES.send(held).await;
		held = idle;

		frame = frame.wrapping_add(1);
	}
}

/// Stream frames out via DMA, one at a time, enforcing the reset delay
/// between transfers. A transfer that never completes stalls the whole
/// pipeline; there is no recovery at this layer.
#[embassy_executor::task]
pub async fn output_task(pio: Peri<'static, PIO0>, dma: Peri<'static, DMA_CH0>, pins: StripPins) {
	info!("output task up on core 1");

	let mut dma = dma;
	let mut sm = setup_parallel_pio(pio, pins);
	let mut pipeline = OutputPipeline::new();

	loop {
		let frame = STREAM_FRAMES.receive().await;

		let slot = unwrap!(pipeline.begin_transfer());
		trace!("streaming slot {}", slot);
		sm.tx().dma_push(dma.reborrow(), frame.words(), false).await;
		pipeline.transfer_complete();

		// hold the lines low so the strips latch the new colors
		Timer::after(RESET_DELAY).await;
		pipeline.reset_delay_complete();

		IDLE_FRAMES.send(frame).await;
	}
}

fn setup_parallel_pio<'a>(pio: Peri<'static, PIO0>, pins: StripPins) -> StateMachine<'a, PIO0, 0> {
	let Pio {
		mut common,
		sm0: mut sm,
		..
	} = Pio::new(pio, Irqs);

	let pins = [
		&common.make_pio_pin(pins.0),
		&common.make_pio_pin(pins.1),
		&common.make_pio_pin(pins.2),
		&common.make_pio_pin(pins.3),
		&common.make_pio_pin(pins.4),
	];

	sm.set_pin_dirs(Direction::Out, &pins);

	let prg = pio_asm!(
		"
			.wrap_target
				out x, 32             ; [1] one frame word per ws2812 bit-time
				mov pins, !null [2]   ; [3] T1: all lines high
				mov pins, x     [3]   ; [4] T2: keep high for 1 bits, pull low for 0 bits
				mov pins, null  [1]   ; [2] T3: all lines low
			.wrap
		"
	);

	const CYCLES_PER_BIT: u32 = 1 + 3 + 4 + 2;

	let mut cfg = Config::default();
	cfg.use_program(&common.load_program(&prg.program), &[]);

	// sys clk at the default 125MHz
	let clock_freq = fixed!(125_000: U24F8);
	let ws2812_freq = fixed!(800: U24F8);
	let bit_freq = ws2812_freq * CYCLES_PER_BIT;

	cfg.clock_divider = clock_freq / bit_freq;

	cfg.shift_out = ShiftConfig {
		auto_fill: true,
		threshold: 32,
		direction: ShiftDirection::Left,
	};

	cfg.fifo_join = FifoJoin::TxOnly;

	cfg.set_out_pins(&pins);

	sm.set_config(&cfg);
	sm.set_enable(true);

	sm
}
