use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use zone_ws2812_shared::{planes::FrameBuffer, zones::ZoneStore};

/// Single source of truth for zone configuration. The USB protocol task on
/// core 0 writes it, the frame task on core 1 snapshots it; all access goes
/// through its internal lock.
pub static ZONES: ZoneStore = ZoneStore::new();

/// Frames ready to stream, frame task -> output task.
pub static STREAM_FRAMES: Channel<CriticalSectionRawMutex, &'static mut FrameBuffer, 1> =
	Channel::new();

/// The gating signal: a buffer comes back exactly once per completed
/// transfer-plus-reset-delay cycle, so this never holds more than one unit
/// and the frame task blocks here before starting the next transfer.
pub static IDLE_FRAMES: Channel<CriticalSectionRawMutex, &'static mut FrameBuffer, 1> =
	Channel::new();
