//! Output pipeline state machine.
//!
//! Two frame buffers alternate between being transposed into and being
//! streamed. A streamed buffer is not reusable the moment the transfer
//! completes: the WS2812 protocol needs a minimum low period afterwards for
//! the strips to latch, so each buffer walks `Streaming -> QuietPeriod ->
//! Idle` before its slot may be written again. The two event sources (the
//! transfer-complete notification and the quiet-period timer) drive nothing
//! but these transitions plus a single gating signal with capacity one,
//! which the frame producer blocks on before starting the next transfer.

use embassy_time::Duration;

/// Mandatory low period after each transfer before the next may start.
/// Well above the ~50 us the strips need to latch.
pub const RESET_DELAY: Duration = Duration::from_micros(400);

/// Lifecycle of one frame buffer slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
	#[default]
	Idle,
	Streaming,
	QuietPeriod,
}

/// A transition was requested that the state machine forbids. The gating
/// signal prevents these in normal operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, derive_more::Display, derive_more::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
	#[display("a transfer is already in flight")]
	TransferInFlight,
}

/// Tracks both slots and which one is safe to transpose into. Exactly one
/// slot is ever non-idle; see the alternation test below.
pub struct OutputPipeline {
	slots: [SlotState; 2],
	write_slot: usize,
	in_flight: Option<usize>,
}

impl OutputPipeline {
	pub const fn new() -> Self {
		Self {
			slots: [SlotState::Idle, SlotState::Idle],
			write_slot: 0,
			in_flight: None,
		}
	}

	/// Slot the next frame may be transposed into. It was last streamed two
	/// cycles ago and has completed its full cycle by the time the gate
	/// releases.
	pub const fn write_slot(&self) -> usize {
		self.write_slot
	}

	/// State of one of the two buffer slots.
	///
	/// # Panics
	///
	/// Panics if `slot` is not 0 or 1.
	pub const fn slot_state(&self, slot: usize) -> SlotState {
		self.slots[slot]
	}

	pub const fn in_flight(&self) -> Option<usize> {
		self.in_flight
	}

	/// Start streaming the current write slot; the other slot becomes the
	/// write slot. Precondition (normally enforced by the gating signal,
	/// checked here as well): no transfer is in flight.
	pub fn begin_transfer(&mut self) -> Result<usize, PipelineError> {
		if self.in_flight.is_some() {
			return Err(PipelineError::TransferInFlight);
		}

		let slot = self.write_slot;
		self.slots[slot] = SlotState::Streaming;
		self.in_flight = Some(slot);
		self.write_slot = 1 - slot;
		Ok(slot)
	}

	/// The serializer consumed the in-flight buffer. A duplicate completion
	/// leaves the slot in its quiet period; the caller re-arms the delay
	/// timer, superseding the pending one.
	pub fn transfer_complete(&mut self) {
		if let Some(slot) = self.in_flight {
			self.slots[slot] = SlotState::QuietPeriod;
		}
	}

	/// The quiet-period timer expired; the in-flight slot becomes idle and
	/// the caller releases the gating signal.
	pub fn reset_delay_complete(&mut self) {
		if let Some(slot) = self.in_flight.take() {
			self.slots[slot] = SlotState::Idle;
		}
	}
}

impl Default for OutputPipeline {
	fn default() -> Self {
		Self::new()
	}
}
