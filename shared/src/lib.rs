#![cfg_attr(not(test), no_std)]

//! Core logic for zone-based control of parallel WS2812 strips.
//!
//! Everything in this crate is hardware independent: the zone table and its
//! lock, the zone-to-pixel renderer, the bit-plane transposer, the output
//! pipeline state machine, and the serial command protocol. The firmware
//! wires these to the RP2040 (PIO + DMA + USB), the host crate uses the
//! protocol constants and encoder to talk to the device.

pub mod pipeline;
pub mod planes;
pub mod protocol;
pub mod render;
pub mod zones;

/// Number of strips driven in parallel. The PIO program fans the low
/// `LED_STRIPS` bits of every frame word out to one pin per strip.
pub const LED_STRIPS: usize = 5;
/// Pixels per strip. Zones past this length are clipped, not an error.
pub const MAX_STRIP_LENGTH: usize = 300;
/// Zone slots per strip. Unused slots stay zeroed and render nothing.
pub const MAX_ZONES_PER_STRIP: usize = 24;
/// Bits per pixel color (8 each for red, green, blue).
pub const COLOR_BITS: usize = 24;
/// 32-bit words per bit-plane frame, one word per (pixel, color bit).
pub const WORDS_PER_FRAME: usize = MAX_STRIP_LENGTH * COLOR_BITS;

pub const DEVICE_PRODUCT_NAME: &str = "Zone WS2812";
pub const DEVICE_MANUFACTURER: &str = "zone-ws2812";

// https://pid.codes/1209/0001/ (test PID, not for general distribution)
pub const DEVICE_VENDOR_ID: u16 = 0x1209;
pub const DEVICE_PRODUCT_ID: u16 = 0x0001;
