//! Recording and playback behind a narrow gateway interface.

pub mod gateway;
pub mod mock;

#[cfg(feature = "audio-io")]
pub mod capture;
#[cfg(feature = "audio-io")]
pub mod device;
#[cfg(feature = "audio-io")]
pub mod playback;

pub use gateway::{MediaError, MediaGateway};
pub use mock::MockGateway;

#[cfg(feature = "audio-io")]
pub use device::DeviceGateway;

/// Audio format profile specifying sample rate and channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioProfile {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioProfile {
    /// Format recorded samples are uploaded in.
    pub const RECORDING: AudioProfile = AudioProfile {
        sample_rate: 44_100,
        channels: 1,
    };
}
