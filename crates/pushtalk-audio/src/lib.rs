pub mod capture;
pub mod device;
pub mod format;
pub mod ring_buffer;
pub mod validator;

pub use capture::{AudioCaptureService, CaptureConfig, CaptureErrorEvent};
pub use device::DeviceManager;
pub use ring_buffer::RingBuffer;
pub use validator::{AudioValidator, InvalidAudioReason, ValidatorConfig};
