pub mod tables;
pub mod waveform;
