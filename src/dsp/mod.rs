pub mod chirp_metrics;
pub mod chirp_shape;
pub mod fft;
pub mod filter;
pub mod onset;
pub mod synth;
pub mod window;
