// Audio module - decoded sample buffers and the WAV decoding adapter
//
// The analysis core never performs I/O. It borrows a `SampleBuffer` view of
// audio that some decoder already produced; `DecodedAudio` is the owned form
// the CLI and the analysis session hand around.

mod buffer;
pub mod wav;

pub use buffer::{DecodedAudio, SampleBuffer};
