pub mod correction;
pub mod delay_line;
pub mod synthesizer;

pub use correction::CorrectionMatrixCache;
pub use delay_line::{DelayLine, Sample};
pub use synthesizer::{SampleSynthesizer, SynthesisOutcome};
