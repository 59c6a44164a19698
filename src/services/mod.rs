pub mod image_preprocessor;
pub mod recognition;
pub mod results_writer;
pub mod structured_extractor;
pub mod text_normalizer;

pub use image_preprocessor::{ImagePreprocessor, PreprocessSettings};
pub use recognition::{OcrBackend, Recognition, RecognitionEngine, RecognitionProfile, TesseractOcr};
pub use results_writer::ResultsWriter;
pub use structured_extractor::StructuredExtractor;
