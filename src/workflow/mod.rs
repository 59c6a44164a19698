pub mod extraction_flow;
pub mod item_ctx;

pub use extraction_flow::ExtractionFlow;
pub use item_ctx::ItemCtx;
