pub mod extractor;
pub mod sse;
pub mod test_utils;
