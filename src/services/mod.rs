pub mod batch;
pub mod cancel;
pub mod file_matcher;
pub mod pipeline;
pub mod reconciler;
pub mod remote;
pub mod retry;
