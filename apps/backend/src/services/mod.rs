//! Application services.

pub mod request_context;
pub mod table_flow;

pub use request_context::RequestContext;
pub use table_flow::TableFlowService;
