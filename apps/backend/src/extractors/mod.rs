pub mod remote;
pub mod request_context;
pub mod table_id;
pub mod validated_json;

pub use remote::RemoteAddr;
pub use table_id::TableId;
pub use validated_json::ValidatedJson;
