pub mod schema;
pub mod extract;
pub mod event;
pub mod record;
pub mod prompts;

pub use schema::{validate, Entity, SchemaError, StructuredResult};
pub use extract::{extract_json_payload, parse_structured, ExtractError};
pub use event::{EventEmitter, ProgressEvent};
pub use record::{ConversionRecord, NewConversion};
