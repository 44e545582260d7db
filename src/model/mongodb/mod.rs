mod bson;
mod collection;
mod errors;

pub use bson::{serde_hex_id, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{is_duplicate_key_error, DUPLICATE_KEY};
