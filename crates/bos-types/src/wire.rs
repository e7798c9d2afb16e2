//! Field names and type tags of the record wire format.

/// Key carrying the type tag of a Base Object or record.
pub const TYPE_KEY: &str = "speckle_type";

/// Key holding a record's content-addressed id.
pub const ID_KEY: &str = "id";

/// Key holding a record's detached-descendant count.
pub const TOTAL_CHILDREN_COUNT_KEY: &str = "totalChildrenCount";

/// Key holding a record's closure table. Omitted when the closure is empty.
pub const CLOSURE_KEY: &str = "__closure";

/// Key of the host application's own identifier for an object.
pub const APPLICATION_ID_KEY: &str = "applicationId";

/// Key of the target id inside a reference.
pub const REFERENCED_ID_KEY: &str = "referencedId";

/// Type tag of a reference placeholder.
pub const REFERENCE_TYPE: &str = "reference";

/// Type tag of a synthetic chunk record.
pub const DATA_CHUNK_TYPE: &str = "Speckle.Core.Models.DataChunk";

/// Key of the element list inside a chunk record.
pub const DATA_KEY: &str = "data";
