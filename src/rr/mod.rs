//! Resource records synthesized from stored values

mod kind;
mod ttl;

pub use self::kind::{MalformedValue, RecordKind, UnsupportedKind};
pub use self::ttl::TimeToLive;

/// DNS Name with case preserved.
///
pub use hickory_proto::rr::Name;

/// DNS Name converted to the canonical lowercase form.
///
pub use hickory_proto::rr::LowerName;
