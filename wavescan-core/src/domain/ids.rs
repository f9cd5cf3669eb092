use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash of a bar series (BLAKE3 over dates and OHLCV values).
///
/// Two series with the same symbol-independent content produce the same hash,
/// so the hash identifies the data a computation was run on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
