use chrono::{DateTime, Utc};

use super::date_key::DateKey;
use crate::store::{Fields, Value};

/// Field every stored record is ordered and range-filtered by.
pub const DATE_FIELD: &str = "date";

/// Why a stored document could not be decoded into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("missing field `{0}`")]
    Missing(&'static str),
    #[error("field `{0}` has the wrong type")]
    WrongType(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A record kind persisted under a date partition.
pub trait JournalRecord: Sized + Send + Sync + 'static {
    /// Sub-collection of the date partition holding this kind.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn timestamp(&self) -> DateTime<Utc>;

    fn date_key(&self) -> DateKey {
        DateKey::from_timestamp(self.timestamp())
    }

    /// Checks invariants that must hold before the record is written.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    fn to_fields(&self) -> Fields;

    fn from_fields(fields: &Fields) -> Result<Self, MalformedRecord>;
}

pub(crate) fn required<'a>(
    fields: &'a Fields,
    name: &'static str,
) -> Result<&'a Value, MalformedRecord> {
    fields.get(name).ok_or(MalformedRecord::Missing(name))
}

pub(crate) fn required_str(fields: &Fields, name: &'static str) -> Result<String, MalformedRecord> {
    required(fields, name)?
        .as_str()
        .map(str::to_string)
        .ok_or(MalformedRecord::WrongType(name))
}

pub(crate) fn required_timestamp(
    fields: &Fields,
    name: &'static str,
) -> Result<DateTime<Utc>, MalformedRecord> {
    required(fields, name)?
        .as_timestamp()
        .ok_or(MalformedRecord::WrongType(name))
}

pub(crate) fn required_array<'a>(
    fields: &'a Fields,
    name: &'static str,
) -> Result<&'a [Value], MalformedRecord> {
    required(fields, name)?
        .as_array()
        .ok_or(MalformedRecord::WrongType(name))
}
