use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{required_str, required_timestamp, JournalRecord, MalformedRecord, DATE_FIELD};
use crate::store::{Fields, Value};

/// A "fully recharged" check-in confirmed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullChargeEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Screen the check-in came from, e.g. `startScreen` or `homeScreen`.
    pub source: String,
}

impl FullChargeEntry {
    pub fn new(source: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: at,
            source: source.into(),
        }
    }
}

impl JournalRecord for FullChargeEntry {
    const COLLECTION: &'static str = "fullCharges";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".into(), Value::from(self.id.as_str()));
        fields.insert(DATE_FIELD.into(), Value::from(self.date));
        fields.insert("source".into(), Value::from(self.source.as_str()));
        fields.insert("type".into(), Value::from("fullCharge"));
        fields
    }

    fn from_fields(fields: &Fields) -> Result<Self, MalformedRecord> {
        Ok(Self {
            id: required_str(fields, "id")?,
            date: required_timestamp(fields, DATE_FIELD)?,
            source: required_str(fields, "source")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_full_charge_round_trip_and_type_tag() {
        let at = Utc.with_ymd_and_hms(2025, 11, 21, 12, 30, 0).unwrap();
        let entry = FullChargeEntry::new("homeScreen", at);
        let fields = entry.to_fields();
        assert_eq!(fields.get("type"), Some(&Value::from("fullCharge")));
        assert_eq!(FullChargeEntry::from_fields(&fields).unwrap(), entry);
    }

    #[test]
    fn test_full_charge_without_source_is_malformed() {
        let at = Utc.with_ymd_and_hms(2025, 11, 21, 12, 30, 0).unwrap();
        let mut fields = FullChargeEntry::new("startScreen", at).to_fields();
        fields.remove("source");
        assert_eq!(
            FullChargeEntry::from_fields(&fields),
            Err(MalformedRecord::Missing("source"))
        );
    }
}
