use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::PipelineStage;

/// Identifier wrapper for candidate applications.
///
/// Numeric ids from the backend decode to their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "WireId")]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "WireId")]
pub struct JobId(pub String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => text,
            WireId::Number(number) => number.to_string(),
        }
    }
}

impl From<WireId> for ApplicationId {
    fn from(id: WireId) -> Self {
        Self(id.into())
    }
}

impl From<WireId> for JobId {
    fn from(id: WireId) -> Self {
        Self(id.into())
    }
}

/// Status exactly as the backend reported it.
///
/// Values outside the stage model are kept rather than rejected so one bad record cannot
/// block decoding of the whole list. The board reports them as integrity anomalies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageValue {
    Known(PipelineStage),
    Unrecognized(String),
}

impl StageValue {
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            StageValue::Known(stage) => Some(*stage),
            StageValue::Unrecognized(_) => None,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            StageValue::Known(stage) => stage.wire_value(),
            StageValue::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for StageValue {
    fn from(raw: String) -> Self {
        match PipelineStage::parse(&raw) {
            Some(stage) => StageValue::Known(stage),
            None => StageValue::Unrecognized(raw),
        }
    }
}

impl From<StageValue> for String {
    fn from(value: StageValue) -> Self {
        match value {
            StageValue::Known(stage) => stage.wire_value().to_string(),
            StageValue::Unrecognized(raw) => raw,
        }
    }
}

impl From<PipelineStage> for StageValue {
    fn from(stage: PipelineStage) -> Self {
        StageValue::Known(stage)
    }
}

/// Contact details captured when the candidate applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One candidate's submission to one job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub candidate: CandidateIdentity,
    pub job_id: JobId,
    pub job_title: String,
    pub status: StageValue,
    pub applied_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "lenient::whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_salary: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_scheduled_at: Option<DateTime<Utc>>,
}

impl Application {
    /// Stage the card is placed under, `None` when the status is outside the model.
    pub fn stage(&self) -> Option<PipelineStage> {
        self.status.stage()
    }

    /// Employer rating when it falls inside the 1-5 scale.
    pub fn rating(&self) -> Option<u8> {
        self.rating.filter(|value| (1..=5).contains(value))
    }
}

/// Optional numeric fields that degrade to `None` instead of failing the record.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accepts integers, fractions (rounded) and numeric strings; anything negative,
    /// non-numeric or out of range for `T` becomes `None`.
    pub(super) fn whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(as_whole)
            .and_then(|number| T::try_from(number).ok()))
    }

    fn as_whole(value: &Value) -> Option<u64> {
        let number = match value {
            Value::Number(number) => {
                if let Some(whole) = number.as_u64() {
                    return Some(whole);
                }
                number.as_f64()?
            }
            Value::String(text) => text.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (number.is_finite() && number >= 0.0 && number <= u64::MAX as f64)
            .then(|| number.round() as u64)
    }
}

/// Job posting entry used to populate the job filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub title: String,
}
