use serde::{Deserialize, Serialize};

use super::domain::{Application, JobId};

const ALL_JOBS: &str = "all";

/// Job selector; `All` is the "all jobs" sentinel and disables the constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobFilter {
    #[default]
    All,
    Job(JobId),
}

impl From<String> for JobFilter {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_JOBS) {
            JobFilter::All
        } else {
            JobFilter::Job(JobId(trimmed.to_string()))
        }
    }
}

impl From<JobFilter> for String {
    fn from(value: JobFilter) -> Self {
        match value {
            JobFilter::All => ALL_JOBS.to_string(),
            JobFilter::Job(id) => id.0,
        }
    }
}

/// Free-text search plus job constraint applied before bucketing into columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub job: JobFilter,
}

impl FilterState {
    pub fn new(search: impl Into<String>, job: JobFilter) -> Self {
        Self {
            search: search.into(),
            job,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search.trim().is_empty() && self.job == JobFilter::All
    }

    pub fn matches(&self, application: &Application) -> bool {
        self.matches_job(application) && self.matches_text(application)
    }

    fn matches_job(&self, application: &Application) -> bool {
        match &self.job {
            JobFilter::All => true,
            JobFilter::Job(id) => application.job_id == *id,
        }
    }

    fn matches_text(&self, application: &Application) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [
            application.candidate.name.as_str(),
            application.candidate.email.as_str(),
            application.job_title.as_str(),
        ]
        .into_iter()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

/// Order-preserving subset of `applications` that passes `filter`.
pub fn visible<'a>(applications: &'a [Application], filter: &FilterState) -> Vec<&'a Application> {
    applications
        .iter()
        .filter(|application| filter.matches(application))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pipeline::domain::{
        ApplicationId, CandidateIdentity, StageValue,
    };
    use crate::workflows::pipeline::status::PipelineStage;
    use chrono::{TimeZone, Utc};

    fn application(id: &str, name: &str, email: &str, job: &str, title: &str) -> Application {
        Application {
            id: ApplicationId::new(id),
            candidate: CandidateIdentity {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
                location: None,
            },
            job_id: JobId::new(job),
            job_title: title.to_string(),
            status: StageValue::Known(PipelineStage::Pending),
            applied_at: Utc
                .with_ymd_and_hms(2026, 9, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
            expected_salary: None,
            rating: None,
            employer_notes: None,
            interview_scheduled_at: None,
        }
    }

    fn roster() -> Vec<Application> {
        vec![
            application("a", "Grace Hopper", "grace@navy.mil", "job-1", "Compiler Engineer"),
            application("b", "Alan Turing", "alan@bletchley.uk", "job-2", "Cryptanalyst"),
            application("c", "Katherine Johnson", "kj@nasa.gov", "job-1", "Compiler Engineer"),
            application("d", "Edsger Dijkstra", "ewd@utexas.edu", "job-3", "Research Lead"),
        ]
    }

    fn ids(applications: &[&Application]) -> Vec<String> {
        applications
            .iter()
            .map(|application| application.id.0.clone())
            .collect()
    }

    #[test]
    fn empty_search_matches_everything_in_order() {
        let applications = roster();
        let result = visible(&applications, &FilterState::default());
        assert_eq!(ids(&result), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let applications = roster();

        let by_name = visible(&applications, &FilterState::new("TURING", JobFilter::All));
        assert_eq!(ids(&by_name), vec!["b"]);

        let by_email = visible(&applications, &FilterState::new("nasa.gov", JobFilter::All));
        assert_eq!(ids(&by_email), vec!["c"]);

        let by_title = visible(&applications, &FilterState::new("compiler", JobFilter::All));
        assert_eq!(ids(&by_title), vec!["a", "c"]);
    }

    #[test]
    fn job_filter_is_anded_with_search() {
        let applications = roster();
        let job_one = JobFilter::Job(JobId::new("job-1"));

        let only_job = visible(&applications, &FilterState::new("", job_one.clone()));
        assert_eq!(ids(&only_job), vec!["a", "c"]);

        let both = visible(&applications, &FilterState::new("grace", job_one.clone()));
        assert_eq!(ids(&both), vec!["a"]);

        let disjoint = visible(&applications, &FilterState::new("turing", job_one));
        assert!(disjoint.is_empty());
    }

    #[test]
    fn applying_the_same_filter_twice_is_identical() {
        let applications = roster();
        let filter = FilterState::new("  e ", JobFilter::Job(JobId::new("job-1")));
        let first = ids(&visible(&applications, &filter));
        let second = ids(&visible(&applications, &filter));
        assert_eq!(first, second);
    }

    #[test]
    fn job_filter_round_trips_the_all_sentinel() {
        let filter: FilterState =
            serde_json::from_str(r#"{"search":"x","job":"all"}"#).expect("decodes");
        assert_eq!(filter.job, JobFilter::All);

        let scoped: FilterState =
            serde_json::from_str(r#"{"job":"job-9"}"#).expect("decodes");
        assert_eq!(scoped.job, JobFilter::Job(JobId::new("job-9")));
        assert_eq!(scoped.search, "");
        assert!(!scoped.is_unfiltered());
    }
}
