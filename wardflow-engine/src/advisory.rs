//! HTTP advisory client.
//!
//! Posts the task and candidate roster to an external suggestion service
//! and parses back an optional hint. The orchestrator treats the whole
//! thing as best-effort: timeouts, transport errors and unparseable bodies
//! all degrade to "no hint".

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use wardflow_core::{StaffMember, Task};

use crate::stores::{AdvisoryHint, AdvisorySignal};

#[derive(Debug, Clone)]
pub struct AdvisoryConfig {
    /// Endpoint that accepts the suggestion request, e.g.
    /// `https://advisor.internal/v1/suggest`.
    pub url: String,
    pub api_key: Option<String>,
}

pub struct HttpAdvisory {
    config: AdvisoryConfig,
    client: reqwest::Client,
}

impl HttpAdvisory {
    pub fn new(config: AdvisoryConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct CandidateIn<'a> {
    staff_id: &'a str,
    roles: &'a [String],
    specialty_tags: &'a [String],
}

#[derive(Serialize)]
struct Req<'a> {
    task_id: &'a str,
    title: &'a str,
    department: &'a str,
    category: &'a str,
    specialty_tags: &'a [String],
    candidates: Vec<CandidateIn<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    suggestion: Option<SuggestionOut>,
}

#[derive(Deserialize)]
struct SuggestionOut {
    staff_id: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

#[async_trait]
impl AdvisorySignal for HttpAdvisory {
    async fn suggest_assignment(
        &self,
        task: &Task,
        candidates: &[StaffMember],
    ) -> Result<Option<AdvisoryHint>> {
        let body = Req {
            task_id: &task.id,
            title: &task.title,
            department: &task.department,
            category: &task.category,
            specialty_tags: &task.specialty_tags,
            candidates: candidates
                .iter()
                .map(|s| CandidateIn {
                    staff_id: &s.id,
                    roles: &s.roles,
                    specialty_tags: &s.specialty_tags,
                })
                .collect(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
        }

        let resp = self
            .client
            .post(&self.config.url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("advisory request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("advisory error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse advisory response")?;
        let Some(suggestion) = out.suggestion else {
            return Ok(None);
        };
        // A hint naming someone outside the roster is useless downstream.
        if !candidates.iter().any(|c| c.id == suggestion.staff_id) {
            return Ok(None);
        }
        Ok(Some(AdvisoryHint {
            staff_id: suggestion.staff_id,
            confidence: suggestion.confidence.clamp(0.0, 1.0),
            reasoning: suggestion.reasoning,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape_is_stable() {
        let task = Task::new("t1", "evening meds", "icu", "medication");
        let staff = StaffMember::new("n1", "icu").with_roles(vec!["nurse".to_string()]);
        let body = Req {
            task_id: &task.id,
            title: &task.title,
            department: &task.department,
            category: &task.category,
            specialty_tags: &task.specialty_tags,
            candidates: vec![CandidateIn {
                staff_id: &staff.id,
                roles: &staff.roles,
                specialty_tags: &staff.specialty_tags,
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["task_id"], "t1");
        assert_eq!(json["candidates"][0]["staff_id"], "n1");
    }

    #[test]
    fn response_defaults_missing_fields() {
        let out: Resp = serde_json::from_str(r#"{"suggestion":{"staff_id":"n1"}}"#).unwrap();
        let s = out.suggestion.unwrap();
        assert_eq!(s.staff_id, "n1");
        assert_eq!(s.confidence, 0.0);
        assert!(s.reasoning.is_empty());

        let none: Resp = serde_json::from_str(r#"{"suggestion":null}"#).unwrap();
        assert!(none.suggestion.is_none());
    }
}
