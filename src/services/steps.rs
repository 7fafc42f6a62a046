//! Daily step totals from an external activity source.
//!
//! Step data only enriches the insight report. Every failure here collapses
//! to "unavailable" at [`fetch_steps_best_effort`].

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::DateKey;

pub type StepTotals = BTreeMap<DateKey, u64>;

#[async_trait]
pub trait StepCountSource: Send + Sync {
    /// Whether the user has granted access to step data.
    async fn authorize(&self) -> anyhow::Result<bool>;

    /// Step totals per day for `start..=end`. Days without data are absent.
    async fn daily_totals(&self, start: DateKey, end: DateKey) -> anyhow::Result<StepTotals>;
}

/// Used when no step source is configured.
pub struct DisabledStepSource;

#[async_trait]
impl StepCountSource for DisabledStepSource {
    async fn authorize(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn daily_totals(&self, _start: DateKey, _end: DateKey) -> anyhow::Result<StepTotals> {
        anyhow::bail!("Step source is disabled")
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizationBody {
    authorized: bool,
}

#[derive(Debug, Deserialize)]
struct DailyTotal {
    date: DateKey,
    steps: u64,
}

/// Step source behind a small JSON HTTP API:
/// `GET {base}/authorization` and `GET {base}/daily-totals?start=&end=`.
pub struct HttpStepSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStepSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Step source error {}: {}", status, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl StepCountSource for HttpStepSource {
    async fn authorize(&self) -> anyhow::Result<bool> {
        let response = self.send(self.get("/authorization")).await?;
        let body: AuthorizationBody = response.json().await?;
        Ok(body.authorized)
    }

    async fn daily_totals(&self, start: DateKey, end: DateKey) -> anyhow::Result<StepTotals> {
        let request = self.get("/daily-totals").query(&[
            ("start", start.to_string()),
            ("end", end.to_string()),
        ]);
        let days: Vec<DailyTotal> = self.send(request).await?.json().await?;
        Ok(days
            .into_iter()
            .filter(|day| day.date >= start && day.date <= end)
            .map(|day| (day.date, day.steps))
            .collect())
    }
}

/// Step totals for the window, or `None` if the source is unauthorised or
/// fails in any way.
pub async fn fetch_steps_best_effort(
    source: &dyn StepCountSource,
    start: DateKey,
    end: DateKey,
) -> Option<StepTotals> {
    match source.authorize().await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("Step data not authorised, skipping");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Step source authorisation failed");
            return None;
        }
    }

    match source.daily_totals(start, end).await {
        Ok(totals) => {
            tracing::debug!(days = totals.len(), %start, %end, "Step totals fetched");
            Some(totals)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Step totals unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        authorized: anyhow::Result<bool>,
        totals: StepTotals,
        fail_totals: bool,
    }

    #[async_trait]
    impl StepCountSource for FixedSource {
        async fn authorize(&self) -> anyhow::Result<bool> {
            match &self.authorized {
                Ok(granted) => Ok(*granted),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        async fn daily_totals(&self, _start: DateKey, _end: DateKey) -> anyhow::Result<StepTotals> {
            if self.fail_totals {
                anyhow::bail!("timeout");
            }
            Ok(self.totals.clone())
        }
    }

    fn day(raw: &str) -> DateKey {
        raw.parse().unwrap()
    }

    fn totals() -> StepTotals {
        [(day("2025-11-01"), 6000), (day("2025-11-02"), 4000)]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_authorised_source_returns_totals() {
        let source = FixedSource {
            authorized: Ok(true),
            totals: totals(),
            fail_totals: false,
        };
        let steps = fetch_steps_best_effort(&source, day("2025-11-01"), day("2025-11-30")).await;
        assert_eq!(steps, Some(totals()));
    }

    #[tokio::test]
    async fn test_denied_or_failing_source_is_unavailable() {
        let denied = FixedSource {
            authorized: Ok(false),
            totals: totals(),
            fail_totals: false,
        };
        let broken_auth = FixedSource {
            authorized: Err(anyhow::anyhow!("no network")),
            totals: totals(),
            fail_totals: false,
        };
        let broken_totals = FixedSource {
            authorized: Ok(true),
            totals: totals(),
            fail_totals: true,
        };
        let (start, end) = (day("2025-11-01"), day("2025-11-30"));

        assert!(fetch_steps_best_effort(&denied, start, end).await.is_none());
        assert!(fetch_steps_best_effort(&broken_auth, start, end).await.is_none());
        assert!(fetch_steps_best_effort(&broken_totals, start, end).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_source_is_unavailable() {
        let steps =
            fetch_steps_best_effort(&DisabledStepSource, day("2025-11-01"), day("2025-11-02")).await;
        assert!(steps.is_none());
    }

    #[test]
    fn test_http_source_trims_trailing_slash() {
        let source = HttpStepSource::new("http://localhost:9000/", None).unwrap();
        assert_eq!(source.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_daily_total_parses_date_key() {
        let parsed: Vec<DailyTotal> =
            serde_json::from_str(r#"[{"date":"2025-11-03","steps":7021}]"#).unwrap();
        assert_eq!(parsed[0].date, day("2025-11-03"));
        assert_eq!(parsed[0].steps, 7021);
        assert!(serde_json::from_str::<Vec<DailyTotal>>(r#"[{"date":"11/03","steps":1}]"#).is_err());
    }
}
