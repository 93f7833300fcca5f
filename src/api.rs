use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;

/// Lobstr crawler id for the LinkedIn profile scraper.
pub const LINKEDIN_PROFILE_CRAWLER_ID: &str = "5c11752d8687df2332c08247c4fb655a";

/// One scraped profile, as returned by the vendor: field name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize, Clone)]
pub struct Squid {
    pub id: String,
    pub name: Option<String>,
    pub crawler: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Account {
    pub id: String,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Queued | RunStatus::Running)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunStats {
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub percent_done: f64,
}

impl RunStats {
    /// Older API responses only carry `is_done`; treat those as running
    /// until done.
    pub fn status(&self) -> RunStatus {
        self.status.unwrap_or(if self.is_done {
            RunStatus::Done
        } else {
            RunStatus::Running
        })
    }
}

/// List responses come wrapped in a `data` envelope.
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
}

/// The remote job API, as used by the orchestrator. Implemented by
/// [`LobstrClient`] for real runs and by a fake in tests.
pub trait SquidApi {
    fn list_squids(&self) -> Result<Vec<Squid>>;
    /// Look up a single squid; `None` when the id no longer exists.
    fn get_squid(&self, id: &str) -> Result<Option<Squid>>;
    fn create_squid(&self) -> Result<String>;
    fn update_squid(&self, id: &str, account_id: &str, enrich_email: bool) -> Result<()>;
    fn empty_squid(&self, id: &str) -> Result<()>;
    fn delete_squid(&self, id: &str) -> Result<()>;
    fn list_accounts(&self) -> Result<Vec<Account>>;
    /// Add one task per URL, preserving input order. Returns the task count.
    fn add_tasks(&self, squid_id: &str, urls: &[String]) -> Result<usize>;
    fn start_run(&self, squid_id: &str) -> Result<String>;
    fn run_stats(&self, run_id: &str) -> Result<RunStats>;
    fn abort_run(&self, run_id: &str) -> Result<()>;
    fn fetch_results(&self, run_id: &str) -> Result<Vec<Record>>;

    /// Only the squids bound to the LinkedIn profile crawler.
    fn list_profile_squids(&self) -> Result<Vec<Squid>> {
        Ok(self
            .list_squids()?
            .into_iter()
            .filter(|s| s.crawler.as_deref() == Some(LINKEDIN_PROFILE_CRAWLER_ID))
            .collect())
    }

    /// Only the accounts synced from LinkedIn.
    fn list_linkedin_accounts(&self) -> Result<Vec<Account>> {
        Ok(self
            .list_accounts()?
            .into_iter()
            .filter(|a| a.kind.as_deref() == Some("linkedin-sync"))
            .collect())
    }
}

/// Blocking HTTP client for the Lobstr.io v1 API.
pub struct LobstrClient {
    http: Client,
    base_url: String,
}

impl LobstrClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Token {}", config.api_key))
            .context("API key contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(LobstrClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl SquidApi for LobstrClient {
    fn list_squids(&self) -> Result<Vec<Squid>> {
        let response = self
            .http
            .get(self.endpoint("/squids"))
            .send()
            .context("Failed to send list squids request")?
            .error_for_status()
            .context("List squids rejected by API")?;
        let envelope: ListEnvelope<Squid> = response
            .json()
            .context("Failed to decode squid list response")?;
        Ok(envelope.data)
    }

    fn get_squid(&self, id: &str) -> Result<Option<Squid>> {
        let response = self
            .http
            .get(self.endpoint(&format!("/squids/{}", id)))
            .send()
            .context("Failed to send get squid request")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("Get squid rejected by API")?;
        let squid = response.json().context("Failed to decode squid response")?;
        Ok(Some(squid))
    }

    fn create_squid(&self) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("/squids"))
            .json(&json!({ "crawler": LINKEDIN_PROFILE_CRAWLER_ID }))
            .send()
            .context("Failed to send create squid request")?
            .error_for_status()
            .context("Create squid rejected by API")?;
        let created: CreatedResource = response
            .json()
            .context("Failed to decode create squid response")?;
        Ok(created.id)
    }

    fn update_squid(&self, id: &str, account_id: &str, enrich_email: bool) -> Result<()> {
        let payload = json!({
            "accounts": [account_id],
            "no_line_breaks": true,
            "params": { "functions": { "email": enrich_email } },
        });
        self.http
            .post(self.endpoint(&format!("/squids/{}", id)))
            .json(&payload)
            .send()
            .context("Failed to send update squid request")?
            .error_for_status()
            .context("Update squid rejected by API")?;
        Ok(())
    }

    fn empty_squid(&self, id: &str) -> Result<()> {
        self.http
            .post(self.endpoint(&format!("/squids/{}/empty", id)))
            .json(&json!({ "type": "url" }))
            .send()
            .context("Failed to send empty squid request")?
            .error_for_status()
            .context("Empty squid rejected by API")?;
        Ok(())
    }

    fn delete_squid(&self, id: &str) -> Result<()> {
        self.http
            .delete(self.endpoint(&format!("/squids/{}", id)))
            .send()
            .context("Failed to send delete squid request")?
            .error_for_status()
            .context("Delete squid rejected by API")?;
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let response = self
            .http
            .get(self.endpoint("/accounts"))
            .send()
            .context("Failed to send list accounts request")?
            .error_for_status()
            .context("List accounts rejected by API")?;
        let envelope: ListEnvelope<Account> = response
            .json()
            .context("Failed to decode account list response")?;
        Ok(envelope.data)
    }

    fn add_tasks(&self, squid_id: &str, urls: &[String]) -> Result<usize> {
        let tasks: Vec<_> = urls.iter().map(|u| json!({ "url": u })).collect();
        self.http
            .post(self.endpoint("/tasks"))
            .json(&json!({ "tasks": tasks, "squid": squid_id }))
            .send()
            .context("Failed to send add tasks request")?
            .error_for_status()
            .context("Add tasks rejected by API")?;
        Ok(urls.len())
    }

    fn start_run(&self, squid_id: &str) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("/runs"))
            .json(&json!({ "squid": squid_id }))
            .send()
            .context("Failed to send start run request")?
            .error_for_status()
            .context("Start run rejected by API")?;
        let created: CreatedResource = response
            .json()
            .context("Failed to decode start run response")?;
        Ok(created.id)
    }

    fn run_stats(&self, run_id: &str) -> Result<RunStats> {
        let response = self
            .http
            .get(self.endpoint(&format!("/runs/{}/stats", run_id)))
            .send()
            .context("Failed to send run stats request")?
            .error_for_status()
            .context("Run stats rejected by API")?;
        let stats = response
            .json()
            .context("Failed to decode run stats response")?;
        Ok(stats)
    }

    fn abort_run(&self, run_id: &str) -> Result<()> {
        self.http
            .post(self.endpoint(&format!("/runs/{}/abort", run_id)))
            .send()
            .context("Failed to send abort run request")?
            .error_for_status()
            .context("Abort run rejected by API")?;
        Ok(())
    }

    fn fetch_results(&self, run_id: &str) -> Result<Vec<Record>> {
        let response = self
            .http
            .get(self.endpoint("/results"))
            .query(&[("run", run_id)])
            .send()
            .context("Failed to send fetch results request")?
            .error_for_status()
            .context("Fetch results rejected by API")?;
        let records = response
            .json()
            .context("Failed to decode results response")?;
        Ok(records)
    }
}
