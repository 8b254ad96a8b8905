// src/share/client.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::share::types::Account;
use crate::share::ShareError;

const APPLICATION_ID: &str = "d89443d2-327c-4a6f-89e5-496bbb0317db";
const USER_AGENT: &str = "Dexcom Share/3.0.2.11 CFNetwork/711.2.23 Darwin/14.0.0";
const LOGIN_PATH: &str = "/ShareWebServices/Services/General/LoginPublisherAccountByName";
const READ_PATH: &str = "/ShareWebServices/Services/Publisher/ReadPublisherLatestGlucoseValues";

/// Which Share deployment the account lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Ous,
}

impl Region {
    pub fn base_url(self) -> &'static str {
        match self {
            Region::Us => "https://share1.dexcom.com",
            Region::Ous => "https://shareous1.dexcom.com",
        }
    }
}

/// Raw request/response exchange with the Share service.
#[async_trait]
pub trait ShareApi: Send + Sync {
    /// Returns a fresh session token.
    async fn authenticate(&self, account: &Account) -> Result<String, ShareError>;

    /// Returns the raw (newest-first) JSON body. A rejected token is
    /// reported as `ShareError::AuthExpired`.
    async fn read_latest(
        &self,
        token: &str,
        minutes: u64,
        max_count: u64,
    ) -> Result<String, ShareError>;
}

#[derive(Serialize)]
struct LoginBody<'a> {
    #[serde(rename = "accountName")]
    account_name: &'a str,
    password: &'a str,
    #[serde(rename = "applicationId")]
    application_id: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoginReply {
    Token(String),
    Fault {
        #[serde(rename = "Code", default)]
        code: Option<String>,
        #[serde(rename = "Message", default)]
        message: Option<String>,
    },
}

#[derive(Clone)]
pub struct HttpShareApi {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpShareApi {
    pub fn new(region: Region) -> Self {
        Self::with_base_url(region.base_url())
    }

    /// Point at an arbitrary deployment (e.g. a local stand-in).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

#[async_trait]
impl ShareApi for HttpShareApi {
    async fn authenticate(&self, account: &Account) -> Result<String, ShareError> {
        let body = LoginBody {
            account_name: &account.username,
            password: &account.password,
            application_id: APPLICATION_ID,
        };
        let resp = self.post(LOGIN_PATH).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        match serde_json::from_str::<LoginReply>(&text) {
            Ok(LoginReply::Token(token)) if status.is_success() && !token.is_empty() => Ok(token),
            Ok(LoginReply::Fault { code, message }) => Err(ShareError::Login(format!(
                "{} ({status}): {}",
                code.unwrap_or_else(|| "unknown".into()),
                message.unwrap_or_default()
            ))),
            _ => Err(ShareError::Login(format!("unexpected reply ({status}): {text}"))),
        }
    }

    async fn read_latest(
        &self,
        token: &str,
        minutes: u64,
        max_count: u64,
    ) -> Result<String, ShareError> {
        let t0 = std::time::Instant::now();
        let minutes = minutes.to_string();
        let max_count = max_count.to_string();
        let resp = self
            .post(READ_PATH)
            .query(&[
                ("sessionID", token),
                ("minutes", minutes.as_str()),
                ("maxCount", max_count.as_str()),
            ])
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .inspect_err(|_| {
                counter!("share_fetch_errors_total").increment(1);
            })?;

        histogram!("share_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !resp.status().is_success() {
            tracing::debug!(target: "share", status = %resp.status(), "read rejected");
            return Err(ShareError::AuthExpired);
        }
        Ok(resp.text().await?)
    }
}
