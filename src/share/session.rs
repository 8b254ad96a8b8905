// src/share/session.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use metrics::counter;

use crate::share::client::ShareApi;
use crate::share::parse::parse_entries;
use crate::share::store::CredentialStore;
use crate::share::types::{Account, Credential, Entry};
use crate::share::{window_request, ShareError, WindowFetcher, MAX_FETCH_ATTEMPTS};

/// An authenticated Share session. Owns the only copy of the credential;
/// every refresh goes through `&mut self`, so at most one is in flight.
pub struct Session {
    api: Arc<dyn ShareApi>,
    store: Box<dyn CredentialStore>,
    account: Account,
    cred: Credential,
}

impl Session {
    /// Restore a saved token if there is one, otherwise log in and save.
    pub async fn dial(
        api: Arc<dyn ShareApi>,
        store: Box<dyn CredentialStore>,
        account: Account,
    ) -> Result<Self, ShareError> {
        if let Some(cred) = store.load() {
            tracing::debug!(target: "share", user = %account.username, "restored saved session");
            return Ok(Self {
                api,
                store,
                account,
                cred,
            });
        }

        let token = api.authenticate(&account).await?;
        let s = Self {
            api,
            store,
            account,
            cred: Credential { token },
        };
        s.persist();
        Ok(s)
    }

    pub fn credential(&self) -> &Credential {
        &self.cred
    }

    async fn refresh(&mut self) -> Result<(), ShareError> {
        counter!("share_reauth_total").increment(1);
        let token = self.api.authenticate(&self.account).await?;
        self.cred = Credential { token };
        self.persist();
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.cred) {
            tracing::warn!(target: "share", "failed to save session: {e:#}");
        }
    }

    /// Retrieve the readings of the last `lookback`, oldest first. Best
    /// effort: the service itself may have gaps.
    pub async fn tail(&mut self, lookback: Duration) -> Result<Vec<Entry>, ShareError> {
        let (minutes, max_count) = window_request(lookback);
        counter!("share_fetch_total").increment(1);

        let mut attempt = 0;
        let body = loop {
            attempt += 1;
            let res = self
                .api
                .read_latest(&self.cred.token, minutes, max_count)
                .await;
            match res {
                Ok(body) => break body,
                Err(ShareError::AuthExpired) if attempt < MAX_FETCH_ATTEMPTS => {
                    tracing::debug!(target: "share", attempt, "token rejected, refreshing");
                    self.refresh().await?;
                }
                Err(ShareError::AuthExpired) => {
                    counter!("share_fetch_errors_total").increment(1);
                    return Err(ShareError::ExhaustedRetries { attempts: attempt });
                }
                Err(e) => {
                    counter!("share_fetch_errors_total").increment(1);
                    return Err(e);
                }
            }
        };

        parse_entries(&body).inspect_err(|_| {
            counter!("share_fetch_errors_total").increment(1);
        })
    }
}

#[async_trait]
impl WindowFetcher for Session {
    async fn fetch_window(&mut self, lookback: Duration) -> Result<Vec<Entry>, ShareError> {
        self.tail(lookback).await
    }
}
