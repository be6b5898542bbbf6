// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read API used by the authoritative-refetch coordinator.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sl_core::{Appointment, AppointmentScope};
use thiserror::Error;
use url::Url;

/// Errors returned by the read API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot connect to {0}")]
    Connection(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("not signed in")]
    Unauthenticated,
}

/// Boxed future returned by [`AppointmentsApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Source of the authoritative appointment list for a scope.
pub trait AppointmentsApi: Send + Sync + 'static {
    fn get_appointments(&self, scope: AppointmentScope) -> ApiFuture<'_, Vec<Appointment>>;

    /// Credential for subsequent requests. `None` signs out.
    fn set_token(&self, _token: Option<String>) {}
}

/// The list endpoint answers with either a bare array or `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(super) enum ListResponse {
    Bare(Vec<Appointment>),
    Wrapped { data: Vec<Appointment> },
}

impl ListResponse {
    pub(super) fn into_items(self) -> Vec<Appointment> {
        match self {
            ListResponse::Bare(items) | ListResponse::Wrapped { data: items } => items,
        }
    }
}

/// HTTP client for `GET {base}/appointments?date=YYYY-MM-DD`.
pub struct HttpAppointmentsApi {
    client: Client,
    base_url: Url,
    token: Mutex<Option<String>>,
}

impl HttpAppointmentsApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ApiError::Connection(format!("{base_url}: {e}")))?;
        // Url::join would otherwise drop the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()?;
        Ok(HttpAppointmentsApi {
            client,
            base_url,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn appointments_url(&self) -> Result<Url, ApiError> {
        self.base_url
            .join("appointments")
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn fetch(&self, scope: AppointmentScope) -> Result<Vec<Appointment>, ApiError> {
        let token = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ApiError::Unauthenticated)?;
        let url = self.appointments_url()?;

        let response = self
            .client
            .get(url.clone())
            .query(&scope.query_pairs())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ApiError::Connection(url.to_string())
                } else {
                    ApiError::Http(e)
                }
            })?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthenticated),
            s => return Err(ApiError::Status(s.as_u16())),
        }

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(body.into_items())
    }
}

impl AppointmentsApi for HttpAppointmentsApi {
    fn get_appointments(&self, scope: AppointmentScope) -> ApiFuture<'_, Vec<Appointment>> {
        Box::pin(self.fetch(scope))
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}
