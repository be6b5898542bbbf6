// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Appointment records and the date scope used to read them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::deserialize_id;

/// A scheduled appointment as returned by the read API.
///
/// Pushed appointment events are only invalidation signals, so this type is
/// decoded from read results, never from event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Appointment {
    /// Creates an appointment with only an id and date set.
    pub fn new(id: impl Into<String>, date: NaiveDate) -> Self {
        Appointment {
            id: id.into(),
            date: Some(date),
            start_time: None,
            end_time: None,
            client_name: None,
            service_name: None,
            staff_name: None,
            status: None,
        }
    }
}

/// Bounds an appointment read to the active selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppointmentScope {
    pub date: NaiveDate,
}

impl AppointmentScope {
    pub fn new(date: NaiveDate) -> Self {
        AppointmentScope { date }
    }

    /// Parses a `YYYY-MM-DD` date into a scope.
    pub fn parse(date: &str) -> Result<Self> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(AppointmentScope::new)
            .map_err(|_| Error::InvalidDate(date.to_string()))
    }

    /// Query parameters for the read API.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![("date", self.date.format("%Y-%m-%d").to_string())]
    }
}

#[cfg(test)]
#[path = "appointment_tests.rs"]
mod tests;
