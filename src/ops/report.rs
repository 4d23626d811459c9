//! Turning operation results into messages.
//!
//! Every failure is reported as text rather than propagated, so a caller
//! driving many operations never stops on one bad request.

use crate::common::error::Result;
use serde::Serialize;
use std::fmt::Display;

/// A message for `result`: `success` on success, or the error text.
pub fn report<T>(operation: &str, result: Result<T>, success: impl FnOnce(&T) -> String) -> String {
    match result {
        Ok(value) => success(&value),
        Err(err) => {
            log::warn!("{} failed: {}", operation, err);
            format!("Failed to {}: {}", operation.replace('_', " "), err)
        },
    }
}

/// Like [`report`], rendering the value with `Display`.
pub fn report_display<T: Display>(operation: &str, result: Result<T>) -> String {
    report(operation, result, |value| value.to_string())
}

/// Like [`report`], rendering the value as YAML.
pub fn report_yaml<T: Serialize>(operation: &str, result: Result<T>) -> String {
    report(operation, result, |value| match serde_saphyr::to_string(value) {
        Ok(yaml) => yaml,
        Err(e) => format!("Failed to render {} result: {}", operation.replace('_', " "), e),
    })
}
