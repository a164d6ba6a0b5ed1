//! Outcome histogram.

use std::fmt;

use reqwest::StatusCode;

use crate::client::Outcome;

/// Counts of withdrawal outcomes by class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Histogram {
    pub total: usize,
    pub successful: usize,
    pub conflict: usize,
    pub bad_request: usize,
    pub server_error: usize,
    pub other: usize,
}

impl Histogram {
    /// Tallies a batch of outcomes.
    pub fn from_results(results: &[Outcome]) -> Self {
        let mut histogram = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result {
                Ok((status, _)) if status.is_success() => histogram.successful += 1,
                Ok((status, _)) if *status == StatusCode::CONFLICT => histogram.conflict += 1,
                Ok((status, _)) if *status == StatusCode::BAD_REQUEST => histogram.bad_request += 1,
                Ok((status, _)) if status.is_server_error() => histogram.server_error += 1,
                Ok(_) | Err(_) => histogram.other += 1,
            }
        }

        histogram
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total operations: {}", self.total)?;
        writeln!(f, "Successful: {}", self.successful)?;
        writeln!(f, "409 Conflict: {}", self.conflict)?;
        writeln!(f, "400 Bad Request: {}", self.bad_request)?;
        writeln!(f, "5xx Server Error: {}", self.server_error)?;
        write!(f, "Other: {}", self.other)
    }
}
