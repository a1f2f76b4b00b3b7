// src/api/dto.rs
//
// Response bodies for the query API.

use serde::{Deserialize, Serialize};

use crate::types::Motion;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccupancyResponse {
    pub current_inside: u64,
    pub total_entered: u64,
    pub total_exited: u64,
    pub frames_processed: u64,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// "active" once a frame has been processed, else "inactive"
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolarityResponse {
    /// Motion now counted as entering
    pub entry_motion: Motion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcceptedResponse {
    pub accepted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
