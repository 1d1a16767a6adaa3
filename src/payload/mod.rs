//! Static flavor-catalog payloads for `/json1k` and `/json10k`
//!
//! Each response decodes the embedded fixture into [`Flavors`] and encodes it
//! again. Fields missing from a fixture entry stay missing in the output, and
//! `swap` is kept as a raw JSON value because the 10k fixture carries both
//! numbers and empty strings there.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BenchError, BenchResult};

pub const JSON_1K: &str = include_str!("fixtures/json1k.json");
pub const JSON_10K: &str = include_str!("fixtures/json10k.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Json1k,
    Json10k,
}

impl Payload {
    pub const ALL: [Payload; 2] = [Payload::Json1k, Payload::Json10k];

    pub fn name(self) -> &'static str {
        match self {
            Payload::Json1k => "json1k",
            Payload::Json10k => "json10k",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Payload::Json1k => JSON_1K,
            Payload::Json10k => JSON_10K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorLink {
    pub href: String,
    pub rel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorDetails {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rxtx_factor: Option<f64>,
    #[serde(
        rename = "OS-FLV-EXT-DATA:ephemeral",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ephemeral: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    pub links: Vec<FlavorLink>,
    #[serde(
        rename = "OS-FLV-WITH-EXT-SPECS:extra_specs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extra_specs: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavors {
    pub flavors: Vec<FlavorDetails>,
}

pub fn decode(payload: Payload) -> BenchResult<Flavors> {
    serde_json::from_str(payload.source()).map_err(|source| BenchError::DecodeFault {
        name: payload.name(),
        source,
    })
}

pub fn encode(flavors: &Flavors) -> BenchResult<Vec<u8>> {
    serde_json::to_vec(flavors).map_err(|e| BenchError::RenderFailure(e.to_string()))
}

/// Decode the fixture and encode it again.
pub fn respond(payload: Payload) -> BenchResult<Vec<u8>> {
    encode(&decode(payload)?)
}

/// Decode every fixture once. Called before the server starts listening so a
/// broken constant is a startup failure.
pub fn verify_all() -> BenchResult<()> {
    for payload in Payload::ALL {
        let flavors = decode(payload)?;
        tracing::debug!(
            "Payload {} decodes to {} flavors",
            payload.name(),
            flavors.flavors.len()
        );
    }
    Ok(())
}
