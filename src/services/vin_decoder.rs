use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::http_client::HttpClient;

/// Attribute map produced by decoding a VIN (variable name -> value).
pub type DecodedAttributes = BTreeMap<String, String>;

/// Abstract decode capability. The submission pipeline only depends on this
/// trait; the production implementation talks to the NHTSA vPIC service.
#[async_trait]
pub trait VinDecoder: Send + Sync {
    /// Decode a VIN into its attribute map. Upstream failures (timeout,
    /// non-2xx, malformed body) yield an empty map, never an error.
    async fn decode(&self, vin: &str) -> DecodedAttributes;
}

#[derive(Deserialize)]
struct VpicResponse {
    #[serde(rename = "Results", default)]
    results: Vec<VpicItem>,
}

#[derive(Deserialize)]
struct VpicItem {
    #[serde(rename = "Variable", default)]
    variable: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

pub struct NhtsaVinDecoder {
    http: HttpClient,
    base_url: String,
}

impl NhtsaVinDecoder {
    pub fn new(base_url: String) -> Self {
        Self {
            http: HttpClient::new(),
            base_url,
        }
    }
}

#[async_trait]
impl VinDecoder for NhtsaVinDecoder {
    async fn decode(&self, vin: &str) -> DecodedAttributes {
        let url = format!("{}/vehicles/DecodeVin/{}?format=json", self.base_url, vin);

        let response: VpicResponse = match self.http.get_json(&url).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("VIN decode failed for {}: {}", vin, e);
                return DecodedAttributes::new();
            }
        };

        let mut decoded = DecodedAttributes::new();
        for item in response.results {
            if let Some(value) = item.value {
                let value = value.trim();
                if !value.is_empty() && value != "Not Applicable" && !item.variable.is_empty() {
                    decoded.insert(item.variable, value.to_string());
                }
            }
        }
        decoded
    }
}

/// Fixed-map decoder for tests.
pub struct StaticVinDecoder {
    attributes: DecodedAttributes,
}

impl StaticVinDecoder {
    pub fn new(attributes: DecodedAttributes) -> Self {
        Self { attributes }
    }

    pub fn empty() -> Self {
        Self {
            attributes: DecodedAttributes::new(),
        }
    }
}

#[async_trait]
impl VinDecoder for StaticVinDecoder {
    async fn decode(&self, _vin: &str) -> DecodedAttributes {
        self.attributes.clone()
    }
}
