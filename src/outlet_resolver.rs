use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;

/// WFS layer holding simplified HUC-8 outlet segments.
const OUTLET_TYPE_NAME: &str = "hydrology:seg_h8_outlet_stats_simplified";

/// Sentinel marking a feature as the watershed outlet.
const OUTLET_FLAG: i64 = 1;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    h8_outlet: Option<i64>,
    // Arrives as a JSON number or string depending on the layer build
    #[serde(default)]
    seg_id_nat: Option<Value>,
}

/// Client for the GeoServer WFS endpoint that maps a HUC-8 watershed to the
/// stream segment at its drainage outlet.
#[derive(Clone)]
pub struct OutletResolver {
    client: reqwest::Client,
    base_url: String,
}

impl OutletResolver {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn query_url(&self, huc_id: &str) -> String {
        let expression = format!("huc8={huc_id}");
        let filter = urlencoding::encode(&expression);
        format!(
            "{}/hydrology/ows?service=WFS&version=1.0.0&request=GetFeature&typeName={}&outputFormat=application/json&srsName=EPSG:4326&cql_filter={}",
            self.base_url, OUTLET_TYPE_NAME, filter
        )
    }

    /// Resolve the outlet segment id for a HUC-8 watershed.
    ///
    /// Returns `Ok(None)` when the service responds with no features, no
    /// feature flagged as the outlet, or an outlet missing its segment id.
    /// Callers treat that as "leave the current segment alone".
    #[instrument(skip(self), fields(huc_id = %huc_id))]
    pub async fn resolve(&self, huc_id: &str) -> Result<Option<String>, FetchError> {
        let url = self.query_url(huc_id);
        debug!(%url, "Requesting outlet features from WFS");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!(%status, "Received WFS response");

        if !status.is_success() {
            return Err(FetchError::Http { status, url });
        }

        let text = response.text().await?;
        let collection = self.parse_collection(&text)?;
        Ok(self.select_outlet(huc_id, &collection))
    }

    fn parse_collection(&self, text: &str) -> Result<FeatureCollection, FetchError> {
        serde_json::from_str(text).map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn select_outlet(&self, huc_id: &str, collection: &FeatureCollection) -> Option<String> {
        if collection.features.is_empty() {
            warn!("WFS returned no features for HUC {}", huc_id);
            return None;
        }

        let outlet = collection
            .features
            .iter()
            .find(|f| f.properties.h8_outlet == Some(OUTLET_FLAG));

        match outlet {
            Some(feature) => match segment_id_string(feature.properties.seg_id_nat.as_ref()) {
                Some(segment_id) => {
                    debug!(segment_id = %segment_id, "Resolved outlet segment");
                    Some(segment_id)
                }
                None => {
                    warn!("Outlet feature for HUC {} has no usable seg_id_nat", huc_id);
                    None
                }
            },
            None => {
                warn!(
                    "No feature flagged as outlet among {} features for HUC {}",
                    collection.features.len(),
                    huc_id
                );
                None
            }
        }
    }
}

fn segment_id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> OutletResolver {
        OutletResolver::new("https://gs.earthmaps.io/geoserver".to_string())
    }

    #[test]
    fn test_query_url_encodes_filter() {
        let url = resolver().query_url("10020007");
        assert!(url.contains("cql_filter=huc8%3D10020007"));
        assert!(url.contains("typeName=hydrology:seg_h8_outlet_stats_simplified"));
        assert!(url.contains("request=GetFeature"));
    }

    #[test]
    fn test_select_outlet_string_id() {
        let collection = resolver()
            .parse_collection(
                r#"{"features": [
                    {"properties": {"h8_outlet": 0, "seg_id_nat": "11111"}},
                    {"properties": {"h8_outlet": 1, "seg_id_nat": "12345"}}
                ]}"#,
            )
            .unwrap();
        let outlet = resolver().select_outlet("10020007", &collection);
        assert_eq!(outlet, Some("12345".to_string()));
    }

    #[test]
    fn test_select_outlet_numeric_id() {
        let collection = resolver()
            .parse_collection(r#"{"features": [{"properties": {"h8_outlet": 1, "seg_id_nat": 12345}}]}"#)
            .unwrap();
        let outlet = resolver().select_outlet("10020007", &collection);
        assert_eq!(outlet, Some("12345".to_string()));
    }

    #[test]
    fn test_select_outlet_empty_collection() {
        let collection = resolver().parse_collection(r#"{"features": []}"#).unwrap();
        assert_eq!(resolver().select_outlet("10020007", &collection), None);
    }

    #[test]
    fn test_select_outlet_no_matching_flag() {
        let collection = resolver()
            .parse_collection(r#"{"features": [{"properties": {"h8_outlet": 0, "seg_id_nat": "11111"}}]}"#)
            .unwrap();
        assert_eq!(resolver().select_outlet("10020007", &collection), None);
    }

    #[test]
    fn test_select_outlet_missing_segment_id() {
        let collection = resolver()
            .parse_collection(r#"{"features": [{"properties": {"h8_outlet": 1}}]}"#)
            .unwrap();
        assert_eq!(resolver().select_outlet("10020007", &collection), None);
    }

    #[test]
    fn test_parse_collection_malformed() {
        let result = resolver().parse_collection("<ows:ExceptionReport/>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }
}
