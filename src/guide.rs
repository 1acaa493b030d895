//! Client for the generative-language API used as an on-trip travel guide.
//!
//! Every public call degrades to a fixed fallback on failure, so callers never
//! see an error.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::weather::WeatherIcon;

const SYSTEM_INSTRUCTION: &str = "You are an assistant built for a 2026 trip to Japan. \
You know Tokyo, Yokohama and Karuizawa well. \
Keep answers short and practical, with transport tips, food recommendations or weather reminders. \
When asked about a specific place, include a navigation link where you can.";

const FALLBACK_ANSWER: &str =
    "Sorry, the travel guide is unavailable right now. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("guide request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideAnswer {
    pub text: String,
    pub links: Vec<GroundingLink>,
}

impl GuideAnswer {
    fn fallback() -> Self {
        Self {
            text: FALLBACK_ANSWER.to_string(),
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub temp: String,
    pub condition: String,
    pub suggestion: String,
    #[serde(default)]
    pub icon: WeatherIcon,
}

impl Forecast {
    /// Used when the model answered without any JSON object.
    pub fn pending() -> Self {
        Self {
            temp: "--/--".to_string(),
            condition: "Checking".to_string(),
            suggestion: "Follow live weather broadcasts.".to_string(),
            icon: WeatherIcon::Cloud,
        }
    }

    /// Used when the request failed or its JSON object could not be read.
    pub fn cold() -> Self {
        Self {
            temp: "2°/8°".to_string(),
            condition: "Cold".to_string(),
            suggestion: "Wear a heavy down jacket.".to_string(),
            icon: WeatherIcon::Cloud,
        }
    }

    /// Parses the first `{ ... }` span of a free-text answer.
    pub fn from_text(text: &str) -> Self {
        let Some(block) = extract_json_block(text) else {
            debug!("forecast answer has no JSON object");
            return Self::pending();
        };

        serde_json::from_str(block).unwrap_or_else(|err| {
            warn!(error = %err, "forecast answer is not a forecast object");
            Self::cold()
        })
    }
}

/// Everything from the first `{` to the last `}` inclusive.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn forecast_prompt(date: NaiveDate, location: &str) -> String {
    format!(
        "Search for the weather in {location} on {date}. \
If the date is in the future, predict it from the latest long-range forecasts or historical patterns. \
Reply with only this JSON object, no markdown:\n\
{{\n  \"temp\": \"temperature range, e.g. -2°/5°\",\n  \"condition\": \"conditions, e.g. heavy snow, sunny\",\n  \
\"suggestion\": \"clothing and rain gear advice\",\n  \"icon\": \"one of sun, cloud, snow, rain\"\n}}"
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    title: Option<String>,
    uri: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn links(&self) -> Vec<GroundingLink> {
        let Some(metadata) = self
            .candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
        else {
            return Vec::new();
        };

        metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let uri = web.uri.as_deref().filter(|uri| !uri.is_empty())?;
                Some(GroundingLink {
                    title: web
                        .title
                        .clone()
                        .unwrap_or_else(|| "Reference".to_string()),
                    uri: uri.to_string(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct GuideClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GuideClient {
    pub fn new(settings: &crate::settings::Guide) -> Result<Self, GuideError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key(),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub async fn ask(&self, query: &str) -> GuideAnswer {
        match self.generate(query, Some(SYSTEM_INSTRUCTION)).await {
            Ok(response) => GuideAnswer {
                text: response.text(),
                links: response.links(),
            },
            Err(err) => {
                error!(error = %err, "travel guide request failed");
                GuideAnswer::fallback()
            }
        }
    }

    pub async fn forecast(&self, date: NaiveDate, location: &str) -> Forecast {
        match self.generate(&forecast_prompt(date, location), None).await {
            Ok(response) => Forecast::from_text(&response.text()),
            Err(err) => {
                error!(error = %err, %date, location, "forecast request failed");
                Forecast::cold()
            }
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<GenerateResponse, GuideError> {
        let api_key = self.api_key.as_deref().ok_or(GuideError::MissingApiKey)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        debug!(model = %self.model, "sending guide request");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(serde_json::from_value(response).unwrap_or_else(|err| {
            warn!(error = %err, "unexpected guide response shape");
            GenerateResponse::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn offline_client() -> GuideClient {
        GuideClient::new(&crate::settings::Guide::default())
            .unwrap()
            .with_api_key(None)
    }

    #[test]
    fn extracts_first_to_last_brace() {
        let text = "Here you go:\n{\"temp\": \"-2°/5°\"}\nStay warm!";
        assert_eq!(extract_json_block(text), Some("{\"temp\": \"-2°/5°\"}"));
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("} backwards {"), None);
    }

    #[test]
    fn forecast_parses_embedded_object() {
        let text = r#"Sure! {"temp":"-5°/2°","condition":"Heavy snow","suggestion":"Snow boots","icon":"snow"} Enjoy."#;
        assert_eq!(
            Forecast::from_text(text),
            Forecast {
                temp: "-5°/2°".to_string(),
                condition: "Heavy snow".to_string(),
                suggestion: "Snow boots".to_string(),
                icon: WeatherIcon::Snow,
            }
        );
    }

    #[test]
    fn forecast_without_icon_defaults_to_cloud() {
        let text = r#"{"temp":"1°/6°","condition":"Overcast","suggestion":"Layers"}"#;
        assert_eq!(Forecast::from_text(text).icon, WeatherIcon::Cloud);
    }

    #[test]
    fn answer_without_object_is_pending() {
        assert_eq!(Forecast::from_text("It will be cold."), Forecast::pending());
        assert_eq!(Forecast::from_text("} nothing here {"), Forecast::pending());
    }

    #[test]
    fn unreadable_object_falls_back_to_cold() {
        assert_eq!(Forecast::from_text("{temp: cold}"), Forecast::cold());
        assert_eq!(Forecast::from_text(r#"{"temp": 3}"#), Forecast::cold());
        assert_eq!(
            Forecast::from_text(r#"{"temp":"1°/4°","condition":"Fog","suggestion":"Scarf","icon":"fog"}"#),
            Forecast::cold()
        );
    }

    #[test]
    fn response_text_and_links_are_extracted() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Take the " }, { "text": "Keikyu line." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "Keikyu", "uri": "https://www.keikyu.co.jp" } },
                        { "web": { "uri": "https://example.com/untitled" } },
                        { "web": { "title": "No link" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response.text(), "Take the Keikyu line.");
        assert_eq!(
            response.links(),
            vec![
                GroundingLink {
                    title: "Keikyu".to_string(),
                    uri: "https://www.keikyu.co.jp".to_string(),
                },
                GroundingLink {
                    title: "Reference".to_string(),
                    uri: "https://example.com/untitled".to_string(),
                },
            ]
        );
    }

    #[test]
    fn empty_response_has_no_text_or_links() {
        let response = GenerateResponse::default();
        assert_eq!(response.text(), "");
        assert!(response.links().is_empty());
    }

    #[test]
    fn prompt_names_date_and_place() {
        let prompt = forecast_prompt(NaiveDate::from_ymd_opt(2026, 1, 29).unwrap(), "Karuizawa");
        assert!(prompt.contains("Karuizawa on 2026-01-29"));
        assert!(prompt.contains("\"icon\""));
    }

    #[tokio::test]
    async fn ask_without_api_key_falls_back() {
        let answer = offline_client().ask("Where is the Anpanman museum?").await;
        assert_eq!(answer, GuideAnswer::fallback());
    }

    #[tokio::test]
    async fn forecast_without_api_key_falls_back_to_cold() {
        let forecast = offline_client()
            .forecast(NaiveDate::from_ymd_opt(2026, 1, 28).unwrap(), "Karuizawa")
            .await;
        assert_eq!(forecast, Forecast::cold());
    }
}
