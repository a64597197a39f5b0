//! The speech gateway: reference-audio synthesis and pronunciation scoring
//! over the Gemini `generateContent` REST API.

use async_trait::async_trait;
use echomaster_core::analysis::AnalysisResult;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use crate::audio;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const TTS_VOICE: &str = "Kore";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request exceeded the configured deadline. Surfaced explicitly so
    /// a slow service can never leave a session stuck in analysis.
    #[error("Speech gateway request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Speech gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Speech gateway returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Speech gateway response was missing {0}")]
    MissingPayload(&'static str),
    #[error("Malformed analysis payload: {0}")]
    MalformedAnalysis(#[from] serde_json::Error),
}

/// The two speech operations a session needs. Behind a trait so the runtime
/// can be driven in tests without the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechGateway: Send + Sync {
    /// Synthesizes the text, returning mono f32 samples at
    /// [`audio::TTS_PCM16_SAMPLE_RATE`].
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>, GatewayError>;

    /// Scores a recorded attempt (a base64 WAV payload) against the text the
    /// learner was asked to say.
    async fn analyze(
        &self,
        reference_text: &str,
        wav_base64: &str,
    ) -> Result<AnalysisResult, GatewayError>;
}

/// Wire types for the Gemini `generateContent` REST API. Only the fields this
/// application uses.
pub mod gemini_rest_types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerateContentRequest {
        pub contents: Vec<Content>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub generation_config: Option<GenerationConfig>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Content {
        pub parts: Vec<Part>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Part {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub inline_data: Option<InlineData>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InlineData {
        pub mime_type: String,
        pub data: String,
    }

    #[derive(Debug, Default, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerationConfig {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_modalities: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub speech_config: Option<SpeechConfig>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_schema: Option<serde_json::Value>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpeechConfig {
        pub voice_config: VoiceConfig,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct VoiceConfig {
        pub prebuilt_voice_config: PrebuiltVoiceConfig,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PrebuiltVoiceConfig {
        pub voice_name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct GenerateContentResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Candidate {
        pub content: Content,
    }
}

use gemini_rest_types::*;

/// The JSON schema the scoring model is constrained to, matching the shape
/// `AnalysisResult` deserializes.
fn analysis_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "overallScore": { "type": "NUMBER" },
            "summary": { "type": "STRING" },
            "feedback": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "word": { "type": "STRING" },
                        "isCorrect": { "type": "BOOLEAN" },
                        "score": { "type": "NUMBER" },
                        "tip": { "type": "STRING" }
                    },
                    "required": ["word", "isCorrect", "score"]
                }
            }
        },
        "required": ["overallScore", "summary", "feedback"]
    })
}

fn analysis_prompt(reference_text: &str) -> String {
    format!(
        "You are a strict but encouraging pronunciation coach. The learner was asked to say: \
         \"{reference_text}\". Listen to the attached recording and score how accurately it was \
         pronounced. Score each word, mark clearly mispronounced words as incorrect, and give a \
         short tip for each incorrect word."
    )
}

/// `SpeechGateway` implementation backed by the Gemini REST API.
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    tts_model: String,
    analysis_model: String,
    timeout: Duration,
}

impl GeminiGateway {
    pub fn new(api_key: String, tts_model: String, analysis_model: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            tts_model,
            analysis_model,
            timeout,
        }
    }

    /// Posts one `generateContent` request under the configured deadline.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, model, self.api_key
        );

        let work = async {
            let response = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(request)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(%status, "Speech gateway request failed: {}", body);
                return Err(GatewayError::Api { status, body });
            }

            Ok(response.json::<GenerateContentResponse>().await?)
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }
}

fn first_inline_data(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .find_map(|p| p.inline_data.map(|d| d.data))
}

fn first_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .find_map(|p| p.text)
}

#[async_trait]
impl SpeechGateway for GeminiGateway {
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(format!("Read naturally: {text}")),
                    inline_data: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: TTS_VOICE.to_string(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        debug!(model = %self.tts_model, "Requesting speech synthesis");
        let response = self.generate(&self.tts_model, &request).await?;

        let base64_pcm = first_inline_data(response)
            .ok_or(GatewayError::MissingPayload("synthesized audio"))?;
        Ok(audio::decode_f32_from_base64_i16(&base64_pcm))
    }

    async fn analyze(
        &self,
        reference_text: &str,
        wav_base64: &str,
    ) -> Result<AnalysisResult, GatewayError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(analysis_prompt(reference_text)),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "audio/wav".to_string(),
                            data: wav_base64.to_string(),
                        }),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(analysis_response_schema()),
                ..Default::default()
            }),
        };

        debug!(model = %self.analysis_model, "Requesting pronunciation analysis");
        let response = self.generate(&self.analysis_model, &request).await?;

        let payload =
            first_text(response).ok_or(GatewayError::MissingPayload("analysis payload"))?;
        Ok(serde_json::from_str(&payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize<T: serde::Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn test_tts_request_wire_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some("Read naturally: A coffee, please.".to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: TTS_VOICE.to_string(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        let json = serialize(&request);
        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "Read naturally: A coffee, please."
        );
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        // The analysis-only fields must not leak into a TTS request.
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_analysis_request_carries_wav_payload() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(analysis_prompt("A coffee, please.")),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "audio/wav".to_string(),
                            data: "AAAA".to_string(),
                        }),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(analysis_response_schema()),
                ..Default::default()
            }),
        };

        let json = serialize(&request);
        assert!(
            json["contents"][0]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("A coffee, please.")
        );
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "audio/wav"
        );
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            json["generationConfig"]["responseSchema"]["required"][0],
            "overallScore"
        );
    }

    #[test]
    fn test_parse_synthesis_response() {
        let raw = r#"{
            "candidates": [
                { "content": { "parts": [ { "inlineData": { "mimeType": "audio/pcm", "data": "AEAAgA==" } } ] } }
            ]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let data = first_inline_data(response).unwrap();
        let samples = audio::decode_f32_from_base64_i16(&data);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_parse_analysis_response_text_payload() {
        let raw = r#"{
            "candidates": [
                { "content": { "parts": [ { "text": "{\"overallScore\": 72, \"summary\": \"Close.\", \"feedback\": []}" } ] } }
            ]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let payload = first_text(response).unwrap();
        let result: AnalysisResult = serde_json::from_str(&payload).unwrap();
        assert_eq!(result.overall_score, 72.0);
    }

    #[test]
    fn test_empty_candidates_is_a_missing_payload() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert!(first_text(response).is_none());
    }

    #[test]
    fn test_timeout_error_display() {
        let err = GatewayError::Timeout(Duration::from_secs(30));
        assert_eq!(
            format!("{}", err),
            "Speech gateway request timed out after 30s"
        );
    }
}
