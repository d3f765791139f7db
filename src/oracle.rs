//! The external language oracle.
//!
//! Everything conversational — intent labels, draft extraction, chat
//! replies — comes from a hosted generative model. The model is treated as
//! an unreliable collaborator: it can time out, reject the call, or return
//! text that is not the JSON we asked for. Callers get a `Result` and decide
//! how to degrade; nothing in here panics on bad output.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RaccoonError, Result};

pub trait LanguageOracle {
    /// One prompt in, raw model text out.
    fn infer(&self, prompt: &str) -> Result<String>;
}

/// Gemini-style `generateContent` client.
pub struct GeminiOracle {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiOracle {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<GeminiOracle> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(GeminiOracle {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl LanguageOracle for GeminiOracle {
    fn infer(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        let response = self.client.post(&url).json(&request).send()?;
        if !response.status().is_success() {
            return Err(RaccoonError::OracleUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }
        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| RaccoonError::MalformedOracleOutput(e.to_string()))?;
        let text = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| if p.is_empty() { None } else { Some(p.remove(0)) })
            .and_then(|p| p.text);
        match text {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(RaccoonError::MalformedOracleOutput(
                "empty candidate text".to_string(),
            )),
        }
    }
}

/// Models often wrap JSON answers in a ```json fence; strip it before
/// parsing.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
