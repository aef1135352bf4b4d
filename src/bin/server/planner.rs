//! Plan synthesis: natural language in, plan document out.
//!
//! Calls an OpenAI-compatible chat completions endpoint and constrains the
//! model to emit a single JSON object in the plan schema. The reply is
//! validated as a plan before it is returned; an unusable reply is an error,
//! never a substitute plan.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use planwright::Plan;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-5-nano";

const SYSTEM_PROMPT: &str = r##"You are an assistant that returns a single valid JSON object describing a browser automation plan. The JSON must contain a top-level key `steps` which is a list of step objects executed in order.

Each step has an `action` key, one of:
- {"action":"navigate","url":"https://..."}
- {"action":"click","selector":"#css-selector","times":1,"delay":0.5}
- {"action":"input","selector":"#css-selector","value":"text to type"}
- {"action":"wait","seconds":1}
- {"action":"screenshot","path":"out.png"}
- {"action":"extract","selector":"h1","name":"variable_name"}

Rules:
1. Respond with only the JSON object and nothing else. No markdown, no explanation.
2. `selector` is required for click, input, and extract.
3. Keep plans minimal; do not add steps the task does not need."##;

/// Generate a plan document for `prompt`. The returned value is the raw
/// document (already validated to decode as a plan), so the caller can hand
/// it straight back to `/run`.
pub async fn generate_plan(client: &Client, prompt: &str) -> Result<Value> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow!("OPENAI_API_KEY not set"))?;

    let response = client
        .post(API_URL)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.2,
        }))
        .send()
        .await
        .context("chat completions request failed")?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .context("chat completions reply was not JSON")?;

    if !status.is_success() {
        let message = body["error"]["message"].as_str().unwrap_or("unknown API error");
        return Err(anyhow!("chat completions error ({status}): {message}"));
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("no content in model reply"))?;

    let document = extract_json(content)
        .ok_or_else(|| anyhow!("model reply did not contain a JSON object: {content}"))?;

    // Reject replies that don't decode as a plan so the caller can never
    // mistake free-form model output for something runnable.
    Plan::from_value(document.clone()).context("model reply did not validate as a plan")?;
    Ok(document)
}

/// Pull a JSON object out of free-form model text: strip markdown fences,
/// then fall back to the outermost brace pair.
fn extract_json(text: &str) -> Option<Value> {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(value) = serde_json::from_str(cleaned) {
        return Some(value);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::extract_json;

    #[test]
    fn parses_bare_json() {
        let value = extract_json(r#"{"steps": []}"#).unwrap();
        assert!(value["steps"].as_array().unwrap().is_empty());
    }

    #[test]
    fn strips_markdown_fences() {
        let value = extract_json("```json\n{\"steps\": []}\n```").unwrap();
        assert!(value.get("steps").is_some());
    }

    #[test]
    fn finds_object_inside_prose() {
        let value =
            extract_json("Here is your plan: {\"steps\": []} - enjoy!").unwrap();
        assert!(value.get("steps").is_some());
    }

    #[test]
    fn rejects_text_without_json() {
        assert!(extract_json("sorry, I cannot help with that").is_none());
    }
}
