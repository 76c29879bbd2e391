//! Offline answers for when no completion credential is configured.
//!
//! With demo mode on, one canned question gets a full answer (table plus a
//! chart built by the real chart heuristic) so the UI can be tried without
//! an API key. Every other question gets the configuration message.

use serde_json::json;

use crate::chart;
use crate::types::{Answer, JsonObject};

pub const CONFIG_GUIDANCE: &str = "The OpenAI API key is not configured. Please update the OPENAI_API_KEY in the .env file with a valid API key.";

pub const DEMO_HINT: &str = "However, I can show you a demo with sample data - try asking: 'Show me average TOTAL_JOBS_SENT_TO_INDEX by client'";

const DEMO_NARRATION: &str = "Here are the average TOTAL_JOBS_SENT_TO_INDEX values by client:

| Client | Average Jobs Sent To Index |
|--------|---------------------------|
| Deal68 | 124,029.16 |
| Deal35 | 0.36 |
| Deal19 | 0.00 |
| Deal62 | 9,450.51 |
| Deal5 | 2,125.36 |
| Deal41 | 15,906.29 |
| Deal26 | 1,474.59 |
| Deal64 | 44,046.73 |
| Deal74 | 358,505.71 |
| Deal44 | 831.01 |

The data shows significant variation across clients, with Deal74 having the highest average (358,505.71) and Deal19 having no jobs sent to index.";

fn demo_rows() -> Vec<JsonObject> {
    [
        ("Deal68", 124029.16),
        ("Deal35", 0.36),
        ("Deal19", 0.0),
        ("Deal62", 9450.51),
        ("Deal5", 2125.36),
        ("Deal41", 15906.29),
        ("Deal26", 1474.59),
        ("Deal64", 44046.73),
        ("Deal74", 358505.71),
        ("Deal44", 831.01),
    ]
    .into_iter()
    .map(|(id, avg)| {
        let mut row = JsonObject::new();
        row.insert("_id".into(), json!(id));
        row.insert("averageJobsSentToIndex".into(), json!(avg));
        row
    })
    .collect()
}

/// Answer given instead of running the pipeline when the credential is unusable.
pub fn unconfigured_answer(question: &str, demo_mode: bool) -> Answer {
    if !demo_mode {
        return Answer::text(CONFIG_GUIDANCE);
    }

    let lower = question.to_lowercase();
    if lower.contains("average") && lower.contains("total_jobs_sent_to_index") {
        return Answer {
            response: DEMO_NARRATION.to_string(),
            chart_data: chart::build_chart(&lower, &demo_rows()),
        };
    }

    Answer::text(format!("{CONFIG_GUIDANCE} {DEMO_HINT}"))
}
