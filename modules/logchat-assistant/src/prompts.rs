//! Instruction text sent to the completion model.
//!
//! The system prompt describes one logs document so the model knows field
//! names and nesting. It is shared by synthesis, narration and clarification.

use crate::types::Question;

const EXAMPLE_DOCUMENT: &str = r#"{
  "_id": "ObjectId",
  "country_code": "US",
  "currency_code": "USD",
  "progress": {
    "SWITCH_INDEX": true,
    "TOTAL_RECORDS_IN_FEED": 16493,
    "TOTAL_JOBS_FAIL_INDEXED": 1521,
    "TOTAL_JOBS_IN_FEED": 13705,
    "TOTAL_JOBS_SENT_TO_ENRICH": 20,
    "TOTAL_JOBS_DONT_HAVE_METADATA": 2540,
    "TOTAL_JOBS_DONT_HAVE_METADATA_V2": 2568,
    "TOTAL_JOBS_SENT_TO_INDEX": 13686
  },
  "status": "completed",
  "timestamp": "2025-07-11T05:16:20.626Z",
  "transactionSourceName": "Deal4",
  "noCoordinatesCount": 160,
  "recordCount": 11118,
  "uniqueRefNumberCount": 9253
}"#;

pub fn system_prompt(collection: &str) -> String {
    format!(
        r#"You are an AI assistant for a MongoDB logs dashboard. You help users analyze log data by converting natural language questions into MongoDB queries.

The MongoDB collection is called "{collection}", and documents follow this structure:
{EXAMPLE_DOCUMENT}

You can:
1. Perform filters, aggregations, and calculations
2. Use $match, $group, $project, etc.
3. Include ISO 8601 format dates
4. Always wrap aggregation pipelines inside an object with "aggregate": "{collection}", and "pipeline": [ ... ]

Only return a single valid JSON string that can be parsed as strict JSON. No extra text, no Markdown, no code blocks."#
    )
}

pub fn synthesis_instruction(question: &Question, collection: &str) -> String {
    format!(
        r#"Generate a MongoDB query to answer this question: "{question}".
Return ONLY the query as a single valid JSON object that can be parsed as strict JSON.
If the query requires aggregation, structure it like this:

{{
  "aggregate": "{collection}",
  "pipeline": [
    {{ ... }},
    {{ ... }}
  ]
}}

Do not include code blocks or explanations. Use ISO 8601 strings for dates.
Ensure the JSON uses double quotes for all keys and values."#
    )
}

pub fn narration_instruction(question: &Question, results_json: &str) -> String {
    format!(
        "Question: {question}\n\nResults from MongoDB: {results_json}\n\n\
         Please format these results into a helpful response. \
         Use markdown tables for tabular data and provide a clear summary."
    )
}

pub fn clarification_prompt(collection: &str) -> String {
    format!(
        "{}\n\nYou are evaluating if a question can be answered with the available data. \
         If it's ambiguous, explain why and ask for clarification. \
         If it's unsupported, explain why and suggest alternative questions.",
        system_prompt(collection)
    )
}
