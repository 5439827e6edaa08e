//! Prompts sent to the analysis collaborator.

use crate::analysis::AnalysisRequest;

/// System prompt: the collaborator acts as the lab's safety officer
pub const SAFETY_OFFICER_PROMPT: &str = "You are a world-class AI chemical safety officer \
monitoring a virtual school laboratory.
When reagents are mixed you must:
1. Identify the chemical reaction, if any.
2. Assign a risk score from 0 to 100.
3. List safety warnings if the mixture is dangerous.
4. Explain the science behind the reaction.
5. Predict the colour of the mixture afterwards as a Tailwind CSS background class (for example 'bg-red-500').
Always respond with JSON only.";

/// Schema description appended to every prompt
pub const ANALYSIS_SCHEMA: &str = r#"{
  "reaction": "string - short description of the observed reaction",
  "riskScore": "number - risk score 0-100",
  "warnings": ["string - safety warning"],
  "explanation": "string - explanation of the underlying chemistry",
  "newColor": "string (optional) - Tailwind background class of the mixture"
}
Required: reaction, riskScore, warnings, explanation"#;

/// User prompt for one analysis request
pub fn analysis_prompt(request: &AnalysisRequest) -> String {
    format!(
        "The following chemicals are mixed in a flask at {} °C: {}. \
         Analyse the safety of the mixture and describe the reaction.",
        request.temperature,
        request.reagent_list()
    )
}
