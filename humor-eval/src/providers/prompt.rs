//! Prompt construction for the two answer modes

use serde::{Deserialize, Serialize};

const BASE_INSTRUCTION: &str = "You are an assistant solving a multiple-choice humor caption problem. \
Choices are A, B, C, D, E. Respond with ONLY the letter when possible.";

const REASONED_INSTRUCTION: &str = " First think step by step inside <think> </think> tags, \
then output the final choice wrapped in <answer> tags.";

/// How the model is asked to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Letter only
    Simple,
    /// `<think>` block followed by an `<answer>` block
    Reasoned,
}

impl AnswerMode {
    pub fn all() -> [AnswerMode; 2] {
        [AnswerMode::Simple, AnswerMode::Reasoned]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Simple => "simple",
            AnswerMode::Reasoned => "reasoned",
        }
    }
}

impl std::str::FromStr for AnswerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(AnswerMode::Simple),
            "reasoned" | "reasoning" => Ok(AnswerMode::Reasoned),
            _ => Err(format!("Unknown answer mode: {}", s)),
        }
    }
}

impl std::fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the user prompt for one question
pub fn build_prompt(problem: &str, mode: AnswerMode) -> String {
    match mode {
        AnswerMode::Reasoned => format!("{}{}\nQuestion: {}", BASE_INSTRUCTION, REASONED_INSTRUCTION, problem),
        AnswerMode::Simple => format!("{} Question: {}\nAnswer:", BASE_INSTRUCTION, problem),
    }
}
