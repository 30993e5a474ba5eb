//! Response interpretation: reasoning capture and final-answer extraction
//!
//! Models answer in several inconsistent conventions: a bare letter,
//! `<think>`/`<answer>` tags, `<reasoning>`/`<conclusion>` tags, boxed tokens
//! (`<|begin_of_box|>C<|end_of_box|>`) or plain prose. Everything here is a
//! pure function over the raw text and every input maps to a defined answer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ANSWER_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<answer>(.*?)</answer>").unwrap());

static CONCLUSION_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<conclusion>(.*?)</conclusion>").unwrap());

static THINK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think>(.*?)</think>").unwrap());

static REASONING_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<reasoning>(.*?)</reasoning>").unwrap());

static BOX_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\|begin_of_box\|>([A-E])<\|end_of_box\|>").unwrap());

/// Standalone choice letter; case-sensitive so prose like "a" is ignored.
static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-E])\b").unwrap());

/// One of the five answer choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
}

impl Choice {
    pub fn all() -> [Choice; 5] {
        [Choice::A, Choice::B, Choice::C, Choice::D, Choice::E]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
            Choice::E => "E",
        }
    }
}

/// Exact, case-sensitive parse of a single letter
impl std::str::FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            "E" => Ok(Choice::E),
            _ => Err(format!("Invalid choice: {}", s)),
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The letter extracted from a response, or `Unknown` when none could be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractedAnswer {
    A,
    B,
    C,
    D,
    E,
    Unknown,
}

impl ExtractedAnswer {
    pub fn choice(&self) -> Option<Choice> {
        match self {
            ExtractedAnswer::A => Some(Choice::A),
            ExtractedAnswer::B => Some(Choice::B),
            ExtractedAnswer::C => Some(Choice::C),
            ExtractedAnswer::D => Some(Choice::D),
            ExtractedAnswer::E => Some(Choice::E),
            ExtractedAnswer::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ExtractedAnswer::Unknown)
    }

    /// `Unknown` never matches the ground truth
    pub fn matches(&self, truth: Choice) -> bool {
        self.choice() == Some(truth)
    }

    pub fn as_str(&self) -> &'static str {
        match self.choice() {
            Some(c) => c.as_str(),
            None => "Unknown",
        }
    }
}

impl From<Choice> for ExtractedAnswer {
    fn from(choice: Choice) -> Self {
        match choice {
            Choice::A => ExtractedAnswer::A,
            Choice::B => ExtractedAnswer::B,
            Choice::C => ExtractedAnswer::C,
            Choice::D => ExtractedAnswer::D,
            Choice::E => ExtractedAnswer::E,
        }
    }
}

impl From<Option<Choice>> for ExtractedAnswer {
    fn from(choice: Option<Choice>) -> Self {
        choice.map(Into::into).unwrap_or(ExtractedAnswer::Unknown)
    }
}

impl std::fmt::Display for ExtractedAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view over a raw response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedResponse<'a> {
    /// Inner text of the first think/reasoning block, trimmed; empty if absent
    pub reasoning: &'a str,
    /// Raw answer span, tags included when it came from a tagged block
    pub answer_segment: &'a str,
}

/// Split a response into its reasoning and raw answer segment.
///
/// Reasoning prefers `<think>` over `<reasoning>`. The answer segment is the
/// first `<answer>` block, else the first `<conclusion>` block (both with
/// their tags), else the trimmed response if it is a single letter, else the
/// whole response untouched.
pub fn split_reasoning_and_answer_segment(response: &str) -> ParsedResponse<'_> {
    let reasoning = THINK_TAG_RE
        .captures(response)
        .or_else(|| REASONING_TAG_RE.captures(response))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or("");

    let tagged = [&*ANSWER_TAG_RE, &*CONCLUSION_TAG_RE]
        .into_iter()
        .find_map(|re| re.find(response))
        .map(|m| m.as_str());

    let answer_segment = tagged.unwrap_or_else(|| {
        let trimmed = response.trim();
        if trimmed.parse::<Choice>().is_ok() {
            trimmed
        } else {
            response
        }
    });

    ParsedResponse {
        reasoning,
        answer_segment,
    }
}

type Matcher = fn(&str) -> Option<Choice>;

/// Tried in order; the first strategy that yields a letter decides.
const MATCHERS: [Matcher; 3] = [from_answer_block, from_conclusion_block, from_free_text];

/// Extract the final choice from a response.
///
/// Total: malformed or empty input yields [`ExtractedAnswer::Unknown`].
pub fn extract_answer(response: &str) -> ExtractedAnswer {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(response))
        .into()
}

fn from_answer_block(response: &str) -> Option<Choice> {
    first_letter_in_block(&ANSWER_TAG_RE, response)
}

fn from_conclusion_block(response: &str) -> Option<Choice> {
    first_letter_in_block(&CONCLUSION_TAG_RE, response)
}

fn first_letter_in_block(block: &Regex, response: &str) -> Option<Choice> {
    let inner = block.captures(response)?.get(1)?.as_str();
    LETTER_RE
        .captures(inner)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Last standalone letter anywhere; the last boxed letter only when no
/// standalone letter exists, even if the box comes later in the text.
fn from_free_text(response: &str) -> Option<Choice> {
    let boxed = last_capture(&BOX_LETTER_RE, response);
    last_capture(&LETTER_RE, response).or(boxed)
}

fn last_capture(re: &Regex, text: &str) -> Option<Choice> {
    re.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Owned result of running both operations over one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    pub reasoning: String,
    pub answer_segment: String,
    pub answer: ExtractedAnswer,
}

pub fn interpret(response: &str) -> Interpretation {
    let parsed = split_reasoning_and_answer_segment(response);
    Interpretation {
        reasoning: parsed.reasoning.to_string(),
        answer_segment: parsed.answer_segment.to_string(),
        answer: extract_answer(response),
    }
}
