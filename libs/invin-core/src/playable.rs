//! Playable definitions.
//!
//! Admin input arrives as a loosely typed [`PlayableDraft`]. The only way to
//! get a [`Playable`] is [`PlayableDraft::into_playable`], which checks that
//! every field fits the declared kind and produces a [`PlayableContent`]
//! variant carrying only the fields that kind may have.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::matching::normalize_answer;
use crate::types::{AnswerMode, Difficulty, PlayableKind};

pub const MIN_HINTS: usize = 3;
pub const MAX_HINTS: usize = 5;

/// Video reference with an optional clip window, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoClip {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_seconds: Option<f64>,
}

/// One side of a this_or_that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Text, image and video questions answered by picking or typing one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoClip>,
    pub answer_mode: AnswerMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_answers: Vec<String>,
}

/// Progressive-reveal guessing game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessTheX {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub hints: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_answers: Vec<String>,
}

/// Mate-in-two puzzle. Moves are validated by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessPuzzle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub fen: String,
    pub solution: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

/// Two-way forced choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThisOrThat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub left: Choice,
    pub right: Choice,
    /// Always equal to `left.label` or `right.label`.
    pub correct_answer: String,
}

/// Question payload, keyed by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayableContent {
    Text(StandardQuestion),
    Image(StandardQuestion),
    Video(StandardQuestion),
    ImageText(StandardQuestion),
    VideoText(StandardQuestion),
    GuessTheX(GuessTheX),
    #[serde(rename = "chess_mate_in_2")]
    ChessMateIn2(ChessPuzzle),
    ThisOrThat(ThisOrThat),
}

impl PlayableContent {
    pub fn kind(&self) -> PlayableKind {
        match self {
            Self::Text(_) => PlayableKind::Text,
            Self::Image(_) => PlayableKind::Image,
            Self::Video(_) => PlayableKind::Video,
            Self::ImageText(_) => PlayableKind::ImageText,
            Self::VideoText(_) => PlayableKind::VideoText,
            Self::GuessTheX(_) => PlayableKind::GuessTheX,
            Self::ChessMateIn2(_) => PlayableKind::ChessMateIn2,
            Self::ThisOrThat(_) => PlayableKind::ThisOrThat,
        }
    }

    pub fn answer_mode(&self) -> AnswerMode {
        match self {
            Self::Text(q) | Self::Image(q) | Self::Video(q) | Self::ImageText(q) | Self::VideoText(q) => {
                q.answer_mode
            }
            Self::GuessTheX(_) | Self::ChessMateIn2(_) => AnswerMode::FreeText,
            Self::ThisOrThat(_) => AnswerMode::TapSelect,
        }
    }

    /// The answer revealed to the user once grading is conclusive.
    pub fn correct_answer(&self) -> String {
        match self {
            Self::Text(q) | Self::Image(q) | Self::Video(q) | Self::ImageText(q) | Self::VideoText(q) => {
                q.correct_answer.clone()
            }
            Self::GuessTheX(g) => g.correct_answer.clone(),
            Self::ChessMateIn2(c) => c.solution.join(" "),
            Self::ThisOrThat(t) => t.correct_answer.clone(),
        }
    }

    fn standard(kind: PlayableKind, question: StandardQuestion) -> Self {
        match kind {
            PlayableKind::Image => Self::Image(question),
            PlayableKind::Video => Self::Video(question),
            PlayableKind::ImageText => Self::ImageText(question),
            PlayableKind::VideoText => Self::VideoText(question),
            _ => Self::Text(question),
        }
    }
}

/// A validated question unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playable {
    pub id: String,
    pub category: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: PlayableContent,
}

impl Playable {
    pub fn kind(&self) -> PlayableKind {
        self.content.kind()
    }

    pub fn answer_mode(&self) -> AnswerMode {
        self.content.answer_mode()
    }

    /// Client-facing projection. Answers are withheld; chess keeps its
    /// solution because moves are checked on the device.
    pub fn view(&self) -> PlayableView {
        let mut view = PlayableView {
            id: self.id.clone(),
            kind: self.kind(),
            answer_mode: self.answer_mode(),
            category: self.category.clone(),
            title: self.title.clone(),
            difficulty: self.difficulty,
            prompt: None,
            image: None,
            video: None,
            left: None,
            right: None,
            fen: None,
            options: Vec::new(),
            hints: Vec::new(),
            solution: Vec::new(),
        };

        match &self.content {
            PlayableContent::Text(q)
            | PlayableContent::Image(q)
            | PlayableContent::Video(q)
            | PlayableContent::ImageText(q)
            | PlayableContent::VideoText(q) => {
                view.prompt = q.prompt.clone();
                view.image = q.image.clone();
                view.video = q.video.clone();
                view.options = q.options.clone();
            }
            PlayableContent::GuessTheX(g) => {
                view.prompt = g.prompt.clone();
                view.image = g.image.clone();
                view.hints = g.hints.clone();
            }
            PlayableContent::ChessMateIn2(c) => {
                view.prompt = c.prompt.clone();
                view.fen = Some(c.fen.clone());
                view.solution = c.solution.clone();
                view.hints = c.hints.clone();
            }
            PlayableContent::ThisOrThat(t) => {
                view.prompt = t.prompt.clone();
                view.left = Some(t.left.clone());
                view.right = Some(t.right.clone());
            }
        }

        view
    }
}

/// What a client sees before answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableView {
    pub id: String,
    pub kind: PlayableKind,
    pub answer_mode: AnswerMode,
    pub category: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solution: Vec<String>,
}

/// Question fields of a draft, shaped like the admin upload format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftQuestion {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "image_base64")]
    pub image: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_start: Option<f64>,
    #[serde(default)]
    pub video_end: Option<f64>,
    #[serde(default)]
    pub left_label: Option<String>,
    #[serde(default)]
    pub left_image: Option<String>,
    #[serde(default)]
    pub right_label: Option<String>,
    #[serde(default)]
    pub right_image: Option<String>,
    #[serde(default)]
    pub fen: Option<String>,
}

/// Unvalidated playable as submitted by an admin, singly or in bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableDraft {
    pub kind: PlayableKind,
    #[serde(default)]
    pub answer_mode: Option<AnswerMode>,
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub question: DraftQuestion,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub alternate_answers: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub solution: Vec<String>,
}

impl PlayableDraft {
    /// Validate the draft and turn it into a playable.
    ///
    /// Category existence is not checked here; the caller owns the store.
    pub fn into_playable(
        self,
        id: String,
        created_at: DateTime<Utc>,
    ) -> Result<Playable, ValidationError> {
        let kind = self.kind;
        let category = present(Some(self.category.clone())).ok_or(ValidationError::MissingField {
            kind,
            field: "category",
        })?;
        let title = present(Some(self.title.clone())).ok_or(ValidationError::MissingField {
            kind,
            field: "title",
        })?;
        let difficulty = self.difficulty;

        let content = match kind {
            PlayableKind::GuessTheX => PlayableContent::GuessTheX(self.build_guess()?),
            PlayableKind::ChessMateIn2 => PlayableContent::ChessMateIn2(self.build_chess()?),
            PlayableKind::ThisOrThat => PlayableContent::ThisOrThat(self.build_this_or_that()?),
            _ => PlayableContent::standard(kind, self.build_standard()?),
        };

        Ok(Playable {
            id,
            category,
            title,
            difficulty,
            created_at,
            content,
        })
    }

    fn build_standard(self) -> Result<StandardQuestion, ValidationError> {
        let kind = self.kind;
        let q = self.question;

        forbid(kind, "left_label/right_label", q.has_pair())?;
        forbid(kind, "fen", q.fen.is_some())?;
        forbid(kind, "hints", !self.hints.is_empty())?;
        forbid(kind, "solution", !self.solution.is_empty())?;

        let prompt = present(q.text);
        let image = present(q.image);
        let video_url = present(q.video_url);

        let (needs_prompt, medium) = match kind {
            PlayableKind::Image => (false, Medium::Image),
            PlayableKind::Video => (false, Medium::Video),
            PlayableKind::ImageText => (true, Medium::Image),
            PlayableKind::VideoText => (true, Medium::Video),
            _ => (true, Medium::None),
        };

        if needs_prompt && prompt.is_none() {
            return Err(ValidationError::MissingField { kind, field: "question.text" });
        }
        match medium {
            Medium::Image => {
                require(kind, "question.image", image.is_some())?;
                forbid(kind, "question.video_url", video_url.is_some())?;
            }
            Medium::Video => {
                require(kind, "question.video_url", video_url.is_some())?;
                forbid(kind, "question.image", image.is_some())?;
            }
            Medium::None => {
                forbid(kind, "question.image", image.is_some())?;
                forbid(kind, "question.video_url", video_url.is_some())?;
            }
        }

        let video = match video_url {
            Some(url) => Some(build_clip(url, q.video_start, q.video_end)?),
            None => {
                forbid(kind, "question.video_start", q.video_start.is_some())?;
                forbid(kind, "question.video_end", q.video_end.is_some())?;
                None
            }
        };

        let options = clean_list(self.options);
        let answer_mode = self.answer_mode.unwrap_or(if options.is_empty() {
            AnswerMode::FreeText
        } else {
            AnswerMode::MultipleChoice
        });
        let correct = present(self.correct_answer).ok_or(ValidationError::MissingField {
            kind,
            field: "correct_answer",
        })?;
        let alternate_answers = clean_list(self.alternate_answers);

        let correct_answer = match answer_mode {
            AnswerMode::MultipleChoice => {
                forbid(kind, "alternate_answers", !alternate_answers.is_empty())?;
                check_options(&options)?;
                let wanted = normalize_answer(&correct);
                options
                    .iter()
                    .find(|option| normalize_answer(option) == wanted)
                    .cloned()
                    .ok_or(ValidationError::AnswerNotInOptions(correct))?
            }
            AnswerMode::FreeText => {
                forbid(kind, "options", !options.is_empty())?;
                correct
            }
            AnswerMode::TapSelect => {
                return Err(ValidationError::UnsupportedAnswerMode { kind, mode: answer_mode });
            }
        };

        Ok(StandardQuestion {
            prompt,
            image,
            video,
            answer_mode,
            options,
            correct_answer,
            alternate_answers,
        })
    }

    fn build_guess(self) -> Result<GuessTheX, ValidationError> {
        let kind = self.kind;
        let q = self.question;

        only_mode(kind, self.answer_mode, AnswerMode::FreeText)?;
        forbid(kind, "options", !self.options.is_empty())?;
        forbid(kind, "solution", !self.solution.is_empty())?;
        forbid(kind, "fen", q.fen.is_some())?;
        forbid(kind, "question.video_url", q.video_url.is_some())?;
        forbid(kind, "left_label/right_label", q.has_pair())?;

        let hints = clean_list(self.hints);
        if !(MIN_HINTS..=MAX_HINTS).contains(&hints.len()) {
            return Err(ValidationError::HintCount { count: hints.len() });
        }

        let correct_answer = present(self.correct_answer).ok_or(ValidationError::MissingField {
            kind,
            field: "correct_answer",
        })?;

        Ok(GuessTheX {
            prompt: present(q.text),
            image: present(q.image),
            hints,
            correct_answer,
            alternate_answers: clean_list(self.alternate_answers),
        })
    }

    fn build_chess(self) -> Result<ChessPuzzle, ValidationError> {
        let kind = self.kind;
        let q = self.question;

        only_mode(kind, self.answer_mode, AnswerMode::FreeText)?;
        forbid(kind, "options", !self.options.is_empty())?;
        forbid(kind, "alternate_answers", !self.alternate_answers.is_empty())?;
        forbid(kind, "question.image", q.image.is_some())?;
        forbid(kind, "question.video_url", q.video_url.is_some())?;
        forbid(kind, "left_label/right_label", q.has_pair())?;

        let fen = present(q.fen).ok_or(ValidationError::MissingField {
            kind,
            field: "question.fen",
        })?;
        validate_fen(&fen)?;

        let solution = clean_list(self.solution);
        if solution.is_empty() {
            return Err(ValidationError::MissingField { kind, field: "solution" });
        }
        if let Some(bad) = solution.iter().find(|m| !is_plausible_move(m)) {
            return Err(ValidationError::InvalidMove(bad.clone()));
        }

        Ok(ChessPuzzle {
            prompt: present(q.text),
            fen,
            solution,
            hints: clean_list(self.hints),
        })
    }

    fn build_this_or_that(self) -> Result<ThisOrThat, ValidationError> {
        let kind = self.kind;
        let q = self.question;

        only_mode(kind, self.answer_mode, AnswerMode::TapSelect)?;
        forbid(kind, "options", !self.options.is_empty())?;
        forbid(kind, "alternate_answers", !self.alternate_answers.is_empty())?;
        forbid(kind, "hints", !self.hints.is_empty())?;
        forbid(kind, "solution", !self.solution.is_empty())?;
        forbid(kind, "fen", q.fen.is_some())?;
        forbid(kind, "question.image", q.image.is_some())?;
        forbid(kind, "question.video_url", q.video_url.is_some())?;

        let left_label = present(q.left_label).ok_or(ValidationError::MissingField {
            kind,
            field: "question.left_label",
        })?;
        let right_label = present(q.right_label).ok_or(ValidationError::MissingField {
            kind,
            field: "question.right_label",
        })?;
        if normalize_answer(&left_label) == normalize_answer(&right_label) {
            return Err(ValidationError::DuplicateLabel(left_label));
        }

        let correct = present(self.correct_answer).ok_or(ValidationError::MissingField {
            kind,
            field: "correct_answer",
        })?;
        let wanted = normalize_answer(&correct);
        let correct_answer = if normalize_answer(&left_label) == wanted {
            left_label.clone()
        } else if normalize_answer(&right_label) == wanted {
            right_label.clone()
        } else {
            return Err(ValidationError::AnswerNotALabel(correct));
        };

        Ok(ThisOrThat {
            prompt: present(q.text),
            left: Choice {
                label: left_label,
                image: present(q.left_image),
            },
            right: Choice {
                label: right_label,
                image: present(q.right_image),
            },
            correct_answer,
        })
    }
}

impl DraftQuestion {
    fn has_pair(&self) -> bool {
        self.left_label.is_some()
            || self.left_image.is_some()
            || self.right_label.is_some()
            || self.right_image.is_some()
    }
}

enum Medium {
    None,
    Image,
    Video,
}

/// Trimmed value, or `None` when blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed entries with blanks dropped, order kept.
fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| present(Some(v)))
        .collect()
}

fn forbid(kind: PlayableKind, field: &'static str, set: bool) -> Result<(), ValidationError> {
    if set {
        Err(ValidationError::UnexpectedField { kind, field })
    } else {
        Ok(())
    }
}

fn require(kind: PlayableKind, field: &'static str, set: bool) -> Result<(), ValidationError> {
    if set {
        Ok(())
    } else {
        Err(ValidationError::MissingField { kind, field })
    }
}

fn only_mode(
    kind: PlayableKind,
    given: Option<AnswerMode>,
    allowed: AnswerMode,
) -> Result<(), ValidationError> {
    match given {
        Some(mode) if mode != allowed => Err(ValidationError::UnsupportedAnswerMode { kind, mode }),
        _ => Ok(()),
    }
}

fn check_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(ValidationError::TooFewOptions { count: options.len() });
    }
    let mut seen = HashSet::new();
    for option in options {
        if !seen.insert(normalize_answer(option)) {
            return Err(ValidationError::DuplicateOption(option.clone()));
        }
    }
    Ok(())
}

fn build_clip(
    url: String,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<VideoClip, ValidationError> {
    for bound in [start, end].into_iter().flatten() {
        if !bound.is_finite() || bound < 0.0 {
            return Err(ValidationError::InvalidClip(format!("bad offset {bound}")));
        }
    }
    if let (Some(s), Some(e)) = (start, end) {
        if e <= s {
            return Err(ValidationError::InvalidClip(format!("end {e} is not after start {s}")));
        }
    }
    Ok(VideoClip {
        url,
        start_seconds: start,
        end_seconds: end,
    })
}

/// Structural check of the piece-placement and side-to-move fields.
fn validate_fen(fen: &str) -> Result<(), ValidationError> {
    let mut fields = fen.split_whitespace();
    let placement = fields.next().unwrap_or_default();

    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(ValidationError::InvalidFen(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }
    for rank in ranks {
        let mut squares = 0u32;
        for c in rank.chars() {
            match c {
                '1'..='8' => squares += c.to_digit(10).unwrap_or(0),
                'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => squares += 1,
                _ => return Err(ValidationError::InvalidFen(format!("unexpected `{c}`"))),
            }
        }
        if squares != 8 {
            return Err(ValidationError::InvalidFen(format!("rank `{rank}` has {squares} squares")));
        }
    }

    match fields.next() {
        None | Some("w") | Some("b") => Ok(()),
        Some(other) => Err(ValidationError::InvalidFen(format!("side to move `{other}`"))),
    }
}

/// Loose SAN shape check: `e4`, `Nxf7+`, `exd8=Q#`, `O-O`.
fn is_plausible_move(mv: &str) -> bool {
    const ALLOWED: &str = "abcdefgh12345678NBRQKxO-=+#";
    (2..=8).contains(&mv.len()) && mv.chars().all(|c| ALLOWED.contains(c))
}
