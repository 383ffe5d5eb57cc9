//! Generated content: one typed variant per category, each carrying its own
//! structural validation rule.

use crate::models::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Structural validation failure of generated content. These are generation
/// failures of the provider boundary and are never silently corrected.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("expected exactly {expected} {what}, got {actual}")]
    WrongItemCount {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} {index} must have {min}-{max} words, got {actual}: '{text}'")]
    WordCountOutOfRange {
        what: &'static str,
        index: usize,
        min: usize,
        max: usize,
        actual: usize,
        text: String,
    },

    #[error("{what} must be between {min} and {max}, got {actual}")]
    OutOfRange {
        what: &'static str,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("{0} must not be empty")]
    Empty(String),

    #[error("{0}")]
    Invalid(String),
}

/// One scene of a reel script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: i32,
    /// "facecam", "broll" or "overlay".
    pub kind: String,
    pub text: String,
    pub duration_seconds: f64,
    pub visual_description: String,
}

/// One day of a 30-day content calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: u32,
    pub hook: String,
    pub theme: String,
}

/// Typed content payload, tagged by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBody {
    /// Exactly 10 hooks, each 5-10 words.
    Hook { hooks: Vec<String> },
    /// 2-4 scenes, 10-20 seconds total, non-empty call to action.
    Script {
        scenes: Vec<Scene>,
        cta: String,
        total_duration: i64,
    },
    /// 3-4 non-empty shot descriptions.
    Shotlist { shots: Vec<String> },
    /// Non-empty text, 10-20 seconds estimated.
    Voiceover {
        text: String,
        estimated_duration: i64,
    },
    /// Non-empty caption plus exactly 15 hashtags.
    Caption {
        caption: String,
        hashtags: Vec<String>,
    },
    /// Exactly 10 ideas, each 3-5 words.
    Broll { ideas: Vec<String> },
    /// Days 1..=30, each with a non-empty hook and theme.
    Calendar {
        niche: String,
        days: Vec<CalendarDay>,
    },
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

fn require_non_empty(what: &str, s: &str) -> Result<(), ContentError> {
    if s.trim().is_empty() {
        return Err(ContentError::Empty(what.to_string()));
    }
    Ok(())
}

impl ContentBody {
    /// The category this payload belongs to.
    pub fn category(&self) -> Category {
        match self {
            ContentBody::Hook { .. } => Category::Hook,
            ContentBody::Script { .. } => Category::Script,
            ContentBody::Shotlist { .. } => Category::Shotlist,
            ContentBody::Voiceover { .. } => Category::Voiceover,
            ContentBody::Caption { .. } => Category::Caption,
            ContentBody::Broll { .. } => Category::Broll,
            ContentBody::Calendar { .. } => Category::Calendar,
        }
    }

    /// Validate the category-specific structural rules.
    pub fn validate(&self) -> Result<(), ContentError> {
        match self {
            ContentBody::Hook { hooks } => {
                if hooks.len() != 10 {
                    return Err(ContentError::WrongItemCount {
                        what: "hooks",
                        expected: 10,
                        actual: hooks.len(),
                    });
                }
                for (i, hook) in hooks.iter().enumerate() {
                    let words = word_count(hook);
                    if !(5..=10).contains(&words) {
                        return Err(ContentError::WordCountOutOfRange {
                            what: "hook",
                            index: i + 1,
                            min: 5,
                            max: 10,
                            actual: words,
                            text: hook.clone(),
                        });
                    }
                }
                Ok(())
            }
            ContentBody::Script {
                scenes,
                cta,
                total_duration,
            } => {
                if !(2..=4).contains(&scenes.len()) {
                    return Err(ContentError::Invalid(format!(
                        "script must have 2-4 scenes, got {}",
                        scenes.len()
                    )));
                }
                if !(10..=20).contains(total_duration) {
                    return Err(ContentError::OutOfRange {
                        what: "total duration seconds",
                        min: 10,
                        max: 20,
                        actual: *total_duration,
                    });
                }
                require_non_empty("cta", cta)
            }
            ContentBody::Shotlist { shots } => {
                if !(3..=4).contains(&shots.len()) {
                    return Err(ContentError::Invalid(format!(
                        "shotlist must have 3-4 shots, got {}",
                        shots.len()
                    )));
                }
                for (i, shot) in shots.iter().enumerate() {
                    require_non_empty(&format!("shot {}", i + 1), shot)?;
                }
                Ok(())
            }
            ContentBody::Voiceover {
                text,
                estimated_duration,
            } => {
                require_non_empty("voiceover text", text)?;
                if !(10..=20).contains(estimated_duration) {
                    return Err(ContentError::OutOfRange {
                        what: "estimated duration seconds",
                        min: 10,
                        max: 20,
                        actual: *estimated_duration,
                    });
                }
                Ok(())
            }
            ContentBody::Caption { caption, hashtags } => {
                require_non_empty("caption", caption)?;
                if hashtags.len() != 15 {
                    return Err(ContentError::WrongItemCount {
                        what: "hashtags",
                        expected: 15,
                        actual: hashtags.len(),
                    });
                }
                for (i, tag) in hashtags.iter().enumerate() {
                    if !tag.starts_with('#') || tag.len() <= 1 {
                        return Err(ContentError::Invalid(format!(
                            "hashtag {} must start with '#' and carry text: '{}'",
                            i + 1,
                            tag
                        )));
                    }
                }
                Ok(())
            }
            ContentBody::Broll { ideas } => {
                if ideas.len() != 10 {
                    return Err(ContentError::WrongItemCount {
                        what: "b-roll ideas",
                        expected: 10,
                        actual: ideas.len(),
                    });
                }
                for (i, idea) in ideas.iter().enumerate() {
                    let words = word_count(idea);
                    if !(3..=5).contains(&words) {
                        return Err(ContentError::WordCountOutOfRange {
                            what: "b-roll idea",
                            index: i + 1,
                            min: 3,
                            max: 5,
                            actual: words,
                            text: idea.clone(),
                        });
                    }
                }
                Ok(())
            }
            ContentBody::Calendar { niche, days } => {
                require_non_empty("niche", niche)?;
                if days.len() != 30 {
                    return Err(ContentError::WrongItemCount {
                        what: "calendar days",
                        expected: 30,
                        actual: days.len(),
                    });
                }
                for expected_day in 1..=30u32 {
                    let day = days
                        .iter()
                        .find(|d| d.day == expected_day)
                        .ok_or_else(|| {
                            ContentError::Invalid(format!("day {} missing from calendar", expected_day))
                        })?;
                    require_non_empty(&format!("hook for day {}", expected_day), &day.hook)?;
                    require_non_empty(&format!("theme for day {}", expected_day), &day.theme)?;
                }
                Ok(())
            }
        }
    }
}

/// Persistence status of a content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Completed,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Completed => "completed",
            ContentStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "failed" => ContentStatus::Failed,
            _ => ContentStatus::Completed,
        }
    }
}

/// Persisted content record. The body column stores the serialized
/// `ContentBody` tagged union.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentRecord {
    pub content_id: Uuid,
    pub tenant_id: Uuid,
    pub category: String,
    pub status: String,
    pub body: serde_json::Value,
    pub prompt: String,
    pub version: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl ContentRecord {
    pub fn body(&self) -> Result<ContentBody, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Input for persisting generated content.
#[derive(Debug, Clone)]
pub struct CreateContent {
    pub tenant_id: Uuid,
    pub category: Category,
    pub status: ContentStatus,
    pub body: ContentBody,
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_valid_hooks() -> Vec<String> {
        (0..10)
            .map(|i| format!("this is viral hook number {}", i))
            .collect()
    }

    #[test]
    fn hook_accepts_exactly_ten_hooks() {
        let body = ContentBody::Hook {
            hooks: ten_valid_hooks(),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn hook_rejects_wrong_count_and_word_range() {
        let body = ContentBody::Hook {
            hooks: vec!["only one hook here now".to_string()],
        };
        assert!(body.validate().is_err());

        let mut hooks = ten_valid_hooks();
        hooks[3] = "too short".to_string();
        let body = ContentBody::Hook { hooks };
        assert!(body.validate().is_err());
    }

    #[test]
    fn caption_requires_fifteen_prefixed_hashtags() {
        let good = ContentBody::Caption {
            caption: "watch this".to_string(),
            hashtags: (0..15).map(|i| format!("#tag{}", i)).collect(),
        };
        assert!(good.validate().is_ok());

        let mut tags: Vec<String> = (0..15).map(|i| format!("#tag{}", i)).collect();
        tags[0] = "notag".to_string();
        let bad = ContentBody::Caption {
            caption: "watch this".to_string(),
            hashtags: tags,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn script_bounds_scene_count_and_duration() {
        let scene = Scene {
            scene_number: 1,
            kind: "facecam".to_string(),
            text: "open strong".to_string(),
            duration_seconds: 5.0,
            visual_description: "close up".to_string(),
        };
        let good = ContentBody::Script {
            scenes: vec![scene.clone(), scene.clone()],
            cta: "follow for more".to_string(),
            total_duration: 12,
        };
        assert!(good.validate().is_ok());

        let too_long = ContentBody::Script {
            scenes: vec![scene.clone(), scene],
            cta: "follow for more".to_string(),
            total_duration: 45,
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn calendar_requires_every_day_once() {
        let days: Vec<CalendarDay> = (1..=30)
            .map(|day| CalendarDay {
                day,
                hook: format!("hook {}", day),
                theme: format!("theme {}", day),
            })
            .collect();
        let good = ContentBody::Calendar {
            niche: "fitness".to_string(),
            days: days.clone(),
        };
        assert!(good.validate().is_ok());

        let mut missing = days;
        missing.remove(14);
        missing.push(CalendarDay {
            day: 1,
            hook: "dup".to_string(),
            theme: "dup".to_string(),
        });
        let bad = ContentBody::Calendar {
            niche: "fitness".to_string(),
            days: missing,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn body_round_trips_through_tagged_json() {
        let body = ContentBody::Voiceover {
            text: "a short niche story".to_string(),
            estimated_duration: 15,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["type"], "voiceover");
        let back: ContentBody = serde_json::from_value(value).unwrap();
        assert_eq!(back.category(), Category::Voiceover);
    }
}
