//! Export renderer.
//!
//! Renders a stored content body into a downloadable plain-text document.

use super::{DocumentRenderer, ProviderError, RenderedDocument};
use crate::models::ContentBody;
use std::fmt::Write;

/// Plain-text renderer for content exports.
#[derive(Default)]
pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn render_text(title: &str, body: &ContentBody) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
    let _ = writeln!(out);

    match body {
        ContentBody::Hook { hooks } => {
            for (i, hook) in hooks.iter().enumerate() {
                let _ = writeln!(out, "{:2}. {}", i + 1, hook);
            }
        }
        ContentBody::Script {
            scenes,
            cta,
            total_duration,
        } => {
            for scene in scenes {
                let _ = writeln!(
                    out,
                    "Scene {} [{}] ({}s): {}",
                    scene.scene_number, scene.kind, scene.duration_seconds, scene.text
                );
                let _ = writeln!(out, "    Visual: {}", scene.visual_description);
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "CTA: {}", cta);
            let _ = writeln!(out, "Total duration: {}s", total_duration);
        }
        ContentBody::Shotlist { shots } => {
            for (i, shot) in shots.iter().enumerate() {
                let _ = writeln!(out, "Shot {}: {}", i + 1, shot);
            }
        }
        ContentBody::Voiceover {
            text,
            estimated_duration,
        } => {
            let _ = writeln!(out, "{}", text);
            let _ = writeln!(out);
            let _ = writeln!(out, "Estimated duration: {}s", estimated_duration);
        }
        ContentBody::Caption { caption, hashtags } => {
            let _ = writeln!(out, "{}", caption);
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", hashtags.join(" "));
        }
        ContentBody::Broll { ideas } => {
            for (i, idea) in ideas.iter().enumerate() {
                let _ = writeln!(out, "{:2}. {}", i + 1, idea);
            }
        }
        ContentBody::Calendar { niche, days } => {
            let _ = writeln!(out, "Niche: {}", niche);
            let _ = writeln!(out);
            for day in days {
                let _ = writeln!(out, "Day {:2}: {} ({})", day.day, day.hook, day.theme);
            }
        }
    }

    out
}

impl DocumentRenderer for TextRenderer {
    fn render(&self, title: &str, body: &ContentBody) -> Result<RenderedDocument, ProviderError> {
        let text = render_text(title, body);
        Ok(RenderedDocument {
            filename: format!("{}.txt", body.category().as_str()),
            mime_type: "text/plain; charset=utf-8".to_string(),
            bytes: text.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_caption_with_hashtags() {
        let body = ContentBody::Caption {
            caption: "watch this".to_string(),
            hashtags: vec!["#a".to_string(), "#b".to_string()],
        };
        let doc = TextRenderer::new().render("My caption", &body).unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();
        assert!(text.contains("watch this"));
        assert!(text.contains("#a #b"));
        assert_eq!(doc.filename, "caption.txt");
    }
}
