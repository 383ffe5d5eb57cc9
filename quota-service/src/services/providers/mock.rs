//! Mock provider implementations for local development and testing.

use super::{ContentGenerator, ContentRequest, ProviderError};
use crate::models::{CalendarDay, Category, ContentBody, Scene};
use async_trait::async_trait;

/// Mock content generator. Produces structurally valid bodies for every
/// category; disabled instances fail every call, which exercises the
/// no-quota-on-failure path.
pub struct MockContentGenerator {
    enabled: bool,
}

impl MockContentGenerator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn body_for(&self, request: &ContentRequest) -> Result<ContentBody, ProviderError> {
        let topic = request.topic.as_str();
        let body = match request.category {
            Category::Export => {
                return Err(ProviderError::InvalidRequest(
                    "export is not a generation category".to_string(),
                ));
            }
            Category::Hook => ContentBody::Hook {
                hooks: (1..=10)
                    .map(|i| format!("why nobody talks about {} number {}", topic, i))
                    .collect(),
            },
            Category::Script => ContentBody::Script {
                scenes: vec![
                    Scene {
                        scene_number: 1,
                        kind: "facecam".to_string(),
                        text: format!("Here is the truth about {}", topic),
                        duration_seconds: 6.0,
                        visual_description: "close up, direct eye contact".to_string(),
                    },
                    Scene {
                        scene_number: 2,
                        kind: "broll".to_string(),
                        text: format!("Three things change once you start {}", topic),
                        duration_seconds: 8.0,
                        visual_description: "fast cuts of the process".to_string(),
                    },
                ],
                cta: "Follow for part two".to_string(),
                total_duration: 14,
            },
            Category::Shotlist => ContentBody::Shotlist {
                shots: (1..=3)
                    .map(|i| format!("Shot {}: {} from a new angle", i, topic))
                    .collect(),
            },
            Category::Voiceover => ContentBody::Voiceover {
                text: format!("Most people get {} completely wrong. Here is what works.", topic),
                estimated_duration: 15,
            },
            Category::Caption => ContentBody::Caption {
                caption: format!("The one thing about {} nobody tells you.", topic),
                hashtags: (1..=15).map(|i| format!("#tag{}", i)).collect(),
            },
            Category::Broll => ContentBody::Broll {
                ideas: (1..=10)
                    .map(|i| format!("scene idea number {}", i))
                    .collect(),
            },
            Category::Calendar => ContentBody::Calendar {
                niche: topic.to_string(),
                days: (1..=30)
                    .map(|day| CalendarDay {
                        day,
                        hook: format!("day {} hook about {}", day, topic),
                        theme: format!("theme {}", day),
                    })
                    .collect(),
            },
        };
        Ok(body)
    }
}

#[async_trait]
impl ContentGenerator for MockContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<ContentBody, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock content generator not enabled".to_string(),
            ));
        }
        self.body_for(request)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock content generator not enabled".to_string(),
            ))
        }
    }
}
