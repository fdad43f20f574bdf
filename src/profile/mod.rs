//! Bounded per-client session profiles
//!
//! Tracks what a visitor has talked about so the assistant can tailor career
//! recommendations. History and skill lists are explicitly bounded: the store
//! keeps the most recent messages per client and evicts from the front, so a
//! long-running process never accumulates unbounded state.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::llm::traits::CompletionProvider;
use crate::llm::{ChatMessage, ProviderResult};

/// Interactions needed to reach full learning progress.
const LEARNING_SATURATION: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

/// Session profile for one client.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub conversation_history: Vec<ChatMessage>,
    pub learning_progress: f32,
    pub interactions: u32,
    pub last_updated: DateTime<Utc>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            skills: Vec::new(),
            experience_level: ExperienceLevel::Entry,
            conversation_history: Vec::new(),
            learning_progress: 0.0,
            interactions: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Concurrent, bounded store of session profiles.
pub struct ProfileStore {
    profiles: DashMap<String, UserProfile>,
    max_history: usize,
    max_skills: usize,
}

impl ProfileStore {
    pub fn new(max_history: usize, max_skills: usize) -> Self {
        Self {
            profiles: DashMap::new(),
            max_history,
            max_skills,
        }
    }

    /// Append one user/assistant exchange, evicting the oldest messages when
    /// the history bound is exceeded.
    pub fn record_exchange(&self, client_id: &str, user: &ChatMessage, assistant: &ChatMessage) {
        let mut profile = self
            .profiles
            .entry(client_id.to_string())
            .or_insert_with(UserProfile::default);

        profile.conversation_history.push(user.clone());
        profile.conversation_history.push(assistant.clone());
        let overflow = profile
            .conversation_history
            .len()
            .saturating_sub(self.max_history);
        if overflow > 0 {
            profile.conversation_history.drain(..overflow);
        }

        profile.interactions += 1;
        profile.learning_progress = learning_progress(profile.interactions);
        profile.last_updated = Utc::now();
    }

    /// Merge newly extracted skills into the profile, deduplicating
    /// case-insensitively and keeping the list bounded.
    pub fn add_skills(&self, client_id: &str, skills: Vec<String>) {
        let mut profile = self
            .profiles
            .entry(client_id.to_string())
            .or_insert_with(UserProfile::default);

        for skill in skills {
            let known = profile
                .skills
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(&skill));
            if !known && profile.skills.len() < self.max_skills {
                profile.skills.push(skill);
            }
        }
        profile.last_updated = Utc::now();
    }

    pub fn get(&self, client_id: &str) -> Option<UserProfile> {
        self.profiles.get(client_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Learning progress saturates after [`LEARNING_SATURATION`] interactions.
pub fn learning_progress(interactions: u32) -> f32 {
    (interactions as f32 / LEARNING_SATURATION).min(1.0)
}

fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", message.role.as_str(), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract a skill list from conversation history via an opaque
/// text-generation call. Returns an empty list when nothing is apparent.
pub async fn extract_skills(
    provider: &dyn CompletionProvider,
    history: &[ChatMessage],
) -> ProviderResult<Vec<String>> {
    let prompt = format!(
        "Given the following conversation history, extract a comma-separated list \
         of technical and soft skills mentioned or implied by the user. Focus on \
         skills relevant to a professional portfolio. If no skills are apparent, \
         return \"none\".\n\nConversation:\n{}\n\nSkills:",
        render_history(history)
    );

    let reply = provider.complete(&[ChatMessage::user(prompt)]).await?;
    let reply = reply.trim();
    if reply.is_empty() || reply.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }

    let skills: Vec<String> = reply
        .split(',')
        .map(|skill| skill.trim().to_string())
        .filter(|skill| !skill.is_empty())
        .collect();
    debug!("extracted {} skills from history", skills.len());
    Ok(skills)
}

/// Generate career recommendations for a profile via an opaque
/// text-generation call.
pub async fn career_recommendations(
    provider: &dyn CompletionProvider,
    profile: &UserProfile,
) -> ProviderResult<String> {
    let recent: Vec<ChatMessage> = profile
        .conversation_history
        .iter()
        .rev()
        .take(5)
        .rev()
        .cloned()
        .collect();

    let prompt = format!(
        "Based on the following user profile, provide concise and actionable \
         career recommendations. Focus on potential job roles, areas for skill \
         development, and relevant industries.\nSkills: {}\nExperience level: \
         {:?}\nRecent conversation:\n{}\n\nRecommendations:",
        profile.skills.join(", "),
        profile.experience_level,
        render_history(&recent)
    );

    provider.complete(&[ChatMessage::user(prompt)]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::{ProviderKind, ResponseSource};

    fn exchange(n: usize) -> (ChatMessage, ChatMessage) {
        (
            ChatMessage::user(format!("question {}", n)),
            ChatMessage::assistant(format!("answer {}", n), ResponseSource::Primary),
        )
    }

    #[test]
    fn history_is_bounded_with_front_eviction() {
        let store = ProfileStore::new(4, 20);
        for n in 0..5 {
            let (user, assistant) = exchange(n);
            store.record_exchange("visitor", &user, &assistant);
        }

        let profile = store.get("visitor").unwrap();
        assert_eq!(profile.conversation_history.len(), 4);
        // Oldest messages were evicted; the latest exchange survives.
        assert_eq!(profile.conversation_history[3].content, "answer 4");
        assert_eq!(profile.interactions, 5);
    }

    #[test]
    fn skills_deduplicate_case_insensitively_and_stay_bounded() {
        let store = ProfileStore::new(10, 3);
        store.add_skills("visitor", vec!["Rust".to_string(), "SQL".to_string()]);
        store.add_skills(
            "visitor",
            vec!["rust".to_string(), "Go".to_string(), "Kubernetes".to_string()],
        );

        let profile = store.get("visitor").unwrap();
        assert_eq!(profile.skills, vec!["Rust", "SQL", "Go"]);
    }

    #[test]
    fn learning_progress_saturates() {
        assert_eq!(learning_progress(0), 0.0);
        assert!((learning_progress(25) - 0.5).abs() < f32::EPSILON);
        assert_eq!(learning_progress(200), 1.0);
    }

    #[tokio::test]
    async fn extract_skills_parses_comma_list() {
        let provider =
            ScriptedProvider::always_ok(ProviderKind::OpenAi, "Rust, distributed systems , ");
        let history = vec![ChatMessage::user("I write Rust services")];
        let skills = extract_skills(&provider, &history).await.unwrap();
        assert_eq!(skills, vec!["Rust", "distributed systems"]);
    }

    #[tokio::test]
    async fn extract_skills_treats_none_as_empty() {
        let provider = ScriptedProvider::always_ok(ProviderKind::OpenAi, "none");
        let skills = extract_skills(&provider, &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert!(skills.is_empty());
    }
}
