use replyflow_core::{Candidate, LlmSettings, ReplyContext};

/// Hard ceiling on published reply length, and on how much candidate text
/// is embedded in the prompt.
pub const MAX_REPLY_CHARS: usize = 500;

/// Persona plus fixed instructions plus one line per enabled style toggle.
pub fn build_system_prompt(settings: &LlmSettings, context: &ReplyContext) -> String {
    let persona = settings
        .persona
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(context.default_persona);

    let mut lines = vec![
        persona.trim().to_string(),
        format!(
            "You are replying to a {} on behalf of the account owner.",
            context.content_noun
        ),
        format!("Keep the reply under {MAX_REPLY_CHARS} characters."),
        "Write in a natural, conversational tone that fits the platform.".to_string(),
    ];

    if settings.no_hashtags {
        lines.push("Do not use hashtags.".to_string());
    }
    if settings.no_emojis {
        lines.push("Do not use emojis.".to_string());
    }
    if settings.lowercase_only {
        lines.push("Write entirely in lowercase.".to_string());
    }
    if settings.casual_grammar {
        lines.push(
            "Use casual grammar with the occasional small typo, like a quick human reply."
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Embeds the candidate (title/body truncated to bound token usage) and its
/// author context.
pub fn build_user_prompt(candidate: &Candidate, context: &ReplyContext) -> String {
    let mut sections = Vec::new();

    sections.push(format!(
        "Write a reply to this {} by {}:",
        context.content_noun, candidate.author
    ));
    if let Some(title) = candidate.title.as_deref().filter(|t| !t.is_empty()) {
        sections.push(format!("Title: {}", truncate_chars(title, MAX_REPLY_CHARS)));
    }
    if !candidate.body.is_empty() {
        sections.push(truncate_chars(&candidate.body, MAX_REPLY_CHARS));
    }
    sections.push(format!(
        "It currently has {} likes and {} replies on {}.",
        candidate.engagement, candidate.reply_count, context.platform_label
    ));

    sections.join("\n\n")
}

/// Hard-truncates a generated reply to the platform-safe ceiling.
pub fn truncate_reply(text: &str) -> String {
    truncate_chars(text, MAX_REPLY_CHARS)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context() -> ReplyContext {
        ReplyContext {
            platform_label: "Reddit",
            content_noun: "Reddit post",
            default_persona: "You are a helpful community member.",
        }
    }

    fn settings() -> LlmSettings {
        LlmSettings {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            persona: None,
            no_hashtags: false,
            no_emojis: false,
            lowercase_only: false,
            casual_grammar: false,
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            id: "t3_a".to_string(),
            author: "rustacean".to_string(),
            title: Some("Which runtime?".to_string()),
            body: "Starting a new project.".to_string(),
            engagement: 42,
            reply_count: 7,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn default_persona_used_when_none_configured() {
        let prompt = build_system_prompt(&settings(), &context());
        assert!(prompt.starts_with("You are a helpful community member."));
        assert!(prompt.contains("under 500 characters"));
    }

    #[test]
    fn blank_persona_falls_back_to_default() {
        let mut s = settings();
        s.persona = Some("   ".to_string());
        let prompt = build_system_prompt(&s, &context());
        assert!(prompt.starts_with("You are a helpful community member."));
    }

    #[test]
    fn style_toggles_add_one_line_each() {
        let base_lines = build_system_prompt(&settings(), &context()).lines().count();

        let mut s = settings();
        s.no_hashtags = true;
        s.no_emojis = true;
        s.lowercase_only = true;
        s.casual_grammar = true;
        let prompt = build_system_prompt(&s, &context());

        assert_eq!(prompt.lines().count(), base_lines + 4);
        assert!(prompt.contains("Do not use hashtags."));
        assert!(prompt.contains("Do not use emojis."));
        assert!(prompt.contains("entirely in lowercase"));
        assert!(prompt.contains("casual grammar"));
    }

    #[test]
    fn user_prompt_embeds_title_body_and_author() {
        let prompt = build_user_prompt(&candidate(), &context());
        assert!(prompt.contains("rustacean"));
        assert!(prompt.contains("Which runtime?"));
        assert!(prompt.contains("Starting a new project."));
        assert!(prompt.contains("42 likes"));
    }

    #[test]
    fn long_candidate_body_is_truncated_in_prompt() {
        let mut c = candidate();
        c.body = "x".repeat(2000);
        let prompt = build_user_prompt(&c, &context());
        assert!(!prompt.contains(&"x".repeat(501)));
        assert!(prompt.contains(&"x".repeat(500)));
    }

    #[test]
    fn replies_are_hard_truncated_to_the_ceiling() {
        let long = "y".repeat(800);
        assert_eq!(truncate_reply(&long).chars().count(), MAX_REPLY_CHARS);

        let short = "short reply";
        assert_eq!(truncate_reply(short), short);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 600 two-byte characters; byte-indexed slicing would panic.
        let text: String = "é".repeat(600);
        let truncated = truncate_reply(&text);
        assert_eq!(truncated.chars().count(), MAX_REPLY_CHARS);
    }
}
