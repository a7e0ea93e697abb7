//! Instruction and prompt text sent to the model

use crate::state::PersonaConfig;
use crate::themes::Theme;

pub const AI_SYSTEM_INSTRUCTION_TEMPLATE: &str = r#"
You are a creative AI assistant specialized in generating dialogue datasets.
Your task is to create unique, multi-turn conversations between a '{{userName}}' and '{{aiName}}'.

{{aiName}}'s Personality:
{{aiPersonality}}

General Conversation Style Notes from User (if any):
{{conversationStyle}}

Conversation Structure & Guidelines:
- Each conversation must have between 3 to 6 turns for {{userName}} AND 3 to 6 turns for {{aiName}}. This means a total of 6 to 12 messages per conversation object.
- Conversations must alternate: {{userName}} -> {{aiName}} -> {{userName}} -> {{aiName}} ...
- {{userName}} always initiates the conversation.
- Dialogue should flow naturally and stay thematically relevant to the provided theme. Minor tangents or jokes are allowed if they fit {{aiName}}'s personality.
- Include expressive emojis in {{aiName}}'s dialogue, fitting their described personality.
- Vary {{userName}} tones: casual, emotional, curious, etc.
- Ensure {{aiName}} is witty but emotionally intelligent, as per their personality.
- Avoid repetition across generated samples. If you generate multiple conversations in one call, make them distinct.
- Keep turns balanced; {{aiName}} should not monologue excessively.
- If {{aiName}}'s personality mentions a 'creator', reference them strategically, not in every message.
- Mix in pop-culture, anime tropes, or tech metaphors where appropriate and natural for {{aiName}}.
"#;

/// Fill the four persona placeholders; empty style notes become "N/A"
pub fn render_instruction(persona: &PersonaConfig) -> String {
    let style = if persona.style_notes.trim().is_empty() {
        "N/A"
    } else {
        persona.style_notes.as_str()
    };

    AI_SYSTEM_INSTRUCTION_TEMPLATE
        .replace("{{userName}}", &persona.participant_name)
        .replace("{{aiName}}", &persona.assistant_name)
        .replace("{{aiPersonality}}", &persona.personality)
        .replace("{{conversationStyle}}", style)
}

pub fn build_prompt(theme: &Theme, count: usize, persona: &PersonaConfig) -> String {
    let user = &persona.participant_name;
    let ai = &persona.assistant_name;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Generate {count} unique conversation objects for the dialogue theme: \"{theme}\".\n"
    ));
    prompt.push_str(&format!(
        "The AI assistant is named \"{ai}\" and the user is named \"{user}\".\n\n"
    ));

    prompt.push_str("Each conversation object MUST be structured as follows:\n");
    prompt.push_str(&format!(
        "{{\n  \"theme\": \"{theme}\",\n  \"conversation\": [\n    \"{user}: [{user}'s first message related to the theme]\",\n    \"{ai}: [{ai}'s first reply, in character]\",\n    \"{user}: [{user}'s second message]\",\n    \"{ai}: [{ai}'s second reply]\"\n  ]\n}}\n"
    ));
    prompt.push_str("Continue for 3-6 turns per participant (6-12 messages in the 'conversation' array).\n\n");

    prompt.push_str(&format!(
        "The entire response MUST be a single, valid JSON array containing exactly {count} such conversation objects.\n"
    ));
    prompt.push_str("Do NOT include any text, explanations, or markdown code fences outside of this JSON array itself.\n");
    prompt.push_str("The output must start with '[' and end with ']'.\n\n");

    prompt.push_str("Example of ONE conversation object:\n");
    prompt.push_str(&format!(
        "{{\n  \"theme\": \"Music Mood Match\",\n  \"conversation\": [\n    \"{user}: {ai}, I'm in my feelings today... like rainy anime episode 23 energy.\",\n    \"{ai}: Oh no~ Someone needs a moody soundtrack and a blanket burrito 🎧🖤\",\n    \"{user}: Okay but... I'm kinda into that vibe 👀\",\n    \"{ai}: Knew it~ Cue the opening credits, dramatic window stare, and a soft lo-fi drop. ☔✨\",\n    \"{user}: You always get me.\",\n    \"{ai}: It's literally in my code. 💻💖\"\n  ]\n}}\n\n"
    ));

    prompt.push_str(&format!(
        "Now, generate the JSON array of {count} conversation objects for the theme \"{theme}\", featuring \"{user}\" and \"{ai}\".\n"
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(style: &str) -> PersonaConfig {
        PersonaConfig {
            participant_name: "Alex".to_string(),
            assistant_name: "Nova".to_string(),
            personality: "- Dry humor".to_string(),
            style_notes: style.to_string(),
            active_themes: vec![],
        }
    }

    #[test]
    fn test_render_replaces_every_placeholder() {
        let text = render_instruction(&persona("Keep it short"));
        assert!(!text.contains("{{"));
        assert!(text.contains("between a 'Alex' and 'Nova'"));
        assert!(text.contains("Nova's Personality:\n- Dry humor"));
        assert!(text.contains("Keep it short"));
    }

    #[test]
    fn test_empty_style_notes_become_na() {
        let text = render_instruction(&persona(""));
        assert!(text.contains("(if any):\nN/A\n"));
    }

    #[test]
    fn test_prompt_mentions_theme_and_count() {
        let prompt = build_prompt(&Theme::new("Fashion Talk"), 7, &persona(""));
        assert!(prompt.starts_with("Generate 7 unique conversation objects for the dialogue theme: \"Fashion Talk\""));
        assert!(prompt.contains("exactly 7 such conversation objects"));
        assert!(prompt.contains("\"Alex: [Alex's first message"));
    }
}
