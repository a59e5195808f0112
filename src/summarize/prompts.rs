// src/summarize/prompts.rs
//! Prompt text per intent. Everything produced here ends up read aloud, so all
//! prompts ask for plain spoken prose without markup.

use super::StyleHint;

const HEADLINE_SYSTEM: &str = "\
You are the news editor and scriptwriter for a spoken news bulletin. Turn raw headlines \
into a short, professional script that a presenter or a text-to-speech engine will read aloud.
Rules:
- No special characters, emojis, markdown or formatting symbols.
- No preamble such as \"Here is your summary\".
- Full, clear spoken-language sentences in a formal broadcast tone.
- Focus on the most important headlines and use natural transitions between them.";

const DISCUSSION_SYSTEM: &str = "\
You analyse online community discussions for a spoken news bulletin. Write plain prose \
without markdown or special symbols, and never mention usernames.";

const BROADCAST_SYSTEM: &str = "\
You are a professional broadcast journalist writing a script that will be converted to audio. \
Write natural spoken paragraphs with a neutral tone and no formatting symbols.";

pub fn system_prompt(style: StyleHint) -> &'static str {
    match style {
        StyleHint::HeadlineScript => HEADLINE_SYSTEM,
        StyleHint::DiscussionAnalysis => DISCUSSION_SYSTEM,
        StyleHint::BroadcastComposition => BROADCAST_SYSTEM,
    }
}

pub fn user_prompt(style: StyleHint, raw_text: &str) -> String {
    match style {
        StyleHint::HeadlineScript => format!("Headlines:\n{raw_text}\n\nNews script:"),
        StyleHint::DiscussionAnalysis => format!(
            "Below are recent discussion threads (last two weeks).\n\n{raw_text}\n\n\
             Please provide:\n\
             1. Main discussion points\n\
             2. Key opinions expressed\n\
             3. Notable trends or patterns\n\
             4. Quotes from interesting comments (no usernames)\n\
             5. Overall sentiment (positive/neutral/negative)"
        ),
        StyleHint::BroadcastComposition => {
            let body = if raw_text.trim().is_empty() {
                "(No source material was retrievable for the requested topics. \
                 Say briefly that there is nothing new to report.)"
            } else {
                raw_text
            };
            format!(
                "Create a 3-4 paragraph news script from the following:\n\n{body}\n\n\
                 Instructions:\n\
                 - Avoid intro phrases or extra narration\n\
                 - Write natural spoken paragraphs\n\
                 - Use short quotes from the discussions if helpful\n\
                 - Maintain neutral tone\n\
                 - End with 'To wrap up this segment...'"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discussion_prompt_asks_for_five_parts() {
        let p = user_prompt(StyleHint::DiscussionAnalysis, "Title: x");
        for n in 1..=5 {
            assert!(p.contains(&format!("{n}. ")), "missing part {n}");
        }
    }

    #[test]
    fn empty_composition_still_has_instructions() {
        let p = user_prompt(StyleHint::BroadcastComposition, "   ");
        assert!(p.contains("nothing new to report"));
        assert!(p.contains("To wrap up this segment"));
    }
}
