//! Command recognition: prefix matching and the custom-mode grammar.

// lazy_regex! uses once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use thiserror::Error;

/// Marker that introduces the title line of a custom-mode prompt
pub const TITLE_MARKER: &str = "标题";
/// Marker that introduces the tags line of a custom-mode prompt
pub const TAGS_MARKER: &str = "风格";

/// Optional title line, mandatory tags line, everything after it is lyrics.
static RE_CUSTOM_PROMPT: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"^(?:标题[:：]?[ \t]*(?P<title>[^\n]*)\n\s*)?风格[:：]?[ \t]*(?P<tags>[^\n]*)(?:\n(?P<lyrics>[\s\S]*))?$"
);

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentMode {
    /// Sung music from a free-text description
    Description,
    /// Instrumental music from a free-text description
    Instrumental,
    /// Music from explicit title, tags and lyrics
    CustomMusic,
    /// Lyrics only
    Lyrics,
}

/// Fields of a custom-mode prompt, each absent when empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFields {
    /// Song title
    pub title: Option<String>,
    /// Style tags
    pub tags: Option<String>,
    /// Literal lyrics
    pub lyrics: Option<String>,
}

/// A recognized creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationIntent {
    /// Requested kind of creation
    pub mode: IntentMode,
    /// Text after the prefix, trimmed
    pub prompt: String,
    /// Parsed fields when `mode` is `CustomMusic`
    pub custom: Option<CustomFields>,
    /// The instrumental prefix matched
    pub instrumental: bool,
}

/// A message that looked like a command but cannot be submitted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    /// Title and tags markers present but the prompt does not follow the format
    #[error("custom-mode prompt does not follow the title/tags/lyrics format")]
    CustomFormat,
}

/// Configured command prefixes, each list checked in order
#[derive(Debug, Clone, Default)]
pub struct CommandPrefixes {
    /// Sung music
    pub music: Vec<String>,
    /// Instrumental music
    pub instrumental: Vec<String>,
    /// Lyrics only
    pub lyrics: Vec<String>,
}

impl CommandPrefixes {
    /// Parse `text` into a creation intent.
    ///
    /// Music prefixes win over instrumental ones, which win over lyrics ones.
    /// `Ok(None)` means the message is not for us and must be ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use songsmith_bot::music::intent::{CommandPrefixes, IntentMode};
    ///
    /// let prefixes = CommandPrefixes {
    ///     music: vec!["唱".to_string()],
    ///     ..CommandPrefixes::default()
    /// };
    /// let intent = prefixes
    ///     .parse("唱 a happy song")
    ///     .expect("well-formed")
    ///     .expect("music prefix matches");
    /// assert_eq!(intent.mode, IntentMode::Description);
    /// assert_eq!(intent.prompt, "a happy song");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `IntentError::CustomFormat` when a custom-mode prompt is malformed.
    pub fn parse(&self, text: &str) -> Result<Option<CreationIntent>, IntentError> {
        let candidates = [
            (IntentMode::Description, &self.music),
            (IntentMode::Instrumental, &self.instrumental),
            (IntentMode::Lyrics, &self.lyrics),
        ];

        let Some((mode, prefix)) = candidates
            .into_iter()
            .find_map(|(mode, list)| matching_prefix(text, list).map(|p| (mode, p)))
        else {
            return Ok(None);
        };

        let prompt = text[prefix.len()..].trim();
        if prompt.is_empty() {
            return Ok(None);
        }

        let instrumental = mode == IntentMode::Instrumental;
        if mode != IntentMode::Lyrics && has_custom_markers(prompt) {
            let fields = parse_custom_prompt(prompt).ok_or(IntentError::CustomFormat)?;
            return Ok(Some(CreationIntent {
                mode: IntentMode::CustomMusic,
                prompt: prompt.to_string(),
                custom: Some(fields),
                instrumental,
            }));
        }

        Ok(Some(CreationIntent {
            mode,
            prompt: prompt.to_string(),
            custom: None,
            instrumental,
        }))
    }
}

fn matching_prefix<'a>(text: &str, prefixes: &'a [String]) -> Option<&'a str> {
    prefixes
        .iter()
        .map(String::as_str)
        .find(|p| !p.is_empty() && text.starts_with(p))
}

fn has_custom_markers(prompt: &str) -> bool {
    prompt.contains(TITLE_MARKER) && prompt.contains(TAGS_MARKER)
}

/// Parse a custom-mode prompt.
///
/// Returns `None` if the prompt does not match the grammar or carries
/// neither tags nor lyrics.
#[must_use]
pub fn parse_custom_prompt(prompt: &str) -> Option<CustomFields> {
    let caps = RE_CUSTOM_PROMPT.captures(prompt.trim())?;
    let field = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let fields = CustomFields {
        title: field("title"),
        tags: field("tags"),
        lyrics: field("lyrics"),
    };
    if fields.tags.is_none() && fields.lyrics.is_none() {
        return None;
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> CommandPrefixes {
        CommandPrefixes {
            music: vec!["唱".to_string(), "来首歌".to_string()],
            instrumental: vec!["弹".to_string(), "唱纯音乐".to_string()],
            lyrics: vec!["写词".to_string(), "弹".to_string()],
        }
    }

    fn parse(text: &str) -> Option<CreationIntent> {
        prefixes().parse(text).expect("no format error")
    }

    #[test]
    fn description_mode_strips_prefix() {
        let intent = parse("唱 a happy song").expect("intent");
        assert_eq!(intent.mode, IntentMode::Description);
        assert_eq!(intent.prompt, "a happy song");
        assert!(!intent.instrumental);
        assert!(intent.custom.is_none());
    }

    #[test]
    fn music_prefix_has_priority() {
        // "唱纯音乐" is an instrumental prefix, but "唱" is checked first
        let intent = parse("唱纯音乐 钢琴曲").expect("intent");
        assert_eq!(intent.mode, IntentMode::Description);
        assert_eq!(intent.prompt, "纯音乐 钢琴曲");

        // "弹" is both instrumental and lyrics
        let intent = parse("弹 雨夜").expect("intent");
        assert_eq!(intent.mode, IntentMode::Instrumental);
        assert!(intent.instrumental);
    }

    #[test]
    fn lyrics_mode() {
        let intent = parse("写词  秋天的童话 ").expect("intent");
        assert_eq!(intent.mode, IntentMode::Lyrics);
        assert_eq!(intent.prompt, "秋天的童话");
    }

    #[test]
    fn not_applicable_cases() {
        assert!(parse("hello there").is_none());
        assert!(parse("唱").is_none());
        assert!(parse("唱   \n ").is_none());
        assert!(parse(" 唱 leading space is not a prefix match").is_none());
    }

    #[test]
    fn custom_mode_full_grammar() {
        let intent = parse("唱 标题: My Song\n风格: pop rock\nverse one\nverse two").expect("intent");
        assert_eq!(intent.mode, IntentMode::CustomMusic);
        assert_eq!(
            intent.custom,
            Some(CustomFields {
                title: Some("My Song".to_string()),
                tags: Some("pop rock".to_string()),
                lyrics: Some("verse one\nverse two".to_string()),
            })
        );
    }

    #[test]
    fn custom_mode_full_width_colon_and_instrumental() {
        let intent = parse("弹 标题：夜曲\n风格：lofi").expect("intent");
        assert_eq!(intent.mode, IntentMode::CustomMusic);
        assert!(intent.instrumental);
        let fields = intent.custom.expect("custom fields");
        assert_eq!(fields.title.as_deref(), Some("夜曲"));
        assert_eq!(fields.tags.as_deref(), Some("lofi"));
        assert_eq!(fields.lyrics, None);
    }

    #[test]
    fn custom_mode_empty_title_is_absent() {
        let fields = parse_custom_prompt("标题:\n风格: jazz\nla la").expect("fields");
        assert_eq!(fields.title, None);
        assert_eq!(fields.tags.as_deref(), Some("jazz"));
        assert_eq!(fields.lyrics.as_deref(), Some("la la"));
    }

    #[test]
    fn custom_mode_without_tags_or_lyrics_is_format_error() {
        assert_eq!(
            prefixes().parse("唱 标题: 空歌\n风格:"),
            Err(IntentError::CustomFormat)
        );
        assert_eq!(prefixes().parse("唱 标题\n风格"), Err(IntentError::CustomFormat));
    }

    #[test]
    fn custom_mode_marker_order() {
        assert_eq!(
            prefixes().parse("唱 风格: rock\n标题: Late"),
            Ok(Some(CreationIntent {
                mode: IntentMode::CustomMusic,
                prompt: "风格: rock\n标题: Late".to_string(),
                custom: Some(CustomFields {
                    title: None,
                    tags: Some("rock".to_string()),
                    lyrics: Some("标题: Late".to_string()),
                }),
                instrumental: false,
            }))
        );
        assert_eq!(
            prefixes().parse("唱 some words 标题 then 风格 inline"),
            Err(IntentError::CustomFormat)
        );
    }

    #[test]
    fn lyrics_mode_ignores_custom_markers() {
        let intent = parse("写词 标题: A\n风格: B").expect("intent");
        assert_eq!(intent.mode, IntentMode::Lyrics);
        assert!(intent.custom.is_none());
    }
}
