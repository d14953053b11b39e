//! User-facing texts.

use super::channel::Requester;
use super::intent::{CommandPrefixes, TAGS_MARKER, TITLE_MARKER};
use crate::suno::ArtifactSnapshot;

/// Shown instead of a link when a video did not arrive in time
pub const VIDEO_UNAVAILABLE: &str = "视频暂未生成，请稍后在 Suno 查看";

/// Credited as producer on every song card
const PRODUCER: &str = "Suno";

/// Lyrics card sent before each audio file
#[must_use]
pub fn song_card(snapshot: &ArtifactSnapshot, requester: &Requester, prompt: &str) -> String {
    format!(
        "🎻{title}🎻\n\n{lyrics}\n\n🎹风格：{tags}\n👶发起人：{requester}\n🍀制作人：{PRODUCER}\n🎤提示词：{prompt}",
        title = snapshot.title,
        lyrics = snapshot.lyrics_text.trim(),
        tags = snapshot.tags,
        requester = requester.nickname,
    )
}

/// Card for a lyrics-only request
#[must_use]
pub fn lyrics_card(snapshot: &ArtifactSnapshot, requester: &Requester, prompt: &str) -> String {
    format!(
        "🎻{title}🎻\n\n{lyrics}\n\n👶发起人：{requester}\n🍀制作人：{PRODUCER}\n🎤提示词：{prompt}",
        title = snapshot.title,
        lyrics = snapshot.lyrics_text.trim(),
        requester = requester.nickname,
    )
}

/// Final message listing one video line per clip
#[must_use]
pub fn video_summary(bot_name: &str, requester: &Requester, videos: &[Option<String>]) -> String {
    let lines = videos
        .iter()
        .enumerate()
        .map(|(idx, url)| format!("视频{}: {}", idx + 1, url.as_deref().unwrap_or(VIDEO_UNAVAILABLE)))
        .collect::<Vec<_>>()
        .join("\n");

    let text = format!("{bot_name}已经为您创作了音乐，请查收！以下是音乐视频：\n{lines}");
    if requester.is_group {
        format!("@{}\n{text}", requester.nickname)
    } else {
        text
    }
}

/// Immediate reply once a music job is accepted
#[must_use]
pub fn music_ack(bot_name: &str, requester: &Requester) -> String {
    format!("{}，{bot_name}正在为您创作音乐，请稍等☕", requester.nickname)
}

/// Immediate reply once a lyrics job is accepted
#[must_use]
pub fn lyrics_ack(bot_name: &str, requester: &Requester) -> String {
    format!("{}，{bot_name}正在为您填词，请稍等✍️", requester.nickname)
}

/// Reply when music quota ran out and lyrics were submitted instead
#[must_use]
pub fn quota_fallback(bot_name: &str) -> String {
    format!("今天的作曲额度已经用完啦😂 不过{bot_name}可以先为你写一首歌词，请稍等✍️")
}

/// Reply when quota ran out and there is no fallback
#[must_use]
pub fn quota_exhausted() -> String {
    "今天的作曲额度已经用完啦😂 请明天再来找我吧".to_string()
}

/// Reply when the service rejected the account
#[must_use]
pub fn unauthorized() -> String {
    "音乐服务的账号授权已失效，请联系管理员更新配置🔑".to_string()
}

/// Reply when the service refused the prompt
#[must_use]
pub fn prompt_rejected(detail: &str) -> String {
    format!("提示词没有被接受（{detail}），请调整后再试🙏")
}

/// Reply when the account has too many jobs running
#[must_use]
pub fn too_many_jobs(detail: &str) -> String {
    format!("正在进行的创作太多了（{detail}），请稍后再试⏳")
}

/// Reply for any other structured error
#[must_use]
pub fn remote_error(detail: &str) -> String {
    format!("抱歉！音乐服务返回了错误：{detail}")
}

/// Reply for network failures and unexpected errors
#[must_use]
pub fn generic_failure() -> String {
    "抱歉！创作音乐失败，请稍后再试🥺".to_string()
}

/// Sent by a worker that could not finish delivering
#[must_use]
pub fn delivery_failure() -> String {
    "抱歉！作品交付过程中出了点问题，已发送的内容不受影响，请稍后再试🥺".to_string()
}

/// Usage help, also sent when a custom-mode prompt is malformed
#[must_use]
pub fn help_text(prefixes: &CommandPrefixes) -> String {
    let example = |list: &[String]| list.first().cloned().unwrap_or_default();
    let music = example(&prefixes.music);

    let mut text = format!(
        "使用 Suno 创作音乐：\n\
         • 输入「{music}+提示词」创作歌曲，例如「{music}明天会更好」\n"
    );
    if !prefixes.instrumental.is_empty() {
        let instrumental = example(&prefixes.instrumental);
        text.push_str(&format!("• 输入「{instrumental}+提示词」创作纯音乐\n"));
    }
    if !prefixes.lyrics.is_empty() {
        let lyrics = example(&prefixes.lyrics);
        text.push_str(&format!("• 输入「{lyrics}+提示词」只写歌词\n"));
    }
    text.push_str(&format!(
        "• 自定义模式：\n{music}\n{TITLE_MARKER}: 歌名（可选）\n{TAGS_MARKER}: 曲风\n歌词（可选，风格和歌词至少填一项）"
    ));
    text
}
