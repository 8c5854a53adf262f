use confetti_core::catalog::{
    ContentItem, ContentPayload, HotTakeContent, IcebreakerContent, MemeContent, PollContent,
    QuizContent, ThisOrThatContent,
};
use serde::Serialize;

/// Slack caps a section's text at 3000 characters; long lists are split at
/// newline boundaries below this.
const SECTION_CHAR_LIMIT: usize = 2800;

const OPTION_EMOJIS: [&str; 4] = ["🅰️", "🅱️", "🅲️", "🅳️"];
const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into(), emoji: true }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Section { text: TextObject },
    Context { elements: Vec<TextObject> },
    Divider,
    Image { image_url: String, alt_text: String },
}

/// A rendered message: Block Kit blocks plus the plain-text fallback Slack
/// shows in notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { text: TextObject::plain(text) });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn section(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Section { text: TextObject::mrkdwn(text) });
        self
    }

    /// One section per chunk, split at newline boundaries to stay under the
    /// platform's per-section character limit.
    pub fn long_section(mut self, text: &str) -> Self {
        for chunk in split_chunks(text, SECTION_CHAR_LIMIT) {
            self.blocks.push(Block::Section { text: TextObject::mrkdwn(chunk) });
        }
        self
    }

    pub fn context(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Context { elements: vec![TextObject::mrkdwn(text)] });
        self
    }

    pub fn image(mut self, image_url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        self.blocks.push(Block::Image { image_url: image_url.into(), alt_text: alt_text.into() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

/// Split `text` into chunks of at most `max_len`, breaking at newlines.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split('\n') {
        if !current.is_empty() && current.len() + 1 + line.len() > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn option_emoji(index: usize) -> String {
    OPTION_EMOJIS.get(index).map(|emoji| (*emoji).to_owned()).unwrap_or_else(|| {
        format!("{}.", index + 1)
    })
}

/// Render any catalog item with its bucket's template.
pub fn content_message(item: &ContentItem) -> MessageTemplate {
    match &item.payload {
        ContentPayload::Quiz(quiz) => quiz_message(quiz),
        ContentPayload::Poll(poll) => poll_message(poll),
        ContentPayload::HotTake(take) => hot_take_message(take),
        ContentPayload::ThisOrThat(matchup) => this_or_that_message(matchup),
        ContentPayload::Icebreaker(icebreaker) => icebreaker_message(icebreaker),
        ContentPayload::Meme(meme) => meme_message(meme),
    }
}

pub fn quiz_message(quiz: &QuizContent) -> MessageTemplate {
    let options_text = quiz
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| format!("{}  {option}", option_emoji(index)))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new(format!("Quiz: {}", quiz.question))
        .header("🧠 Quiz Thursday")
        .divider()
        .section(format!("*{}*", quiz.question))
        .section(options_text)
        .context("React with the emoji for your answer. Answer revealed in this thread ⏳")
        .build()
}

pub fn quiz_reveal_message(quiz: &QuizContent) -> MessageTemplate {
    let answer_text = quiz.options.get(quiz.answer).map(String::as_str).unwrap_or("unknown");
    let mut builder = MessageBuilder::new(format!("Answer: {answer_text}")).section(format!(
        "⏰ *Time's up!*\n\nThe correct answer is: {} *{answer_text}*",
        option_emoji(quiz.answer)
    ));
    if let Some(explanation) = &quiz.explanation {
        builder = builder.section(format!("💡 *Explanation:* {explanation}"));
    }
    builder
        .context("More quizzes every Thursday — or use `/confetti quiz` for an on-demand question!")
        .build()
}

pub fn poll_message(poll: &PollContent) -> MessageTemplate {
    let options_text = poll
        .options
        .iter()
        .map(|option| format!("{}  {}", option.emoji, option.text))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new(format!("Poll: {}", poll.question))
        .header("🗳️ Poll Friday")
        .divider()
        .section(format!("*{}*", poll.question))
        .section(options_text)
        .context("React with the emoji that matches your pick!")
        .build()
}

pub fn hot_take_message(take: &HotTakeContent) -> MessageTemplate {
    MessageBuilder::new(format!("Hot take: {}", take.take))
        .header("🔥 Hot Take Tuesday")
        .divider()
        .section(format!("*{}*", take.take))
        .context("React: 🔥 = Agree  |  🧊 = Cold take  |  💀 = Terrible opinion")
        .build()
}

pub fn this_or_that_message(matchup: &ThisOrThatContent) -> MessageTemplate {
    MessageBuilder::new(format!("This or that: {}", matchup.prompt))
        .header("⚔️ This or That Wednesday")
        .divider()
        .section(format!("*{}:*", matchup.prompt))
        .section(format!("1️⃣  *{}*\n\nvs.\n\n2️⃣  *{}*", matchup.left, matchup.right))
        .context("React with 1️⃣ or 2️⃣ to cast your vote. Spicy takes in the thread welcome.")
        .build()
}

pub fn icebreaker_message(icebreaker: &IcebreakerContent) -> MessageTemplate {
    MessageBuilder::new(format!("Icebreaker: {}", icebreaker.prompt))
        .header("💬 Monday Icebreaker")
        .divider()
        .section(format!("*{}*", icebreaker.prompt))
        .context("Drop your answers in the thread. No wrong answers — only wrong infrastructure decisions.")
        .build()
}

pub fn meme_message(meme: &MemeContent) -> MessageTemplate {
    let mut builder = MessageBuilder::new(format!("Meme Monday: {}", meme.prompt))
        .header("📸 Meme Monday")
        .divider()
        .section(meme.prompt.clone());
    if let Some(image_url) = &meme.image_url {
        builder = builder.image(image_url.clone(), meme.prompt.clone());
    }
    builder.context("Best caption gets pinned. Bonus points if it's happened to you IRL.").build()
}

/// Weekly engagement summary, as the wrap action posts it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklyWrapView {
    pub total_interactions: usize,
    /// `(user_id, action_count)` pairs, highest first.
    pub top_contributors: Vec<(String, usize)>,
}

pub fn weekly_wrap_message(view: &WeeklyWrapView) -> MessageTemplate {
    let contributors = if view.top_contributors.is_empty() {
        "_Quiet week. Touch grass confirmed._".to_owned()
    } else {
        view.top_contributors
            .iter()
            .enumerate()
            .map(|(index, (user_id, actions))| {
                format!("{}. <@{user_id}> — {actions} actions", index + 1)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    MessageBuilder::new(format!("Weekly wrap: {} interactions", view.total_interactions))
        .header("🏆 Weekly Wrap")
        .divider()
        .section(format!(
            "📊 *{} total interactions* this week\n\n*Top contributors:*\n{contributors}",
            view.total_interactions
        ))
        .context("New week, new debates. See you Monday. ☁️")
        .build()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub score: u64,
    pub badges: Vec<String>,
}

pub fn leaderboard_message(rows: &[LeaderboardRow]) -> MessageTemplate {
    let lines = if rows.is_empty() {
        "_No activity yet. Be the first!_".to_owned()
    } else {
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let medal = MEDALS
                    .get(index)
                    .map(|medal| (*medal).to_owned())
                    .unwrap_or_else(|| format!("{}.", index + 1));
                let badges = row.badges.join(" ");
                format!("{medal} <@{}> — {} pts {badges}", row.user_id, row.score)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    MessageBuilder::new("Community leaderboard")
        .header("🏆 Community Leaderboard")
        .divider()
        .section(lines)
        .context("Scoring: Quiz correct = 3pts | Reactions = 1pt | Messages = 1pt")
        .build()
}

pub fn welcome_message(conference_url: &str) -> MessageTemplate {
    MessageBuilder::new("Welcome to the community! 🚀")
        .header("Welcome! 🚀")
        .divider()
        .section("You just joined a workspace full of engineers building the future of intelligent infrastructure.")
        .section(format!(
            "*Here's your quick start:*\n→ Introduce yourself in <#introductions> (name, role, one hot take about cloud)\n→ Check the schedule: <{conference_url}|the conference site>\n→ Jump into <#daily-buzz> for daily tech debates"
        ))
        .divider()
        .section("See you there? 🎟️")
        .build()
}

/// One talk, as shown by the spotlight post and the `talk` command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TalkView {
    pub time: String,
    pub title: String,
    pub speaker: String,
    pub hall: String,
}

pub fn spotlight_message(talk: &TalkView, conference_url: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Speaker spotlight: {}", talk.title))
        .header("🎤 Speaker Spotlight")
        .divider()
        .section(format!(
            "*{}*\n🎤 {}\n🕐 {} — _{}_",
            talk.title, talk.speaker, talk.time, talk.hall
        ))
        .context(format!("Full schedule at <{conference_url}|the conference site> 🔄"))
        .build()
}

pub fn random_talk_message(talk: &TalkView, conference_url: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Random talk: {}", talk.title))
        .section(format!(
            "🎲 *Random talk suggestion for you:*\n\n*{}*\n🎤 {}\n🕐 {} — _{}_",
            talk.title, talk.speaker, talk.time, talk.hall
        ))
        .context(format!("Full schedule at <{conference_url}|the conference site>"))
        .build()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleView {
    pub date_label: String,
    pub venue: String,
    pub doors_open: String,
    pub url: String,
    pub halls: Vec<String>,
    pub talks: Vec<TalkView>,
}

pub fn schedule_message(view: &ScheduleView) -> MessageTemplate {
    let halls = view
        .halls
        .iter()
        .map(|hall| format!("📍 *{hall}*"))
        .collect::<Vec<_>>()
        .join("  |  ");

    let talks = view
        .talks
        .iter()
        .map(|talk| {
            let hall = if talk.hall.is_empty() {
                String::new()
            } else {
                format!(" _({})_", talk.hall)
            };
            let speaker = if talk.speaker.is_empty() || talk.speaker == "TBA" {
                String::new()
            } else {
                format!(" — {}", talk.speaker)
            };
            format!("*{}* {}{speaker}{hall}", talk.time, talk.title)
        })
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new("Conference schedule")
        .header("📋 Conference Schedule")
        .divider()
        .section(format!(
            "📅 *{}*\n📍 {}\n🚪 Doors open: {}\n\n{halls}",
            view.date_label, view.venue, view.doors_open
        ))
        .divider()
        .long_section(&talks)
        .context(format!(
            "Full details & latest updates at <{}|the conference site> | _Data refreshed live_ 🔄",
            view.url
        ))
        .build()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeakerRow {
    pub name: String,
    pub role: String,
    pub featured: bool,
}

pub fn speakers_message(speakers: &[SpeakerRow], url: &str) -> MessageTemplate {
    let featured = speakers
        .iter()
        .filter(|speaker| speaker.featured)
        .map(|speaker| format!("⭐ *{}* — _{}_", speaker.name, speaker.role))
        .collect::<Vec<_>>()
        .join("\n");
    let others = speakers
        .iter()
        .filter(|speaker| !speaker.featured)
        .map(|speaker| format!("• *{}* — _{}_", speaker.name, speaker.role))
        .collect::<Vec<_>>()
        .join("\n");

    let mut builder = MessageBuilder::new("Conference speakers").header("🎤 Speakers").divider();
    if !featured.is_empty() {
        builder = builder.long_section(&format!("*Featured Speakers:*\n{featured}"));
    }
    if !others.is_empty() {
        builder = builder.divider().long_section(&format!("*All Speakers:*\n{others}"));
    }
    builder
        .context(format!(
            "{} speakers confirmed. More at <{url}|the conference site> 🔄",
            speakers.len()
        ))
        .build()
}

pub fn countdown_message(
    remaining: Option<(i64, i64, i64)>,
    date_label: &str,
    url: &str,
) -> MessageTemplate {
    match remaining {
        None => MessageBuilder::new("The conference is happening right now!")
            .section("🎉 *The conference is happening RIGHT NOW!* See you there!")
            .build(),
        Some((days, hours, minutes)) => {
            MessageBuilder::new(format!("{days} days until the conference"))
                .header("⏳ Conference Countdown")
                .divider()
                .section(format!(
                    "*{days} days, {hours} hours, and {minutes} minutes* to go! 🚀\n\n📅 {date_label}\n\n<{url}|Grab your ticket before it's a 503 Service Unavailable situation 🎟️>"
                ))
                .build()
        }
    }
}

pub fn ticket_message(date_label: &str, url: &str) -> MessageTemplate {
    MessageBuilder::new("Grab your ticket!")
        .section(format!(
            "🎟️ *Grab your ticket!*\n\n📅 {date_label}\n\n<{url}|→ Register now>\n\n_Secure your spot before it returns a 503._"
        ))
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Confetti commands")
        .header("☁️ Confetti")
        .divider()
        .section(
            "*Commands:*\n\
             `/confetti schedule` — conference schedule\n\
             `/confetti speakers` — speaker lineup\n\
             `/confetti talk` — random talk suggestion\n\
             `/confetti quiz` — on-demand quiz question\n\
             `/confetti countdown` — days until the conference\n\
             `/confetti ticket` — registration link\n\
             `/confetti leaderboard` — community standings",
        )
        .build()
}

pub fn error_message(detail: &str) -> MessageTemplate {
    MessageBuilder::new("Something went wrong")
        .section(format!("⚠️ {detail}"))
        .build()
}

#[cfg(test)]
mod tests {
    use confetti_core::catalog::{PollContent, PollOption, QuizContent};

    use super::{
        leaderboard_message, quiz_message, quiz_reveal_message, split_chunks, weekly_wrap_message,
        Block, LeaderboardRow, MessageBuilder, WeeklyWrapView,
    };

    fn quiz() -> QuizContent {
        QuizContent {
            question: "Which port does HTTPS use?".to_owned(),
            options: vec!["80".to_owned(), "443".to_owned(), "22".to_owned()],
            answer: 1,
            explanation: Some("TLS rides on 443 by convention.".to_owned()),
        }
    }

    #[test]
    fn quiz_message_lists_lettered_options() {
        let message = quiz_message(&quiz());

        let sections: Vec<String> = message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text: super::TextObject::Mrkdwn { text } } => Some(text.clone()),
                _ => None,
            })
            .collect();

        assert!(sections.iter().any(|text| text.contains("🅱️  443")));
        assert!(message.fallback_text.contains("Which port does HTTPS use?"));
    }

    #[test]
    fn quiz_reveal_names_the_correct_option() {
        let message = quiz_reveal_message(&quiz());
        assert_eq!(message.fallback_text, "Answer: 443");

        let rendered = serde_json::to_string(&message.blocks).expect("serialize blocks");
        assert!(rendered.contains("Time's up!"));
        assert!(rendered.contains("TLS rides on 443 by convention."));
    }

    #[test]
    fn poll_message_uses_option_emojis() {
        let message = super::poll_message(&PollContent {
            question: "Favorite deploy day?".to_owned(),
            options: vec![
                PollOption { emoji: "🔥".to_owned(), text: "Friday".to_owned() },
                PollOption { emoji: "🧘".to_owned(), text: "Tuesday".to_owned() },
            ],
        });

        let rendered = serde_json::to_string(&message.blocks).expect("serialize");
        assert!(rendered.contains("🔥  Friday"));
    }

    #[test]
    fn weekly_wrap_handles_a_quiet_week() {
        let message = weekly_wrap_message(&WeeklyWrapView {
            total_interactions: 0,
            top_contributors: Vec::new(),
        });

        let rendered = serde_json::to_string(&message.blocks).expect("serialize");
        assert!(rendered.contains("Quiet week"));
    }

    #[test]
    fn leaderboard_awards_medals_to_the_top_three() {
        let rows: Vec<LeaderboardRow> = (0..4)
            .map(|index| LeaderboardRow {
                user_id: format!("U{index}"),
                score: 40 - index as u64,
                badges: Vec::new(),
            })
            .collect();

        let rendered =
            serde_json::to_string(&leaderboard_message(&rows).blocks).expect("serialize");
        assert!(rendered.contains("🥇 <@U0>"));
        assert!(rendered.contains("🥈 <@U1>"));
        assert!(rendered.contains("🥉 <@U2>"));
        assert!(rendered.contains("4. <@U3>"));
    }

    #[test]
    fn split_chunks_breaks_at_newlines() {
        let text = (0..100).map(|index| format!("line {index}")).collect::<Vec<_>>().join("\n");
        let chunks = split_chunks(&text, 100);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.len() <= 100));
        assert_eq!(chunks.join("\n"), text, "splitting loses no content");
    }

    #[test]
    fn header_serializes_as_plain_text_object() {
        let message = MessageBuilder::new("fallback").header("🔥 Hot Take Tuesday").build();
        let rendered = serde_json::to_value(&message.blocks).expect("serialize");

        assert_eq!(rendered[0]["type"], "header");
        assert_eq!(rendered[0]["text"]["type"], "plain_text");
        assert_eq!(rendered[0]["text"]["text"], "🔥 Hot Take Tuesday");
    }
}
