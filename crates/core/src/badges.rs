use serde::{Deserialize, Serialize};

/// Leaderboard counter a badge threshold is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    QuizCorrect,
    HotTakeReactions,
    MessagesCount,
}

/// A badge and the counter threshold that awards it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadgeRule {
    pub badge: &'static str,
    pub field: CounterField,
    pub minimum: u64,
}

/// The fixed award table. A badge, once earned, is never removed; the
/// tracker re-checks the table after every counter update and only adds
/// badges not yet present.
pub const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule { badge: "Quiz Master 🧠", field: CounterField::QuizCorrect, minimum: 3 },
    BadgeRule { badge: "Hot Take Artist 🔥", field: CounterField::HotTakeReactions, minimum: 10 },
    BadgeRule { badge: "Community MVP 🏆", field: CounterField::MessagesCount, minimum: 50 },
];

/// Badges earned for a counter snapshot, in rule-table order.
pub fn earned_badges(
    quiz_correct: u64,
    hot_take_reactions: u64,
    messages_count: u64,
) -> impl Iterator<Item = &'static str> {
    BADGE_RULES.iter().filter_map(move |rule| {
        let value = match rule.field {
            CounterField::QuizCorrect => quiz_correct,
            CounterField::HotTakeReactions => hot_take_reactions,
            CounterField::MessagesCount => messages_count,
        };
        (value >= rule.minimum).then_some(rule.badge)
    })
}

#[cfg(test)]
mod tests {
    use super::earned_badges;

    #[test]
    fn no_badges_below_every_threshold() {
        assert_eq!(earned_badges(2, 9, 49).count(), 0);
    }

    #[test]
    fn each_threshold_awards_its_badge() {
        let badges: Vec<_> = earned_badges(3, 0, 0).collect();
        assert_eq!(badges, vec!["Quiz Master 🧠"]);

        let badges: Vec<_> = earned_badges(0, 10, 0).collect();
        assert_eq!(badges, vec!["Hot Take Artist 🔥"]);

        let badges: Vec<_> = earned_badges(0, 0, 50).collect();
        assert_eq!(badges, vec!["Community MVP 🏆"]);
    }

    #[test]
    fn thresholds_compose() {
        let badges: Vec<_> = earned_badges(5, 11, 200).collect();
        assert_eq!(badges, vec!["Quiz Master 🧠", "Hot Take Artist 🔥", "Community MVP 🏆"]);
    }
}
