//! Prompt construction
//!
//! The formatting grammar and edge-case rules live in static tables below and
//! are rendered by [`build_prompt`]. Output is a pure function of its input.

use daybook_store::TimelineEntry;

use crate::timeline::ClockTime;

/// System instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a JSON-only response agent. Always output valid JSON in the exact format requested. Do not include any explanation, thinking, or markdown formatting outside the JSON. Start your response directly with { and end with }.";

const MISSING_CONTAINER: &str = "N/A";
const UNKNOWN_END: &str = "(unknown)";

struct Rule {
    title: &'static str,
    lines: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        title: "Target format",
        lines: &[
            "Every entry becomes `HH:MM - HH:MM (**<duration>**) - <activity>`.",
            "Times are two-digit 24-hour clock values, e.g. `07:05`, `21:30`.",
            "Duration below 60 minutes is written `N'`, e.g. `(**45'**)`.",
            "Duration of 60 minutes or more is written `HhMM'` with two-digit minutes, e.g. `(**1h05'**)`, `(**2h00'**)`.",
            "Duration is end minus start; when end is earlier than start the range crosses midnight and 24h is added.",
            "Keep the activity text as written; only normalize times, durations and brackets.",
        ],
    },
    Rule {
        title: "Strict time order",
        lines: &[
            "Within a day, each entry starts at or after the end of the entry before it.",
            "Today's first entry starts at or after yesterday's last end time.",
            "When an entry only has a start time, it ends where the next entry starts.",
            "Order today's entries by time; recreate entries that are out of place rather than leaving gaps in the order.",
        ],
    },
    Rule {
        title: "No day mixing",
        lines: &[
            "Actions under `yesterday` may only use uids listed under YESTERDAY.",
            "Actions under `today` may only use uids listed under TODAY.",
            "Never update a block with text that belongs to the other day; delete it and create the text under the right day instead.",
        ],
    },
    Rule {
        title: "Overnight splitting",
        lines: &[
            "An activity that spans midnight (for example sleep from 23:30 to 07:00) is split in two.",
            "The part before midnight ends at `00:00` and goes under `yesterday`.",
            "The part after midnight starts at `00:00` and goes under `today`.",
            "If yesterday has no container (N/A), keep only today's part.",
        ],
    },
    Rule {
        title: "Time conversion",
        lines: &[
            "Decimal hours become clock times: `9.5` is `09:30`, `14.25` is `14:15`, `7.75` is `07:45`.",
            "Natural-language times become clock times: `早上8点半` is `08:30`, `下午3点` is `15:00`, `晚上10点一刻` is `22:15`, `half past nine pm` is `21:30`.",
            "Without a morning/evening marker, choose the reading that keeps the timeline in order.",
        ],
    },
    Rule {
        title: "Brackets",
        lines: &[
            "Input may use ASCII `( )` or full-width `（ ）` brackets around durations; both are recognized.",
            "Output uses ASCII brackets only: `(**45'**)`, never `（**45'**）`.",
        ],
    },
    Rule {
        title: "Choosing actions",
        lines: &[
            "`update`: rewrite an existing entry in place, keeping its uid. Prefer this over delete + create.",
            "`delete`: remove an entry that is a duplicate or has been merged into another entry.",
            "`create`: add a new entry (for example the second half of an overnight split). It is appended to the end of that day's Timeline.",
            "Entries that are already correct and in order need no action.",
            "Every `update` and `delete` uid must come from the lists below.",
        ],
    },
];

const OUTPUT_SCHEMA: &str = r#"{
  "yesterday": [
    {"type": "update", "uid": "<uid>", "string": "HH:MM - HH:MM (**<duration>**) - <activity>"},
    {"type": "delete", "uid": "<uid>"},
    {"type": "create", "string": "HH:MM - HH:MM (**<duration>**) - <activity>"}
  ],
  "today": [
    {"type": "update", "uid": "<uid>", "string": "HH:MM - HH:MM (**<duration>**) - <activity>"},
    {"type": "delete", "uid": "<uid>"},
    {"type": "create", "string": "HH:MM - HH:MM (**<duration>**) - <activity>"}
  ]
}"#;

/// Everything the prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub yesterday_title: &'a str,
    pub today_title: &'a str,
    pub yesterday_container: Option<&'a str>,
    pub today_container: &'a str,
    pub yesterday_entries: &'a [TimelineEntry],
    pub today_entries: &'a [TimelineEntry],
    /// End time of yesterday's last timed entry.
    pub yesterday_last_end: Option<ClockTime>,
}

/// Render the user instruction for one reconciliation run.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let yesterday_entries = render_entries(input.yesterday_entries, "(No yesterday entries)");
    let today_entries = render_entries(input.today_entries, "(No today entries)");
    let yesterday_container = input.yesterday_container.unwrap_or(MISSING_CONTAINER);
    let last_end = input
        .yesterday_last_end
        .as_ref()
        .map_or_else(|| UNKNOWN_END.to_string(), ToString::to_string);
    let rules = render_rules();

    format!(
        r#"Reformat a two-day journal timeline into strictly ordered, duration-annotated entries and return the edits as JSON.

## Day boundary

Yesterday's last end time: {last_end}

## YESTERDAY: {yesterday_title} (Timeline uid: {yesterday_container})

{yesterday_entries}

## TODAY: {today_title} (Timeline uid: {today_container})

{today_entries}

## Rules

{rules}
## Output

Return one JSON object with exactly these keys. Either list may be empty.

{OUTPUT_SCHEMA}
"#,
        yesterday_title = input.yesterday_title,
        today_title = input.today_title,
        today_container = input.today_container,
    )
}

fn render_entries(entries: &[TimelineEntry], empty_label: &str) -> String {
    if entries.is_empty() {
        return empty_label.to_string();
    }
    entries
        .iter()
        .map(|entry| format!("- [{}] {}", entry.uid, entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_rules() -> String {
    let mut out = String::new();
    for (index, rule) in RULES.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, rule.title));
        for line in rule.lines {
            out.push_str(&format!("   - {line}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> (Vec<TimelineEntry>, Vec<TimelineEntry>) {
        (
            vec![TimelineEntry::new("y1", "22:00 - 23:30 看书", 0)],
            vec![
                TimelineEntry::new("t1", "9.5 起床", 0),
                TimelineEntry::new("t2", "10:00 - 11:00 （**1h00'**） - 写代码", 1),
            ],
        )
    }

    #[test]
    fn test_prompt_embeds_entries_in_order() {
        let (yesterday, today) = entries();
        let prompt = build_prompt(&PromptInput {
            yesterday_title: "January 16th, 2026",
            today_title: "January 17th, 2026",
            yesterday_container: Some("ycont"),
            today_container: "tcont",
            yesterday_entries: &yesterday,
            today_entries: &today,
            yesterday_last_end: ClockTime::new(23, 30),
        });

        assert!(prompt.contains("- [y1] 22:00 - 23:30 看书"));
        let first = prompt.find("- [t1] 9.5 起床").unwrap();
        let second = prompt.find("- [t2] 10:00 - 11:00 （**1h00'**） - 写代码").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Timeline uid: ycont"));
        assert!(prompt.contains("Timeline uid: tcont"));
        assert!(prompt.contains("Yesterday's last end time: 23:30"));
        assert!(prompt.contains("January 16th, 2026"));
    }

    #[test]
    fn test_prompt_placeholders_for_missing_yesterday() {
        let (_, today) = entries();
        let prompt = build_prompt(&PromptInput {
            yesterday_title: "January 16th, 2026",
            today_title: "January 17th, 2026",
            yesterday_container: None,
            today_container: "tcont",
            yesterday_entries: &[],
            today_entries: &today,
            yesterday_last_end: None,
        });

        assert!(prompt.contains("Timeline uid: N/A"));
        assert!(prompt.contains("(No yesterday entries)"));
        assert!(prompt.contains("Yesterday's last end time: (unknown)"));
        assert!(!prompt.contains("(No today entries)"));
    }

    #[test]
    fn test_prompt_carries_schema_and_rules() {
        let prompt = build_prompt(&PromptInput {
            yesterday_title: "a",
            today_title: "b",
            yesterday_container: None,
            today_container: "tcont",
            yesterday_entries: &[],
            today_entries: &[],
            yesterday_last_end: None,
        });

        assert!(prompt.contains("\"yesterday\": ["));
        assert!(prompt.contains("\"today\": ["));
        assert!(prompt.contains("(No today entries)"));
        for rule in RULES {
            assert!(prompt.contains(rule.title), "missing rule {}", rule.title);
            for line in rule.lines {
                assert!(prompt.contains(line));
            }
        }
        assert!(prompt.contains("（**45'**）"));
        assert!(prompt.contains("1h05'"));
    }

    #[test]
    fn test_target_format_separates_activity_with_dash() {
        let prompt = build_prompt(&PromptInput {
            yesterday_title: "a",
            today_title: "b",
            yesterday_container: None,
            today_container: "tcont",
            yesterday_entries: &[],
            today_entries: &[],
            yesterday_last_end: None,
        });

        let target = prompt
            .lines()
            .find(|line| line.contains("Every entry becomes"))
            .unwrap();
        assert!(target.contains("`HH:MM - HH:MM (**<duration>**) - <activity>`"));
        assert!(!OUTPUT_SCHEMA.contains("**) <"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let (yesterday, today) = entries();
        let input = PromptInput {
            yesterday_title: "a",
            today_title: "b",
            yesterday_container: Some("ycont"),
            today_container: "tcont",
            yesterday_entries: &yesterday,
            today_entries: &today,
            yesterday_last_end: None,
        };
        assert_eq!(build_prompt(&input), build_prompt(&input));
    }
}
