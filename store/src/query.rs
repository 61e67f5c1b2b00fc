//! Datalog query text for the lookups the extractor needs.

/// Escape a value for use inside a double-quoted Datalog string literal.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out
}

/// `[[uid]]` rows for the page titled `title`.
pub fn page_uid_by_title(title: &str) -> String {
    format!(
        r#"[:find ?uid :where [?p :node/title ?title] [?p :block/uid ?uid] [(= ?title "{}")]]"#,
        escape(title)
    )
}

/// `[[uid, string]]` rows for direct children of `parent_uid` whose text
/// contains `needle`.
pub fn children_containing(parent_uid: &str, needle: &str) -> String {
    format!(
        r#"[:find ?uid ?str :where
          [?b :block/uid "{}"]
          [?b :block/children ?c]
          [?c :block/uid ?uid]
          [?c :block/string ?str]
          [(clojure.string/includes? ?str "{}")]]"#,
        escape(parent_uid),
        escape(needle)
    )
}

/// `[[{uid, string, order}]]` pull rows for direct children of `parent_uid`.
pub fn children_of(parent_uid: &str) -> String {
    format!(
        r#"[:find (pull ?child [:block/uid :block/string :block/order]) :where
          [?b :block/uid "{}"]
          [?b :block/children ?child]]"#,
        escape(parent_uid)
    )
}
