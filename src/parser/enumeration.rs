use regex::{Captures, Regex};
use std::sync::LazyLock;

/// 标号后紧跟的字符需要满足的条件，避免把 "3.5"、"e.g." 之类当成标号
#[derive(Clone, Copy)]
enum Guard {
    None,
    /// 分隔符后不能直接跟数字（小数）
    Digit,
    /// '.' 或 '-' 后不能直接跟字母数字（缩写、连字符词）
    Word,
}

struct LeadingLabel {
    pattern: Regex,
    guard: Guard,
}

static LABELS: LazyLock<Vec<LeadingLabel>> = LazyLock::new(|| {
    let label = |pattern: &str, guard: Guard| LeadingLabel {
        pattern: Regex::new(pattern).expect("leading label pattern"),
        guard,
    };
    vec![
        // Q1. / Question 12: / Q#3)
        label(r"(?i)^\s*q(?:uestion)?\s*[:.\-#]?\s*\d+\s*[:.)\-]*(?P<ws>\s*)", Guard::None),
        // Que. No. 5: / Q.No. 5 / Qu no 5
        label(r"(?i)^\s*q(?:ue?)?\s*\.?\s*no\s*\.?\s*\d+\s*[:.)\-]*(?P<ws>\s*)", Guard::None),
        // Qn 4 / Qn-4.
        label(r"(?i)^\s*qn?\s*[\-:.#]?\s*\d+\s*[:.)\-]*(?P<ws>\s*)", Guard::None),
        // 12. / (3) / 4)
        label(r"^\s*\(?\d{1,3}\)?\s*(?P<sep>[.):\-])(?P<ws>\s*)", Guard::Digit),
        // a) / (B). / c-
        label(r"^\s*\(?[a-zA-Z]\)?\s*(?P<sep>[.):\-])(?P<ws>\s*)", Guard::Word),
        // (iv) / XII.
        label(r"(?i)^\s*\(?[ivxlcdm]{1,7}\)?\s*(?P<sep>[.):\-])(?P<ws>\s*)", Guard::Word),
        // • / - / – / —
        label(r"^\s*[•\-\x{2013}\x{2014}]\s+", Guard::None),
    ]
});

impl LeadingLabel {
    /// 返回标号结束位置；不匹配或被 guard 否决时返回 None
    fn match_end(&self, line: &str) -> Option<usize> {
        let caps = self.pattern.captures(line)?;
        let end = caps.get(0)?.end();
        if self.rejected(&caps, &line[end..]) {
            return None;
        }
        Some(end)
    }

    fn rejected(&self, caps: &Captures<'_>, rest: &str) -> bool {
        let spaced = caps.name("ws").is_some_and(|ws| !ws.as_str().is_empty());
        if spaced {
            return false;
        }
        let Some(next) = rest.chars().next() else {
            return false;
        };
        match self.guard {
            Guard::None => false,
            Guard::Digit => next.is_ascii_digit(),
            Guard::Word => {
                let sep = caps.name("sep").map(|m| m.as_str()).unwrap_or_default();
                (sep == "." || sep == "-") && next.is_alphanumeric()
            }
        }
    }
}

/// 去掉行首的题号/选项标号/项目符号
///
/// 按固定顺序找第一个匹配的行首标号并去掉；若剩余部分仍以标号开头
/// （如 "Q1. (a) ..."）则继续，直到没有标号为止，因此结果再次 strip 不会变化。
pub fn strip(line: &str) -> String {
    let mut current = line.trim();
    loop {
        let stripped = LABELS
            .iter()
            .find_map(|label| label.match_end(current))
            .map(|end| current[end..].trim());

        match stripped {
            Some(rest) if rest.len() < current.len() => current = rest,
            _ => return current.to_string(),
        }
    }
}
