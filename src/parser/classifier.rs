use regex::Regex;
use std::sync::LazyLock;

// Q1 / Question: / Q. / Que. No. 5 / (12) / 12. ; "3.5" 这类小数不算题号
static QUESTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:q(?:uestion|n)?\s*(?:[:.#\-]|\d)|que?\.?\s*no\.?\s*\d|\(\d{1,3}\)|\d{1,3}\s*[.)](?:$|[^0-9]))",
    )
    .expect("question marker pattern")
});

static INSTRUCTION_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:what|which|when|where|why|how|explain|define|calculate|find|determine|state|solve|write|prove|show|discuss|differentiate|evaluate|program|integrate|mention|draw|give|example|compare|convert|display|predict)\b",
    )
    .expect("instruction verb pattern")
});

static SERIAL_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:q(?:uestion|n)?(?:\b|\d)|\(?\d{1,3}\)?\s*[.)])").expect("serial label pattern")
});

static LETTER_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[(\[]?\s*[A-Za-z]\s*[)\].:\-]{1,2}\s+\S").expect("letter option pattern")
});

static ROMAN_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[(\[]?\s*[ivxlcdm]{1,7}\s*[)\].:\-]{1,2}\s+\S").expect("roman option pattern")
});

static BULLET_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[•\-\x{2013}\x{2014}]\s+\S").expect("bullet option pattern")
});

/// 判断一行文本是否像一道新题的开头
pub fn is_question_opener(line: &str) -> bool {
    let t = line.trim();
    if t.is_empty() {
        return false;
    }
    if t.ends_with('?') {
        return true;
    }
    if QUESTION_MARKER.is_match(t) || INSTRUCTION_VERB.is_match(t) {
        return true;
    }
    let lower = t.to_lowercase();
    lower.contains("prove that") || lower.contains("show that")
}

/// 判断一行文本是否像当前题目的选项/小问
///
/// 带题号且以 '?' 结尾的行本身就是新题，永远不算选项。
pub fn is_option_line(line: &str) -> bool {
    let s = line.trim();
    if s.is_empty() {
        return false;
    }
    if SERIAL_LABEL.is_match(s) && s.ends_with('?') {
        return false;
    }
    LETTER_OPTION.is_match(s) || ROMAN_OPTION.is_match(s) || BULLET_OPTION.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trailing_question_mark_opens() {
        assert!(is_question_opener("What is gravity?"));
        assert!(is_question_opener("  the value of g is ?  "));
    }

    #[test]
    fn question_markers_open() {
        assert!(is_question_opener("Q1 Define power"));
        assert!(is_question_opener("Question: name the unit of force"));
        assert!(is_question_opener("Q.No. 5: entropy"));
        assert!(is_question_opener("(12) the area of a circle"));
        assert!(is_question_opener("12. the area of a circle"));
        assert!(is_question_opener("3) the area of a circle"));
    }

    #[test]
    fn instruction_verbs_open() {
        assert!(is_question_opener("Explain Newton's laws."));
        assert!(is_question_opener("calculate the work done"));
        assert!(is_question_opener("DIFFERENTIATE between speed and velocity"));
    }

    #[test]
    fn prove_and_show_phrases_open() {
        assert!(is_question_opener("Hence prove that the sum is constant"));
        assert!(is_question_opener("Using the result, show that x = 2"));
    }

    #[test]
    fn ambient_text_does_not_open() {
        assert!(!is_question_opener(""));
        assert!(!is_question_opener("   "));
        assert!(!is_question_opener("Previous year papers"));
        assert!(!is_question_opener("quite a long paragraph"));
        assert!(!is_question_opener("3.5 marks each"));
        assert!(!is_question_opener("Whatever happens next"));
        assert!(!is_question_opener("a) A force"));
    }

    #[test]
    fn option_labels_are_recognised() {
        assert!(is_option_line("a) A force"));
        assert!(is_option_line("(B). Ten newtons"));
        assert!(is_option_line("c- none of these"));
        assert!(is_option_line("[d] all of these"));
        assert!(is_option_line("(iii) derive the formula"));
        assert!(is_option_line("IV. Conclusion"));
        assert!(is_option_line("• a bulleted part"));
        assert!(is_option_line("\u{2013} an en-dash part"));
    }

    #[test]
    fn non_options_are_rejected() {
        assert!(!is_option_line(""));
        assert!(!is_option_line("A force"));
        assert!(!is_option_line("a)"));
        assert!(!is_option_line("-dash without space"));
        assert!(!is_option_line("Advertisement"));
    }

    #[test]
    fn labelled_question_lines_are_never_options() {
        let stems = [
            "Q2. (a) Which is heavier?",
            "Question - a) Which is heavier?",
            "1) a) which one?",
            "(4) b) which one?",
        ];
        for stem in stems {
            assert!(is_question_opener(stem), "{:?} should open", stem);
            assert!(!is_option_line(stem), "{:?} must not be an option", stem);
        }
    }

    #[test]
    fn predicates_are_independent() {
        // a line may satisfy both; the walker gives precedence to the opener
        assert!(is_question_opener("a) Which of these is a vector?"));
        assert!(is_option_line("a) Which of these is a vector?"));
    }

    #[test]
    fn generated_labelled_questions_are_openers_not_options() {
        let label = prop_oneof![
            (1u32..1000).prop_map(|n| format!("Q{}. ", n)),
            (1u32..1000).prop_map(|n| format!("Question {}: ", n)),
            (1u32..1000).prop_map(|n| format!("{}. ", n)),
            (1u32..1000).prop_map(|n| format!("({}) ", n)),
            (1u32..1000).prop_map(|n| format!("{}) ", n)),
        ];
        proptest!(|(prefix in label, text in "[A-Za-z(). ]{0,40}")| {
            let line = format!("{}{}?", prefix, text);
            prop_assert!(is_question_opener(&line));
            prop_assert!(!is_option_line(&line), "{:?} classified as option", line);
        });
    }
}
