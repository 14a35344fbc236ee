use once_cell::sync::Lazy;
use regex::Regex;

/// Which markup construct made a payload look like markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupSignal {
    Heading,
    BulletList,
    OrderedList,
    Blockquote,
    Code,
    Emphasis,
}

// Line-start patterns require content after the marker so that prose such as
// "-5 degrees" or "2.5 million" stays plain text.
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S").expect("valid heading pattern"));
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[*-][ \t]+\S").expect("valid bullet pattern"));
static ORDERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+\S").expect("valid ordered pattern"));
static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*>").expect("valid blockquote pattern"));
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*`").expect("valid code pattern"));
static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*\S|__\S").expect("valid emphasis pattern"));

static SIGNALS: Lazy<[(MarkupSignal, &'static Regex); 6]> = Lazy::new(|| {
    [
        (MarkupSignal::Heading, &*HEADING_RE),
        (MarkupSignal::BulletList, &*BULLET_RE),
        (MarkupSignal::OrderedList, &*ORDERED_RE),
        (MarkupSignal::Blockquote, &*BLOCKQUOTE_RE),
        (MarkupSignal::Code, &*CODE_RE),
        (MarkupSignal::Emphasis, &*EMPHASIS_RE),
    ]
});

/// The first markup construct found in `text`, checked in a fixed order.
pub fn classify(text: &str) -> Option<MarkupSignal> {
    SIGNALS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(signal, _)| *signal)
}

pub fn looks_like_markup(text: &str) -> bool {
    classify(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_line_start_constructs() {
        assert_eq!(classify("# Hello"), Some(MarkupSignal::Heading));
        assert_eq!(classify("intro\n- one\n- two"), Some(MarkupSignal::BulletList));
        assert_eq!(classify("1. first"), Some(MarkupSignal::OrderedList));
        assert_eq!(classify("> quoted"), Some(MarkupSignal::Blockquote));
        assert_eq!(classify("```\nfn main() {}\n```"), Some(MarkupSignal::Code));
    }

    #[test]
    fn detects_emphasis_anywhere() {
        assert_eq!(classify("this is **bold** text"), Some(MarkupSignal::Emphasis));
        assert_eq!(classify("snake __init__ call"), Some(MarkupSignal::Emphasis));
    }

    #[test]
    fn prose_stays_plain() {
        assert!(!looks_like_markup("plain sentence."));
        assert!(!looks_like_markup("-5 degrees outside"));
        assert!(!looks_like_markup("#hashtag"));
        assert!(!looks_like_markup("2.5 million people"));
        assert!(!looks_like_markup("a * b = c"));
    }
}
