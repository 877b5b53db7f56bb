//! Message Variator - humanized renderings of a message template
//!
//! A stylistic scrambler, not a parser: output is intentionally
//! non-deterministic. Reduces exact-duplicate fingerprints across sends by
//! shuffling lines, swapping pictographs, and nudging whitespace and
//! punctuation.

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

/// Produces humanized variations of message text
pub struct MessageVariator {
    emoji_sets: Vec<Vec<&'static str>>,
    shuffle_lines: bool,
    random_spacing: bool,
    emoji_pattern: Regex,
}

impl Default for MessageVariator {
    fn default() -> Self {
        Self {
            emoji_sets: vec![
                vec!["\u{1F525}", "\u{2728}", "\u{1F680}"],
                vec!["\u{1F4A5}", "\u{26A1}", "\u{1F31F}"],
                vec!["\u{1F4E2}", "\u{1F6D2}", "\u{1F4B0}"],
                vec!["\u{1F514}", "\u{1F4CC}", "\u{1F449}"],
            ],
            shuffle_lines: true,
            random_spacing: true,
            emoji_pattern: Regex::new(
                "[\u{1F300}-\u{1F5FF}\u{1F600}-\u{1F64F}\u{1F680}-\u{1F6FF}\u{1F900}-\u{1F9FF}\u{1FA00}-\u{1FAFF}\u{2600}-\u{27BF}]",
            )
            .expect("emoji pattern is valid"),
        }
    }
}

impl MessageVariator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable line shuffling (keeps line order stable)
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_lines = shuffle;
        self
    }

    /// Disable whitespace nudging
    pub fn with_spacing(mut self, spacing: bool) -> Self {
        self.random_spacing = spacing;
        self
    }

    /// Produce one humanized rendering of `text`.
    ///
    /// Returns the input unchanged about one time in five to avoid
    /// over-varying.
    pub fn vary(&self, text: &str) -> String {
        if rand::thread_rng().gen::<f64>() < 0.2 {
            return text.to_string();
        }

        let mut lines: Vec<String> = text
            .split('\n')
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if self.shuffle_lines && lines.len() > 1 {
            lines.shuffle(&mut rand::thread_rng());
        }

        let varied: Vec<String> = lines.iter().map(|l| self.vary_line(l)).collect();

        varied.join("\n").trim().to_string()
    }

    fn vary_line(&self, line: &str) -> String {
        let line = self.swap_emojis(line);
        let line = self.randomize_spacing(&line);
        let line = self.soft_punctuation(&line);
        line.trim().to_string()
    }

    /// Replace each pictograph with a random pick from the palettes
    fn swap_emojis(&self, text: &str) -> String {
        let mut rng = rand::thread_rng();
        self.emoji_pattern
            .replace_all(text, |_: &regex::Captures| {
                let set = self
                    .emoji_sets
                    .choose(&mut rng)
                    .expect("palettes are non-empty");
                *set.choose(&mut rng).expect("palette has entries")
            })
            .into_owned()
    }

    /// Collapse repeated whitespace, then occasionally widen one gap
    fn randomize_spacing(&self, text: &str) -> String {
        if !self.random_spacing {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last_was_space = false;
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                }
                last_was_space = true;
            } else {
                out.push(c);
                last_was_space = false;
            }
        }

        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < 0.3 {
            out = out.replacen(' ', "  ", 1);
        }
        if rng.gen::<f64>() < 0.2 {
            out = out.replacen('!', "!!", 1);
        }

        out
    }

    /// Light punctuation changes
    fn soft_punctuation(&self, text: &str) -> String {
        let mut out = text.to_string();
        let mut rng = rand::thread_rng();

        let replacements: [(&str, &[&str]); 2] = [("!", &["!", "!!"]), (".", &[".", "..."])];

        for (needle, variants) in replacements {
            if out.contains(needle) && rng.gen::<f64>() < 0.3 {
                let variant = variants.choose(&mut rng).expect("variants are non-empty");
                out = out.replacen(needle, variant, 1);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = "Big sale today \u{1F525}\nUp to 50% off.\nJoin now!";

    #[test]
    fn non_empty_input_stays_non_empty() {
        let variator = MessageVariator::new();
        for _ in 0..50 {
            let out = variator.vary(TEMPLATE);
            assert!(!out.is_empty());
        }
    }

    #[test]
    fn never_invents_line_breaks() {
        let variator = MessageVariator::new();
        let input_lines = TEMPLATE.lines().count();
        for _ in 0..50 {
            let out = variator.vary(TEMPLATE);
            assert!(out.lines().count() <= input_lines);
        }
    }

    #[test]
    fn word_characters_keep_their_order_without_shuffle() {
        let variator = MessageVariator::new().with_shuffle(false);

        let letters = |s: &str| -> String { s.chars().filter(|c| c.is_alphanumeric()).collect() };
        let expected = letters(TEMPLATE);

        // Only whitespace, punctuation, and pictographs may change
        for _ in 0..50 {
            let out = variator.vary(TEMPLATE);
            assert_eq!(letters(&out), expected);
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        let variator = MessageVariator::new();
        assert_eq!(variator.vary(""), "");
    }

    #[test]
    fn output_varies_across_calls() {
        let variator = MessageVariator::new();
        let outputs: std::collections::HashSet<String> =
            (0..100).map(|_| variator.vary(TEMPLATE)).collect();
        // Non-determinism is the point; 100 draws collapse to one rendering
        // only with vanishing probability
        assert!(outputs.len() > 1);
    }
}
