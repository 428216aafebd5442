//! Groups the flat word list of a finished transcription into speaker phrases.

use speech_ai::Word;

/// Consecutive words of one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Start of the first word, formatted as `[HH:MM:SS.mmm]`
    pub start: String,
    pub start_ms: i64,
    pub speaker: Option<String>,
    pub text: String,
}

/// Lazily yields the phrases of `words`. Calling it again restarts from the first word.
pub fn segment(words: &[Word]) -> Phrases<'_> {
    Phrases { words, position: 0 }
}

/// Iterator over the phrases of a word slice, see [`segment`].
///
/// Words whose text is blank are skipped: they neither start a phrase nor
/// leave separators behind.
#[derive(Debug, Clone)]
pub struct Phrases<'a> {
    words: &'a [Word],
    position: usize,
}

impl Iterator for Phrases<'_> {
    type Item = Phrase;

    fn next(&mut self) -> Option<Phrase> {
        let remaining = &self.words[self.position..];
        let first_offset = remaining.iter().position(|w| !w.text.trim().is_empty())?;
        let first = &remaining[first_offset];

        let mut text = first.text.trim().to_owned();
        let mut consumed = first_offset + 1;

        for word in &remaining[consumed..] {
            let word_text = word.text.trim();
            if word_text.is_empty() {
                consumed += 1;
                continue;
            }
            if word.speaker != first.speaker {
                break;
            }
            text.push(' ');
            text.push_str(word_text);
            consumed += 1;
        }

        self.position += consumed;

        Some(Phrase {
            start: format_start_time(first.start_ms),
            start_ms: first.start_ms,
            speaker: first.speaker.clone(),
            text,
        })
    }
}

/// Formats a millisecond offset as `[HH:MM:SS.mmm]`. Negative offsets clamp to zero.
pub fn format_start_time(start_ms: i64) -> String {
    let total_ms = start_ms.max(0);
    let millis = total_ms % 1000;
    let total_seconds = total_ms / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    format!("[{hours:02}:{minutes:02}:{seconds:02}.{millis:03}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(entries: &[(&str, i64, &str)]) -> Vec<Word> {
        entries.iter()
            .map(|(text, start, speaker)| Word::new(*text, *start, *speaker))
            .collect()
    }

    #[test]
    fn groups_consecutive_words_of_the_same_speaker() {
        let words = words(&[("hi", 0, "A"), ("there", 500, "A"), ("bye", 1000, "B")]);

        let phrases: Vec<Phrase> = segment(&words).collect();

        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].text, "hi there");
        assert_eq!(phrases[0].speaker.as_deref(), Some("A"));
        assert_eq!(phrases[0].start, "[00:00:00.000]");
        assert_eq!(phrases[1].text, "bye");
        assert_eq!(phrases[1].speaker.as_deref(), Some("B"));
        assert_eq!(phrases[1].start, "[00:00:01.000]");
    }

    #[test]
    fn a_returning_speaker_starts_a_new_phrase() {
        let words = words(&[("one", 0, "A"), ("two", 10, "B"), ("three", 20, "A")]);

        let texts: Vec<String> = segment(&words).map(|p| p.text).collect();

        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn empty_input_has_no_phrases() {
        assert_eq!(segment(&[]).count(), 0);
        assert_eq!(segment(&words(&[("", 0, "A"), ("  ", 5, "B")])).count(), 0);
    }

    #[test]
    fn blank_words_leave_no_double_spaces() {
        let words = words(&[("a", 0, "A"), ("", 1, "A"), (" ", 2, "B"), ("b", 3, "A")]);

        let phrases: Vec<Phrase> = segment(&words).collect();

        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].text, "a b");
    }

    #[test]
    fn phrases_reproduce_the_non_empty_words() {
        let words = words(&[
            ("so", 0, "A"),
            ("", 100, "A"),
            ("what", 200, "B"),
            ("now", 300, "B"),
            ("well", 400, "A"),
            ("  ", 500, "C"),
            ("ok", 600, "C"),
        ]);

        let phrases: Vec<Phrase> = segment(&words).collect();
        let joined = phrases
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let expected = words
            .iter()
            .map(|w| w.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        assert!(phrases.len() <= words.len());
        assert_eq!(joined, expected);
    }

    #[test]
    fn segmenting_can_be_restarted() {
        let words = words(&[("hi", 0, "A"), ("bye", 1000, "B")]);
        let phrases = segment(&words);

        let first: Vec<Phrase> = phrases.clone().collect();
        let second: Vec<Phrase> = phrases.collect();

        assert_eq!(first, second);
    }

    #[test]
    fn start_time_is_fixed_width() {
        assert_eq!(format_start_time(0), "[00:00:00.000]");
        assert_eq!(format_start_time(61_005), "[00:01:01.005]");
        assert_eq!(format_start_time(3_723_450), "[01:02:03.450]");
        assert_eq!(format_start_time(-20), "[00:00:00.000]");
    }
}
