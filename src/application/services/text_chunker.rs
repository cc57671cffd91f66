pub trait TextSplitter {
    fn split_text(&self, text: &str, max_chunk_size: usize) -> Vec<String>;
}

/// A chunk before it is embedded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub chunk_index: i32,
    pub content: String,
    pub page_number: Option<i32>,
}

/// Packs whole sentences into chunks of at most `max_chunk_size` characters.
#[derive(Debug, Clone, Default)]
pub struct SentenceChunker;

impl TextSplitter for SentenceChunker {
    fn split_text(&self, text: &str, max_chunk_size: usize) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.chars().count() <= max_chunk_size {
            return vec![trimmed.to_string()];
        }

        let sentences = split_sentences(trimmed);
        if sentences.len() <= 1 {
            return vec![trimmed.to_string()];
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();

            if !buffer.is_empty() && buffer_len + 1 + sentence_len > max_chunk_size {
                chunks.push(std::mem::take(&mut buffer));
                buffer_len = 0;
            }

            if !buffer.is_empty() {
                buffer.push(' ');
                buffer_len += 1;
            }
            buffer.push_str(sentence);
            buffer_len += sentence_len;
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
    }
}

impl SentenceChunker {
    /// Chunks each page and numbers the result as one 0-based sequence.
    ///
    /// Blank pages produce nothing. `paged` controls whether 1-based page numbers are attached.
    pub fn chunk_pages(&self, pages: &[String], max_chunk_size: usize, paged: bool) -> Vec<ChunkDraft> {
        let mut drafts = Vec::new();

        for (page_index, page) in pages.iter().enumerate() {
            if page.trim().is_empty() {
                continue;
            }

            for content in self.split_text(page, max_chunk_size) {
                drafts.push(ChunkDraft {
                    chunk_index: drafts.len() as i32,
                    content,
                    page_number: paged.then_some(page_index as i32 + 1),
                });
            }
        }

        drafts
    }
}

/// Sentences end at a run of `.`, `!` or `?`, optionally closed by quotes or brackets,
/// followed by whitespace or the end of text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        while let Some(&(_, next)) = chars.peek() {
            if matches!(next, '.' | '!' | '?') {
                chars.next();
            } else {
                break;
            }
        }
        while let Some(&(_, next)) = chars.peek() {
            if matches!(next, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}') {
                chars.next();
            } else {
                break;
            }
        }

        let end = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
        let at_boundary = chars.peek().map(|&(_, next)| next.is_whitespace()).unwrap_or(true);

        if at_boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = SentenceChunker;
        let text = "Fresh pasta made daily. Ask for gluten-free options!";
        assert_eq!(chunker.split_text(text, 100), vec![text.to_string()]);
    }

    #[test]
    fn test_sentences_are_packed_without_mid_sentence_splits() {
        let chunker = SentenceChunker;
        let text = "First sentence here. Second sentence here. Third one is here too.";
        let chunks = chunker.split_text(text, 45);

        assert_eq!(
            chunks,
            vec![
                "First sentence here. Second sentence here.".to_string(),
                "Third one is here too.".to_string(),
            ]
        );
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_oversized_sentence_is_kept_intact() {
        let chunker = SentenceChunker;
        let long = "This sentence is far longer than the configured maximum chunk size.";
        let text = format!("Short one. {} Tail.", long);
        let chunks = chunker.split_text(&text, 20);

        assert_eq!(chunks, vec!["Short one.", long, "Tail."]);
    }

    #[test]
    fn test_unsplittable_text_is_returned_whole() {
        let chunker = SentenceChunker;
        let text = "no terminators at all in this rather long line of text";
        assert_eq!(chunker.split_text(text, 10), vec![text.to_string()]);
        assert_eq!(chunker.split_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_decimal_points_do_not_end_sentences() {
        assert_eq!(
            split_sentences("It costs 3.50 euros. Really?! Yes."),
            vec!["It costs 3.50 euros.", "Really?!", "Yes."]
        );
    }

    #[test]
    fn test_closing_quotes_and_brackets_end_sentences() {
        assert_eq!(
            split_sentences(r#"He said "yes." Then he left. (Twice.) Done [really!] ok"#),
            vec![
                r#"He said "yes.""#,
                "Then he left.",
                "(Twice.)",
                "Done [really!]",
                "ok"
            ]
        );
        assert_eq!(
            split_sentences("It's 'fine.'"),
            vec!["It's 'fine.'"]
        );
    }

    #[test]
    fn test_pages_share_one_index_sequence() {
        let chunker = SentenceChunker;
        let pages = vec![
            "Page one first. Page one second.".to_string(),
            "   ".to_string(),
            "Page three.".to_string(),
        ];
        let drafts = chunker.chunk_pages(&pages, 16, true);

        let indices: Vec<i32> = drafts.iter().map(|d| d.chunk_index).collect();
        let page_numbers: Vec<Option<i32>> = drafts.iter().map(|d| d.page_number).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(page_numbers, vec![Some(1), Some(1), Some(3)]);
    }
}
