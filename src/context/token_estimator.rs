//! Conservative token estimation
//!
//! All budget decisions in this crate use a fixed ~4 characters/token
//! heuristic, deliberately biased high so that a context that fits here also
//! fits a real tokenizer's count.

/// Estimate the token count of `text`.
///
/// Returns `0` for empty input; otherwise `floor(chars / 4) + 1`.
pub fn count_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.chars().count() as f64 / 4.0).floor() as usize + 1
}

/// Estimate token counts for multiple texts, order-preserving.
pub fn count_tokens_batch<S: AsRef<str>>(texts: &[S]) -> Vec<usize> {
    texts.iter().map(|t| count_tokens(t.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn test_char_heuristic() {
        assert_eq!(count_tokens("a"), 1);
        assert_eq!(count_tokens("abc"), 1);
        assert_eq!(count_tokens("abcd"), 2);
        assert_eq!(count_tokens(&"x".repeat(196)), 50);
        assert_eq!(count_tokens(&"x".repeat(199)), 50);
        assert_eq!(count_tokens(&"x".repeat(200)), 51);
    }

    #[test]
    fn test_monotonic_in_length() {
        let mut prev = 0;
        for len in 0..256 {
            let tokens = count_tokens(&"y".repeat(len));
            assert!(tokens >= prev);
            prev = tokens;
        }
    }

    #[test]
    fn test_batch_estimation() {
        let texts = vec!["", "abcd", "hello world"];
        assert_eq!(count_tokens_batch(&texts), vec![0, 2, 3]);
    }
}
