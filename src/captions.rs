use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::PipelineResult;

#[derive(Debug, Clone)]
pub struct CaptionBlock {
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// Partition `total_seconds` into one contiguous interval per sentence.
///
/// Consecutive blocks share their boundary, the first block starts at zero
/// and the last one ends exactly at `total_seconds`.
pub fn build_timeline(sentences: &[String], total_seconds: f64) -> Vec<CaptionBlock> {
    let count = sentences.len();
    if count == 0 {
        return Vec::new();
    }
    let width = total_seconds / count as f64;
    sentences
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let start = i as f64 * width;
            let end = if i + 1 == count {
                total_seconds
            } else {
                (i + 1) as f64 * width
            };
            CaptionBlock {
                index: i + 1,
                start_seconds: start,
                end_seconds: end,
                text: text.clone(),
            }
        })
        .collect()
}

pub fn write_srt(path: &Path, blocks: &[CaptionBlock]) -> PipelineResult<()> {
    let mut f = File::create(path)?;
    for block in blocks {
        writeln!(f, "{}", block.index)?;
        writeln!(
            f,
            "{} --> {}",
            format_srt_time(block.start_seconds),
            format_srt_time(block.end_seconds)
        )?;
        for line in wrap_text(&block.text, 80) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
    }
    Ok(())
}

pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if current.len() + word.len() + 1 > width && !current.is_empty() {
            lines.push(current.clone());
            current.clear();
            current.push_str(word);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn three_sentences_over_thirty_seconds() {
        let blocks = build_timeline(&sentences(&["A.", "B.", "C."]), 30.0);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].index, 1);
        assert_eq!(
            format!(
                "{} --> {}",
                format_srt_time(blocks[0].start_seconds),
                format_srt_time(blocks[0].end_seconds)
            ),
            "00:00:00,000 --> 00:00:10,000"
        );
        assert_eq!(format_srt_time(blocks[1].start_seconds), "00:00:10,000");
        assert_eq!(format_srt_time(blocks[2].end_seconds), "00:00:30,000");
    }

    #[test]
    fn blocks_are_contiguous_and_cover_the_whole_duration() {
        let texts: Vec<String> = (0..7).map(|i| format!("Sentence {}.", i)).collect();
        let total = 13.37;
        let blocks = build_timeline(&texts, total);
        assert_eq!(blocks.len(), 7);
        assert_eq!(blocks[0].start_seconds, 0.0);
        assert_eq!(blocks[6].end_seconds, total);
        for pair in blocks.windows(2) {
            assert_eq!(pair[0].end_seconds, pair[1].start_seconds);
        }
    }

    #[test]
    fn single_sentence_spans_everything() {
        let blocks = build_timeline(&sentences(&["Only one."]), 42.5);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_seconds, 0.0);
        assert_eq!(blocks[0].end_seconds, 42.5);
    }

    #[test]
    fn srt_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        assert_eq!(format_srt_time(0.9996), "00:00:01,000");
    }

    #[test]
    fn srt_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.srt");
        let blocks = build_timeline(&sentences(&["First.", "Second."]), 10.0);
        write_srt(&path, &blocks).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "1\n00:00:00,000 --> 00:00:05,000\nFirst.\n\n2\n00:00:05,000 --> 00:00:10,000\nSecond.\n\n"
        );
    }

    #[test]
    fn long_lines_are_wrapped() {
        let word = "word";
        let text = vec![word; 40].join(" ");
        let lines = wrap_text(&text, 80);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 80));
    }
}
