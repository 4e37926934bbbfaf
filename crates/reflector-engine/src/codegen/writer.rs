//! Line-counted text output and chunking.

use log::debug;

const INDENT: &str = "    ";

/// A growing block of generated text that knows its line count.
#[derive(Debug, Clone, Default)]
pub struct CodeWriter {
    text: String,
    lines: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at `depth` levels of indentation.
    pub fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        for _ in 0..depth {
            self.text.push_str(INDENT);
        }
        self.text.push_str(text.as_ref());
        self.text.push('\n');
        self.lines += 1;
    }

    /// Append pre-formatted text verbatim.
    pub fn append(&mut self, text: &str) {
        self.lines += text.matches('\n').count();
        self.text.push_str(text);
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// One piece of split output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub lines: usize,
}

/// Output that rolls over to a new chunk once the last one has grown past
/// `max_lines`. Earlier chunks stay writable.
#[derive(Debug)]
pub struct ChunkedOutput {
    max_lines: usize,
    chunks: Vec<CodeWriter>,
}

impl ChunkedOutput {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            chunks: vec![CodeWriter::new()],
        }
    }

    /// Writer for the next block of output.
    pub fn current(&mut self) -> &mut CodeWriter {
        let full = self
            .chunks
            .last()
            .map_or(true, |chunk| chunk.lines() > self.max_lines);
        if full {
            debug!(
                "starting output chunk {} after {} lines",
                self.chunks.len(),
                self.max_lines
            );
            self.chunks.push(CodeWriter::new());
        }
        let last = self.chunks.len() - 1;
        &mut self.chunks[last]
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(CodeWriter::is_empty)
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
            .into_iter()
            .enumerate()
            .map(|(index, writer)| Chunk {
                index,
                lines: writer.lines(),
                text: writer.into_string(),
            })
            .collect()
    }
}

/// `TEXT("...")` literal with C++ escapes applied.
pub fn text_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    escaped.push_str("TEXT(\"");
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped.push_str("\")");
    escaped
}
