//! Pretrained word-vector table for the embedding-average strategy.
//!
//! Reads the word2vec binary format (the GoogleNews vectors) and the
//! word2vec/GloVe text formats. Files ending in `.gz` are decompressed on
//! the fly. Vectors are stored row-major in one contiguous buffer.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;
use tracing::{info, warn};

/// Largest vector dimension accepted from a file header.
const MAX_DIM: usize = 1 << 16;

/// Upper bound on values reserved up front. Header row counts are only a
/// hint; the table grows past this as rows actually arrive.
const MAX_PREALLOC_VALUES: usize = 1 << 24;

/// On-disk layout of a word-vector file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    /// `"<rows> <dim>\n"` header, then per row: word, space, `dim` little-endian f32.
    Binary,
    /// One `word v1 v2 ...` row per line, with an optional `"<rows> <dim>"` header.
    Text,
}

impl VectorFormat {
    /// Guess the format from the file name, ignoring a trailing `.gz`.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".txt") || name.ends_with(".vec") {
            Self::Text
        } else {
            Self::Binary
        }
    }
}

/// Immutable word → vector table.
pub struct WordVectors {
    dim: usize,
    index: HashMap<String, usize>,
    data: Vec<f32>,
}

impl WordVectors {
    /// Load a table from disk. `max_words` caps the number of rows read.
    pub fn load(path: &Path, max_words: Option<usize>) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "word vectors not found at {}", path.display());
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

        let gzipped = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        let reader: Box<dyn Read> = if gzipped {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let reader = BufReader::with_capacity(1 << 20, reader);

        let format = VectorFormat::from_path(path);
        let table = match format {
            VectorFormat::Binary => Self::read_binary(reader, max_words),
            VectorFormat::Text => Self::read_text(reader, max_words),
        }
        .with_context(|| format!("reading word vectors {}", path.display()))?;

        info!(
            words = table.len(),
            dim = table.dim,
            ?format,
            path = %path.display(),
            "loaded word vectors"
        );
        Ok(table)
    }

    /// Build a table from explicit entries. Later duplicates are ignored.
    pub fn from_entries(dim: usize, entries: Vec<(String, Vec<f32>)>) -> anyhow::Result<Self> {
        check_dim(dim)?;
        let mut table = Self::with_capacity(dim, entries.len());
        for (word, vector) in entries {
            anyhow::ensure!(
                vector.len() == dim,
                "vector for '{word}' has {} values, expected {dim}",
                vector.len()
            );
            table.insert(word, &vector);
        }
        Ok(table)
    }

    fn with_capacity(dim: usize, rows: usize) -> Self {
        let rows = rows.min(MAX_PREALLOC_VALUES / dim.max(1));
        Self {
            dim,
            index: HashMap::with_capacity(rows),
            data: Vec::with_capacity(rows * dim),
        }
    }

    fn insert(&mut self, word: String, vector: &[f32]) {
        if self.index.contains_key(&word) {
            return;
        }
        self.index.insert(word, self.index.len());
        self.data.extend_from_slice(vector);
    }

    /// Parse the word2vec binary format.
    pub fn read_binary<R: BufRead>(mut reader: R, max_words: Option<usize>) -> anyhow::Result<Self> {
        let mut header = String::new();
        reader.read_line(&mut header).context("reading header")?;
        let (rows, dim) = parse_header(&header)
            .ok_or_else(|| anyhow::anyhow!("invalid header: {:?}", header.trim()))?;
        check_dim(dim)?;

        let rows = max_words.map_or(rows, |cap| rows.min(cap));
        let mut table = Self::with_capacity(dim, rows);
        let mut word_buf = Vec::with_capacity(64);
        let mut vec_buf = vec![0u8; dim * 4];
        let mut vector = vec![0.0f32; dim];

        for row in 0..rows {
            word_buf.clear();
            reader
                .read_until(b' ', &mut word_buf)
                .with_context(|| format!("reading word at row {row}"))?;
            anyhow::ensure!(!word_buf.is_empty(), "unexpected end of file at row {row}");

            // Rows may be separated by a newline that then prefixes the next word.
            let word = String::from_utf8_lossy(&word_buf);
            let word = word.trim_matches(|c: char| c == ' ' || c == '\n' || c == '\r');

            reader
                .read_exact(&mut vec_buf)
                .with_context(|| format!("reading vector for '{word}' at row {row}"))?;
            for (v, chunk) in vector.iter_mut().zip(vec_buf.chunks_exact(4)) {
                *v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            table.insert(word.to_string(), &vector);
        }

        anyhow::ensure!(!table.is_empty(), "word-vector file has no rows");
        Ok(table)
    }

    /// Parse the text format, with or without a `"<rows> <dim>"` header line.
    pub fn read_text<R: BufRead>(reader: R, max_words: Option<usize>) -> anyhow::Result<Self> {
        let mut table: Option<Self> = None;
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading line {}", line_no + 1))?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            if line_no == 0
                && let Some((rows, dim)) = parse_header(&line)
            {
                check_dim(dim)?;
                table = Some(Self::with_capacity(dim, rows));
                continue;
            }

            let table = table.get_or_insert_with(|| Self::with_capacity(parts.len() - 1, 0));
            if max_words.is_some_and(|cap| table.len() >= cap) {
                break;
            }
            if parts.len() != table.dim + 1 {
                skipped += 1;
                continue;
            }

            let vector: Result<Vec<f32>, _> = parts[1..].iter().map(|v| v.parse::<f32>()).collect();
            match vector {
                Ok(vector) => table.insert(parts[0].to_string(), &vector),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "skipped malformed word-vector rows");
        }
        let table = table.ok_or_else(|| anyhow::anyhow!("word-vector file is empty"))?;
        check_dim(table.dim)?;
        anyhow::ensure!(!table.is_empty(), "word-vector file has no rows");
        Ok(table)
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words in the table.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.index
            .get(word)
            .map(|&row| &self.data[row * self.dim..(row + 1) * self.dim])
    }

    /// Elementwise mean of the vectors of in-table words.
    ///
    /// Words missing from the table are skipped. When none match, the result
    /// is the zero vector. The output always has `dim` values.
    pub fn average<'a>(&self, words: impl IntoIterator<Item = &'a str>) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dim];
        let mut count = 0usize;

        for vector in words.into_iter().filter_map(|w| self.get(w)) {
            for (acc, &val) in sum.iter_mut().zip(vector) {
                *acc += val;
            }
            count += 1;
        }

        if count > 0 {
            for v in &mut sum {
                *v /= count as f32;
            }
        }
        sum
    }
}

fn check_dim(dim: usize) -> anyhow::Result<()> {
    anyhow::ensure!(dim > 0, "vector dimension must be greater than zero");
    anyhow::ensure!(dim <= MAX_DIM, "vector dimension {dim} exceeds {MAX_DIM}");
    Ok(())
}

/// Parse a `"<rows> <dim>"` header line.
fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let rows = parts.next()?.parse().ok()?;
    let dim = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((rows, dim))
}
