use std::io::BufRead;
use std::path::Path;

use thiserror::Error;

use crate::error::{MsaError, MsaResult};
use crate::msa::SeqRecord;
use crate::util::protein;

#[derive(Error, Debug)]
pub enum FastaError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("sequence data before the first header at line {0}")]
    DataBeforeHeader(usize),

    #[error("empty sequence identifier at line {0}")]
    EmptyId(usize),

    #[error("invalid character '{ch}' at line {line}")]
    InvalidChar { line: usize, ch: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Plain protein FASTA: residues uppercased, `*` dropped.
    Sequence,
    /// Aligned rows (A3M/A2M): case, `-` and `.` kept as-is.
    Alignment,
}

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    /// Lengths of the residue lines the sequence was read from.
    pub line_lens: Vec<usize>,
}

impl From<FastaRecord> for SeqRecord {
    fn from(rec: FastaRecord) -> Self {
        SeqRecord { id: rec.id, desc: rec.desc, residues: rec.seq }
    }
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    mode: ReadMode,
    buf: String,
    done: bool,
    line_no: usize,
    peek_header: Option<(String, usize)>,
    comments: Vec<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_mode(reader, ReadMode::Sequence)
    }

    pub fn with_mode(reader: R, mode: ReadMode) -> Self {
        Self {
            reader,
            mode,
            buf: String::new(),
            done: false,
            line_no: 0,
            peek_header: None,
            comments: Vec::new(),
        }
    }

    /// `#` lines seen before the first header (alignment mode only).
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    fn read_line(&mut self) -> Result<usize, FastaError> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>, FastaError> {
        if self.done {
            return Ok(None);
        }

        // Find header line
        let (header, header_line) = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                if self.read_line()? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                let line = self.buf.trim();
                if let Some(h) = line.strip_prefix('>') {
                    break (h.trim().to_string(), self.line_no);
                }
                if line.is_empty() {
                    continue;
                }
                if self.mode == ReadMode::Alignment && line.starts_with('#') {
                    self.comments.push(line.to_string());
                    continue;
                }
                return Err(FastaError::DataBeforeHeader(self.line_no));
            }
        };

        // Parse id and description
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        if id.is_empty() {
            return Err(FastaError::EmptyId(header_line));
        }
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Read sequence lines
        let mut seq: Vec<u8> = Vec::new();
        let mut line_lens: Vec<usize> = Vec::new();
        loop {
            if self.read_line()? == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                let h = self.buf[1..].trim().to_string();
                self.peek_header = Some((h, self.line_no));
                break;
            }
            let before = seq.len();
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => match self.mode {
                        ReadMode::Sequence => {
                            if b == b'*' {
                                continue;
                            }
                            if !b.is_ascii_alphabetic() {
                                return Err(FastaError::InvalidChar { line: self.line_no, ch: b as char });
                            }
                            seq.push(b.to_ascii_uppercase());
                        }
                        ReadMode::Alignment => {
                            if !protein::is_alignment_char(b) {
                                return Err(FastaError::InvalidChar { line: self.line_no, ch: b as char });
                            }
                            seq.push(b);
                        }
                    },
                }
            }
            if seq.len() > before {
                line_lens.push(seq.len() - before);
            }
        }

        Ok(Some(FastaRecord { id, desc, seq, line_lens }))
    }
}

/// 读取单序列 FASTA 查询文件。
///
/// 文件必须恰好包含一条记录；残基被拼接为一条序列并转换为大写。
pub fn load<P: AsRef<Path>>(path: P) -> MsaResult<SeqRecord> {
    let path = path.as_ref();
    let fh = std::fs::File::open(path).map_err(|e| MsaError::io(path, e))?;
    let mut reader = FastaReader::new(std::io::BufReader::new(fh));

    let rec = match reader.next_record() {
        Ok(Some(rec)) => rec,
        Ok(None) => return Err(MsaError::format(path, "no FASTA header found (empty file?)")),
        Err(e) => return Err(fasta_error(path, e)),
    };
    if rec.seq.is_empty() {
        return Err(MsaError::format(path, format!("record '{}' has an empty sequence", rec.id)));
    }
    match reader.next_record() {
        Ok(None) => {}
        Ok(Some(extra)) => {
            return Err(MsaError::format(
                path,
                format!("expected a single sequence, found a second record '{}'", extra.id),
            ))
        }
        Err(e) => return Err(fasta_error(path, e)),
    }

    Ok(rec.into())
}

pub(crate) fn fasta_error(path: &Path, err: FastaError) -> MsaError {
    match err {
        FastaError::Io(e) => MsaError::io(path, e),
        other => MsaError::format(path, other.to_string()),
    }
}
