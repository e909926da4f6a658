//! A3M alignment reader / writer.
//!
//! ```text
//! #10	1
//! >query
//! MKTVRQERLK
//! >UniRef100_A0A0 ...
//! MRswSVKQD-IK
//! ```
//!
//! Uppercase letters and `-` are match states, lowercase letters and `.` are
//! insertions relative to the query.

use std::collections::HashSet;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use super::fasta::{fasta_error, FastaError, FastaReader, ReadMode};
use crate::error::{MsaError, MsaResult};
use crate::msa::{Alignment, SeqRecord};

/// Parses an alignment from any buffered reader.
pub fn parse<R: BufRead>(reader: R) -> Result<Alignment, FastaError> {
    let mut reader = FastaReader::with_mode(reader, ReadMode::Alignment);
    let mut records: Vec<SeqRecord> = Vec::new();
    let mut line_lens: Vec<Vec<usize>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    while let Some(rec) = reader.next_record()? {
        if !seen.insert(rec.id.clone()) {
            warn!("duplicate record identifier '{}'", rec.id);
        }
        line_lens.push(rec.line_lens.clone());
        records.push(rec.into());
    }

    Ok(Alignment {
        comments: reader.comments().to_vec(),
        records,
        line_width: detect_line_width(&line_lens),
    })
}

/// 读取 A3M 文件。
pub fn read<P: AsRef<Path>>(path: P) -> MsaResult<Alignment> {
    let path = path.as_ref();
    let fh = std::fs::File::open(path).map_err(|e| MsaError::io(path, e))?;
    let aln = parse(std::io::BufReader::new(fh)).map_err(|e| fasta_error(path, e))?;
    debug!("read {} records from '{}'", aln.len(), path.display());
    Ok(aln)
}

/// A width is reported only if at least one record wraps and every non-final
/// line of every record has that same length.
fn detect_line_width(line_lens: &[Vec<usize>]) -> Option<usize> {
    let mut width: Option<usize> = None;
    for lens in line_lens {
        if lens.len() < 2 {
            continue;
        }
        let w = lens[0];
        if lens[..lens.len() - 1].iter().any(|&l| l != w) {
            return None;
        }
        match width {
            None => width = Some(w),
            Some(prev) if prev != w => return None,
            _ => {}
        }
    }
    let w = width?;
    // last lines may be shorter, never longer
    if line_lens.iter().flat_map(|l| l.last()).any(|&l| l > w) {
        return None;
    }
    Some(w)
}

pub fn write<W: Write>(aln: &Alignment, out: &mut W) -> std::io::Result<()> {
    for c in &aln.comments {
        writeln!(out, "{}", c)?;
    }
    for rec in &aln.records {
        writeln!(out, ">{}", rec.header())?;
        match aln.line_width {
            Some(w) if w > 0 => {
                for chunk in rec.residues.chunks(w) {
                    out.write_all(chunk)?;
                    out.write_all(b"\n")?;
                }
            }
            _ => {
                out.write_all(&rec.residues)?;
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

pub fn to_string(aln: &Alignment) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // writing to a Vec cannot fail
    let _ = write(aln, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Writes to a temporary file next to `path`, then renames it into place.
///
/// `path` may be the file the alignment was read from. On error the
/// temporary file is removed and `path` is left untouched. An existing
/// `path` keeps its permissions; a new one gets `0644` on Unix.
pub fn write_atomic<P: AsRef<Path>>(aln: &Alignment, path: P) -> MsaResult<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".msa-")
        .suffix(".a3m.tmp")
        .tempfile_in(dir)
        .map_err(|e| MsaError::io(dir, e))?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        write(aln, &mut w).map_err(|e| MsaError::io(tmp.path(), e))?;
        w.flush().map_err(|e| MsaError::io(tmp.path(), e))?;
    }
    if let Some(perms) = target_permissions(path) {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| MsaError::io(tmp.path(), e))?;
    }
    tmp.persist(path).map_err(|e| MsaError::io(path, e.error))?;
    Ok(())
}

/// Temp files are created owner-only; the output follows the file it replaces.
fn target_permissions(path: &Path) -> Option<std::fs::Permissions> {
    if let Ok(meta) = std::fs::metadata(path) {
        return Some(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(std::fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Number of records (header lines) in an A3M file.
pub fn count_sequences<P: AsRef<Path>>(path: P) -> MsaResult<usize> {
    let path = path.as_ref();
    let fh = std::fs::File::open(path).map_err(|e| MsaError::io(path, e))?;
    let mut count = 0usize;
    for line in std::io::BufReader::new(fh).lines() {
        let line = line.map_err(|e| MsaError::io(path, e))?;
        if line.starts_with('>') {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_with_preamble_and_insertions() {
        let data = "#10\t1\n>q\nMKTVRQERLK\n>h1 UniRef100_X\nMRswSVKQD-IK\n";
        let aln = parse(Cursor::new(data)).unwrap();
        assert_eq!(aln.comments, vec!["#10\t1".to_string()]);
        assert_eq!(aln.len(), 2);
        assert_eq!(aln.homologs()[0].desc.as_deref(), Some("UniRef100_X"));
        assert_eq!(aln.homologs()[0].match_len(), 10);
        assert_eq!(aln.line_width, None);
        assert_eq!(to_string(&aln), data);
    }

    #[test]
    fn wrapped_input_keeps_its_width() {
        let data = ">q\nMKTV\nRQER\nLK\n>h1\nMRSV\nKQDR\nIK\n";
        let aln = parse(Cursor::new(data)).unwrap();
        assert_eq!(aln.line_width, Some(4));
        assert_eq!(aln.records[0].residues, b"MKTVRQERLK");
        assert_eq!(to_string(&aln), data);
    }

    #[test]
    fn inconsistent_wrapping_is_unwrapped() {
        let data = ">q\nMKTV\nRQERLK\n>h1\nMRS\nVKQDRIK\n";
        let aln = parse(Cursor::new(data)).unwrap();
        assert_eq!(aln.line_width, None);
        assert_eq!(to_string(&aln), ">q\nMKTVRQERLK\n>h1\nMRSVKQDRIK\n");
    }

    #[test]
    fn rejects_foreign_characters() {
        let data = ">q\nMKTV\n>h1\nMK#V\n";
        assert!(matches!(parse(Cursor::new(data)), Err(FastaError::InvalidChar { line: 4, ch: '#' })));
    }

    #[test]
    fn atomic_write_over_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.a3m");
        std::fs::write(&path, ">q\nMKTV\n>h1\nMKSV\n").unwrap();

        let mut aln = read(&path).unwrap();
        aln.records.truncate(1);
        write_atomic(&aln, &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">q\nMKTV\n");
        assert_eq!(count_sequences(&path).unwrap(), 1);
        // only the target remains, no temp files
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let aln = parse(Cursor::new(">q\nMKTV\n")).unwrap();
        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;

        let fresh = dir.path().join("new.a3m");
        write_atomic(&aln, &fresh).unwrap();
        assert_eq!(mode(&fresh), 0o644);

        let shared = dir.path().join("shared.a3m");
        std::fs::write(&shared, ">q\nMKTV\n").unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o640)).unwrap();
        write_atomic(&aln, &shared).unwrap();
        assert_eq!(mode(&shared), 0o640);
    }

    #[test]
    fn read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read(dir.path().join("nope.a3m")), Err(MsaError::NotFound { .. })));
    }
}
