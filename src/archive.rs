//! DFP/ITR archive reading
//!
//! An archive holds one head CSV naming every filing, plus one CSV per
//! (statement kind, scope) whose rows repeat the filing's key fields. The
//! head file drives iteration: for each head row, the matching run of rows
//! is pulled from every statement file and handed to the assembler.

use crate::assembler;
use crate::error::{CvmError, Result};
use crate::row::{BatchKey, DocumentHead, RawHeadRecord, RawStatementRecord};
use crate::types::Document;
use encoding_rs::WINDOWS_1252;
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// The middle part of every statement member file name.
const STATEMENT_MEMBERS: [&str; 16] = [
    "BPA_con", "BPA_ind", "BPP_con", "BPP_ind", "DFC_MD_con", "DFC_MD_ind", "DFC_MI_con",
    "DFC_MI_ind", "DMPL_con", "DMPL_ind", "DRA_con", "DRA_ind", "DRE_con", "DRE_ind", "DVA_con",
    "DVA_ind",
];

/// Options for reading an archive.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Read individual-scope statement files.
    pub individual: bool,
    /// Read consolidated-scope statement files.
    pub consolidated: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            individual: true,
            consolidated: true,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn individual(mut self, yes: bool) -> Self {
        self.individual = yes;
        self
    }

    pub fn consolidated(mut self, yes: bool) -> Self {
        self.consolidated = yes;
        self
    }
}

type MemberSource = DecodeReaderBytes<Cursor<Vec<u8>>, Vec<u8>>;
type MemberRows<T> = csv::DeserializeRecordsIntoIter<MemberSource, T>;

/// Lazy, single-pass reader of the documents in a DFP/ITR archive.
///
/// Row-level failures ride on the emitted [`Document`]s; a structural
/// failure (bad container, unreadable CSV stream, bad head row) yields one
/// final `Err` and ends iteration. Dropping the reader at any point
/// releases everything it holds.
pub struct DfpItrFile {
    head: MemberRows<RawHeadRecord>,
    statements: Vec<BatchReader>,
    queue: VecDeque<Document>,
    done: bool,
}

impl DfpItrFile {
    /// Open an archive on disk with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(File::open(path)?, ReadOptions::default())
    }

    /// Open an archive on disk.
    pub fn open_with_options(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        Self::with_options(File::open(path)?, options)
    }

    /// Read an archive from any seekable byte source with default options.
    pub fn new<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::with_options(reader, ReadOptions::default())
    }

    /// Read an archive from any seekable byte source.
    pub fn with_options<R: Read + Seek>(reader: R, options: ReadOptions) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut head_name = None;
        let mut statement_names = Vec::new();

        for name in archive.file_names().map(String::from).collect::<Vec<_>>() {
            match member_middle(&name) {
                Some("") => head_name = Some(name),
                Some(middle) if STATEMENT_MEMBERS.contains(&middle) => {
                    let wanted = if middle.ends_with("_ind") {
                        options.individual
                    } else {
                        options.consolidated
                    };
                    if wanted {
                        statement_names.push(name);
                    }
                }
                _ => log::warn!("skipping unknown archive member '{}'", name),
            }
        }

        let head_name = head_name
            .ok_or_else(|| CvmError::MissingMember("{dfp|itr}_cia_aberta_YYYY.csv".into()))?;

        let head = member_rows::<_, RawHeadRecord>(&mut archive, &head_name)?;

        let mut statements = Vec::with_capacity(statement_names.len());
        for name in statement_names {
            statements.push(BatchReader {
                rows: member_rows(&mut archive, &name)?,
                cached_row: None,
                cached_batch: None,
            });
        }

        Ok(DfpItrFile {
            head,
            statements,
            queue: VecDeque::new(),
            done: false,
        })
    }

    /// Read the next head row and assemble its documents onto the queue.
    /// Returns false when the head file is exhausted.
    fn advance(&mut self) -> Result<bool> {
        let raw_head = match self.head.next() {
            None => return Ok(false),
            Some(record) => record?,
        };

        let head = DocumentHead::from_raw(&raw_head)?;
        let key = BatchKey::of_head(&raw_head);

        let mut rows = Vec::new();
        for reader in &mut self.statements {
            if let Some(batch) = reader.take_expected(&key)? {
                rows.extend(batch);
            }
        }

        self.queue.extend(assembler::assemble(head, rows));
        Ok(true)
    }
}

impl Iterator for DfpItrFile {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(document) = self.queue.pop_front() {
                return Some(Ok(document));
            }
            if self.done {
                return None;
            }
            match self.advance() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Reads one statement member file as runs of rows sharing a batch key.
///
/// Statement files repeat the head file's filing order, so a single
/// lookahead row plus a single lookahead batch is enough to stay in sync:
/// a batch pulled for the wrong filing is kept for the next head row.
struct BatchReader {
    rows: MemberRows<RawStatementRecord>,
    cached_row: Option<RawStatementRecord>,
    cached_batch: Option<(BatchKey, Vec<RawStatementRecord>)>,
}

impl BatchReader {
    /// The next contiguous run of rows sharing one batch key.
    fn read_batch(&mut self) -> Result<Option<(BatchKey, Vec<RawStatementRecord>)>> {
        let first = match self.cached_row.take() {
            Some(row) => row,
            None => match self.rows.next() {
                None => return Ok(None),
                Some(record) => record?,
            },
        };

        let key = BatchKey::of_statement(&first);
        let mut rows = vec![first];

        for record in self.rows.by_ref() {
            let row = record?;
            if BatchKey::of_statement(&row) == key {
                rows.push(row);
            } else {
                self.cached_row = Some(row);
                break;
            }
        }

        Ok(Some((key, rows)))
    }

    /// The next batch, if it belongs to `expected`; otherwise it is kept
    /// back and `None` is returned.
    fn take_expected(&mut self, expected: &BatchKey) -> Result<Option<Vec<RawStatementRecord>>> {
        let (key, rows) = match self.cached_batch.take() {
            Some(batch) => batch,
            None => match self.read_batch()? {
                Some(batch) => batch,
                None => return Ok(None),
            },
        };

        if key == *expected {
            Ok(Some(rows))
        } else {
            self.cached_batch = Some((key, rows));
            Ok(None)
        }
    }
}

/// The part of a member name between the `{dfp|itr}_cia_aberta` prefix and
/// the `_YYYY.csv` suffix: empty for the head file, e.g. "BPA_con" for a
/// statement file, `None` for names outside the scheme.
fn member_middle(name: &str) -> Option<&str> {
    let stem = name.strip_suffix(".csv")?;
    let rest = stem
        .strip_prefix("dfp_cia_aberta")
        .or_else(|| stem.strip_prefix("itr_cia_aberta"))?;

    let (middle, year) = rest.rsplit_once('_')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(middle.trim_start_matches('_'))
}

/// Extract a member and set up lazy row decoding over it. The member bytes
/// are transcoded from the archive's ISO-8859-1 on the fly.
fn member_rows<R: Read + Seek, T: DeserializeOwned>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<MemberRows<T>> {
    let mut member = archive.by_name(name)?;
    let mut bytes = Vec::with_capacity(member.size() as usize);
    member.read_to_end(&mut bytes)?;

    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(WINDOWS_1252))
        .build(Cursor::new(bytes));

    let reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(decoder);

    Ok(reader.into_deserialize())
}
