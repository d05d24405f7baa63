use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::BigInt;

use crate::{Algorithm, CellGrid, EngineError, Rect, Rule};

const COMPACT_MAGIC: &[u8; 4] = b"CAC1";

/// On-disk pattern encodings. `Compact` is the binary format used for
/// state snapshots; `Text` is a plain line-oriented format whose
/// coordinates are limited to the 32-bit range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatternFormat {
    Compact,
    Text,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Zstd,
}

/// Write `grid` to `path`, restricted to `bounds` when given.
///
/// # Errors
///
/// Returns [`EngineError::PatternTooBig`] when a text write would need
/// coordinates outside the 32-bit range, or an I/O error from the
/// filesystem.
pub fn write_pattern(
    path: &Path,
    grid: &mut CellGrid,
    format: PatternFormat,
    compression: Compression,
    bounds: Option<Rect>,
) -> Result<(), EngineError> {
    if format == PatternFormat::Text {
        let extent = match bounds {
            Some(b) => Some(b),
            None => grid.find_bounds(),
        };
        if let Some(extent) = extent {
            if !extent.fits_i32() {
                log::warn!("pattern extent {extent} exceeds the text format's coordinate range");
                return Err(EngineError::PatternTooBig);
            }
        }
    }

    let file = File::create(path).map_err(|err| EngineError::OpenFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let mut out = BufWriter::new(file);
    match format {
        PatternFormat::Compact => write_compact(&mut out, grid, compression, bounds)?,
        PatternFormat::Text => write_text(&mut out, grid, bounds)?,
    }
    out.flush()?;
    Ok(())
}

/// Read a pattern file, detecting the format from its leading bytes.
///
/// # Errors
///
/// Returns [`EngineError::BadPatternFile`] for malformed content and
/// [`EngineError::OpenFile`] when the file cannot be opened.
pub fn read_pattern(path: &Path) -> Result<CellGrid, EngineError> {
    let file = File::open(path).map_err(|err| EngineError::OpenFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let mut reader = BufReader::new(file);
    let mut magic = [0u8; 4];
    let bad = |message: String| EngineError::BadPatternFile {
        path: path.to_path_buf(),
        message,
    };
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(err) => return Err(bad(err.to_string())),
    }
    if &magic == COMPACT_MAGIC {
        read_compact(&mut reader).map_err(|err| bad(err.to_string()))
    } else {
        let file = File::open(path).map_err(|err| EngineError::OpenFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        read_text(BufReader::new(file)).map_err(|err| bad(err.to_string()))
    }
}

fn selected_cells(grid: &CellGrid, bounds: Option<Rect>) -> Vec<(i64, i64, u8)> {
    let mut cells: Vec<_> = grid
        .cells()
        .filter(|&(x, y, _)| bounds.is_none_or(|b| b.contains(x, y)))
        .collect();
    // deterministic output keeps snapshots byte-comparable
    cells.sort_unstable_by_key(|&(x, y, _)| (y, x));
    cells
}

fn write_compact(out: &mut impl Write, grid: &mut CellGrid, compression: Compression, bounds: Option<Rect>) -> Result<(), EngineError> {
    out.write_all(COMPACT_MAGIC)?;
    out.write_u8(match compression {
        Compression::None => 0,
        Compression::Zstd => 1,
    })?;
    match compression {
        Compression::None => write_compact_body(out, grid, bounds),
        Compression::Zstd => {
            let mut enc = zstd::stream::Encoder::new(out, 0)?;
            write_compact_body(&mut enc, grid, bounds)?;
            enc.finish()?;
            Ok(())
        }
    }
}

fn write_compact_body(out: &mut impl Write, grid: &mut CellGrid, bounds: Option<Rect>) -> Result<(), EngineError> {
    write_lv(out, grid.algorithm().name().as_bytes())?;
    write_lv(out, grid.rule().as_str().as_bytes())?;
    write_lv(out, grid.generation().to_string().as_bytes())?;
    let cells = selected_cells(grid, bounds);
    out.write_u64::<LittleEndian>(cells.len() as u64)?;
    for (x, y, state) in cells {
        out.write_i64::<LittleEndian>(x)?;
        out.write_i64::<LittleEndian>(y)?;
        out.write_u8(state)?;
    }
    Ok(())
}

fn write_lv(out: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    out.write_u32::<LittleEndian>(bytes.len() as u32)?;
    out.write_all(bytes)
}

fn read_compact(reader: &mut impl Read) -> Result<CellGrid, EngineError> {
    let compression = reader.read_u8()?;
    match compression {
        0 => read_compact_body(reader),
        1 => {
            let mut dec = zstd::stream::Decoder::new(reader)?;
            read_compact_body(&mut dec)
        }
        other => Err(EngineError::Generic(format!("unknown compression tag {other}"))),
    }
}

fn read_compact_body(reader: &mut impl Read) -> Result<CellGrid, EngineError> {
    let algorithm = Algorithm::from_name(&read_lv(reader)?)?;
    let rule = Rule::parse(&read_lv(reader)?)?;
    let generation = parse_generation(&read_lv(reader)?)?;
    let mut grid = CellGrid::new(algorithm, rule);
    let count = reader.read_u64::<LittleEndian>()?;
    for _ in 0..count {
        let x = reader.read_i64::<LittleEndian>()?;
        let y = reader.read_i64::<LittleEndian>()?;
        let state = reader.read_u8()?;
        grid.set_cell(x, y, state);
    }
    grid.set_generation(generation);
    Ok(grid)
}

fn read_lv(reader: &mut impl Read) -> Result<String, EngineError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    if len > 1 << 20 {
        return Err(EngineError::Generic(format!("unreasonable field length {len}")));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|err| EngineError::Generic(err.to_string()))
}

fn parse_generation(text: &str) -> Result<BigInt, EngineError> {
    BigInt::from_str(text).map_err(|err| EngineError::Generic(format!("bad generation count: {err}")))
}

fn write_text(out: &mut impl Write, grid: &mut CellGrid, bounds: Option<Rect>) -> Result<(), EngineError> {
    writeln!(
        out,
        "#CELLA algo={} rule={} gen={}",
        grid.algorithm().name(),
        grid.rule().as_str(),
        grid.generation()
    )?;
    for (x, y, state) in selected_cells(grid, bounds) {
        writeln!(out, "{x} {y} {state}")?;
    }
    Ok(())
}

fn read_text(reader: impl BufRead) -> Result<CellGrid, EngineError> {
    let mut algorithm = Algorithm::default();
    let mut rule = Rule::default();
    let mut generation = BigInt::from(0);
    let mut grid = None;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('#') {
            if grid.is_some() {
                continue;
            }
            for field in header.split_whitespace() {
                if let Some(v) = field.strip_prefix("algo=") {
                    algorithm = Algorithm::from_name(v)?;
                } else if let Some(v) = field.strip_prefix("rule=") {
                    rule = Rule::parse(v)?;
                } else if let Some(v) = field.strip_prefix("gen=") {
                    generation = parse_generation(v)?;
                }
            }
            continue;
        }
        let grid = grid.get_or_insert_with(|| CellGrid::new(algorithm, rule.clone()));
        let mut parts = line.split_whitespace();
        let cell = (|| {
            let x: i64 = parts.next()?.parse().ok()?;
            let y: i64 = parts.next()?.parse().ok()?;
            let state: u8 = match parts.next() {
                Some(s) => s.parse().ok()?,
                None => 1,
            };
            Some((x, y, state))
        })();
        match cell {
            Some((x, y, state)) => {
                grid.set_cell(x, y, state);
            }
            None => return Err(EngineError::Generic(format!("bad cell on line {}", lineno + 1))),
        }
    }
    let mut grid = grid.unwrap_or_else(|| CellGrid::new(algorithm, rule));
    grid.set_generation(generation);
    Ok(grid)
}
