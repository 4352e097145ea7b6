//! STL import and export.
//!
//! Binary layout: 80-byte header, `u32` triangle count, then per triangle a
//! facet normal and three vertices as little-endian `f32` triples followed
//! by a `u16` attribute word.

use std::io::{BufWriter, ErrorKind, Read, Write};

use millsim_math::{Point3, Vec3};

use crate::task::{is_cancelled, report};
use crate::{Result, SurfaceBuilder, SurfaceError, SurfaceView, Task};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;
const READ_CHUNK: usize = 64 * 1024;

/// Name written into STL headers.
pub const STL_NAME: &str = "millsim";

/// STL flavour to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StlFormat {
    /// Compact little-endian binary.
    #[default]
    Binary,
    /// `solid ... endsolid` text.
    Ascii,
}

/// Read a binary or ASCII STL into a triangle builder.
///
/// The flavour is detected from the content. Binary facets are streamed one
/// at a time, so pass a buffered reader. If `task` is cancelled reading
/// stops and the triangles read so far are returned.
pub fn read_stl<R: Read>(mut reader: R, task: Option<&Task>) -> Result<SurfaceBuilder> {
    if let Some(task) = task {
        task.update(0.0, "Reading STL");
    }
    if is_cancelled(task) {
        log::info!("STL read cancelled before start");
        return Ok(SurfaceBuilder::triangles());
    }

    let mut header = [0u8; HEADER_LEN + 4];
    let found = fill(&mut reader, &mut header)?;

    let builder = if looks_ascii(&header[..found]) {
        // Binary headers may also start with "solid", so look at the size
        let mut bytes = header[..found].to_vec();
        if !read_rest(&mut reader, &mut bytes, task)? {
            log::info!("STL read cancelled after {} bytes", bytes.len());
            return Ok(SurfaceBuilder::triangles());
        }

        if is_binary(&bytes) {
            let count = triangle_count(&bytes).unwrap_or(0);
            read_binary(&bytes[HEADER_LEN + 4..], count, task)?
        } else {
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| SurfaceError::InvalidStl(format!("not UTF-8: {}", e)))?;
            read_ascii(text, task)?
        }
    } else if found == header.len() {
        let count = triangle_count(&header).unwrap_or(0);
        read_binary(reader, count, task)?
    } else {
        return Err(SurfaceError::InvalidStl(format!(
            "{} bytes is too short for an STL file",
            found
        )));
    };

    if is_cancelled(task) {
        log::info!("STL read cancelled after {} triangles", builder.count());
    } else {
        log::debug!("read {} triangles from STL", builder.count());
    }
    Ok(builder)
}

/// Read until `buf` is full or the input ends, returning the bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut found = 0;
    while found < buf.len() {
        match reader.read(&mut buf[found..]) {
            Ok(0) => break,
            Ok(n) => found += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(found)
}

/// Append the remaining input in chunks. Returns false if cancelled first.
fn read_rest<R: Read>(reader: &mut R, bytes: &mut Vec<u8>, task: Option<&Task>) -> Result<bool> {
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if is_cancelled(task) {
            return Ok(false);
        }
        let n = fill(reader, &mut chunk)?;
        bytes.extend_from_slice(&chunk[..n]);
        if n < chunk.len() {
            return Ok(true);
        }
    }
}

fn triangle_count(bytes: &[u8]) -> Option<usize> {
    let count = bytes.get(HEADER_LEN..HEADER_LEN + 4)?;
    Some(u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize)
}

fn is_binary(bytes: &[u8]) -> bool {
    triangle_count(bytes)
        .is_some_and(|n| HEADER_LEN + 4 + n * TRIANGLE_LEN == bytes.len())
}

fn looks_ascii(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"solid")
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read `count` facets following the header.
fn read_binary<R: Read>(mut reader: R, count: usize, task: Option<&Task>) -> Result<SurfaceBuilder> {
    let mut builder = SurfaceBuilder::triangles();
    let mut facet = [0u8; TRIANGLE_LEN];

    for i in 0..count {
        if is_cancelled(task) {
            break;
        }

        let n = fill(&mut reader, &mut facet)?;
        if n < TRIANGLE_LEN {
            return Err(SurfaceError::Truncated {
                expected: HEADER_LEN + 4 + count * TRIANGLE_LEN,
                found: HEADER_LEN + 4 + i * TRIANGLE_LEN + n,
            });
        }

        let vec = |k: usize| {
            let o = k * 12;
            (
                read_f32(&facet, o) as f64,
                read_f32(&facet, o + 4) as f64,
                read_f32(&facet, o + 8) as f64,
            )
        };

        let (nx, ny, nz) = vec(0);
        let points = [1, 2, 3].map(|k| {
            let (x, y, z) = vec(k);
            Point3::new(x, y, z)
        });
        builder.add_element_with_normal(&points, &Vec3::new(nx, ny, nz))?;
        report(task, i + 1, count);
    }

    Ok(builder)
}

fn parse_floats<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<[f64; 3]> {
    let mut out = [0.0; 3];
    for v in &mut out {
        let token = tokens
            .next()
            .ok_or_else(|| SurfaceError::InvalidStl(format!("unexpected end of {}", what)))?;
        *v = token
            .parse()
            .map_err(|_| SurfaceError::InvalidStl(format!("invalid {} value '{}'", what, token)))?;
    }
    Ok(out)
}

fn read_ascii(text: &str, task: Option<&Task>) -> Result<SurfaceBuilder> {
    let mut builder = SurfaceBuilder::triangles();
    let total = text.len();
    let mut tokens = text.split_whitespace();

    let mut normal = Vec3::zeros();
    let mut points: Vec<Point3> = Vec::with_capacity(3);
    let mut in_facet = false;
    let mut consumed = 0;

    while let Some(token) = tokens.next() {
        consumed += token.len() + 1;
        match token {
            "facet" => {
                if is_cancelled(task) {
                    break;
                }
                match tokens.next() {
                    Some("normal") => {}
                    other => {
                        return Err(SurfaceError::InvalidStl(format!(
                            "expected 'normal' after 'facet', found {:?}",
                            other
                        )))
                    }
                }
                let [x, y, z] = parse_floats(&mut tokens, "normal")?;
                normal = Vec3::new(x, y, z);
                points.clear();
                in_facet = true;
            }
            "vertex" => {
                if !in_facet {
                    return Err(SurfaceError::InvalidStl("vertex outside facet".into()));
                }
                let [x, y, z] = parse_floats(&mut tokens, "vertex")?;
                points.push(Point3::new(x, y, z));
            }
            "endfacet" => {
                if points.len() != 3 {
                    return Err(SurfaceError::InvalidStl(format!(
                        "facet with {} vertices",
                        points.len()
                    )));
                }
                builder.add_element_with_normal(&points, &normal)?;
                in_facet = false;
                report(task, consumed.min(total), total);
            }
            _ => {}
        }
    }

    if in_facet && !is_cancelled(task) {
        return Err(SurfaceError::InvalidStl("unterminated facet".into()));
    }
    Ok(builder)
}

/// Write a surface as STL in element order.
///
/// Quads are written as two triangles. Each facet takes the normal of its
/// first vertex. If `task` is cancelled the output is incomplete.
pub fn write_stl<W, S>(surface: &S, writer: W, format: StlFormat, task: Option<&Task>) -> Result<()>
where
    W: Write,
    S: SurfaceView + ?Sized,
{
    if let Some(task) = task {
        task.update(0.0, "Writing STL");
    }

    let mut out = BufWriter::new(writer);
    let triangles = match format {
        StlFormat::Binary => write_binary(surface, &mut out, task)?,
        StlFormat::Ascii => write_ascii(surface, &mut out, task)?,
    };
    out.flush()?;

    log::debug!("wrote {} triangles as {:?} STL", triangles, format);
    Ok(())
}

/// Triangle count for the binary header, which only holds a `u32`.
fn facet_count(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| {
        SurfaceError::InvalidStl(format!("{} triangles do not fit a binary STL", count))
    })
}

/// Vertex index triples making up each element.
fn split(dim: usize) -> &'static [[usize; 3]] {
    if dim == 4 {
        &[[0, 1, 2], [0, 2, 3]]
    } else {
        &[[0, 1, 2]]
    }
}

fn write_binary<W: Write, S: SurfaceView + ?Sized>(
    surface: &S,
    out: &mut W,
    task: Option<&Task>,
) -> Result<usize> {
    let parts = split(surface.dim());
    let count = surface.count() * parts.len();

    let mut header = [b' '; HEADER_LEN];
    let name = format!("{} STL export", STL_NAME);
    header[..name.len()].copy_from_slice(name.as_bytes());
    out.write_all(&header)?;
    out.write_all(&facet_count(count)?.to_le_bytes())?;

    let total = surface.count();
    for (i, e) in surface.elements().enumerate() {
        if is_cancelled(task) {
            break;
        }
        for tri in parts {
            for c in e.raw_normal(tri[0]) {
                out.write_all(&c.to_le_bytes())?;
            }
            for &v in tri {
                for c in e.raw_vertex(v) {
                    out.write_all(&c.to_le_bytes())?;
                }
            }
            out.write_all(&0u16.to_le_bytes())?;
        }
        report(task, i + 1, total);
    }

    Ok(count)
}

fn write_ascii<W: Write, S: SurfaceView + ?Sized>(
    surface: &S,
    out: &mut W,
    task: Option<&Task>,
) -> Result<usize> {
    let parts = split(surface.dim());
    let total = surface.count();
    let mut written = 0;

    writeln!(out, "solid {}", STL_NAME)?;
    for (i, e) in surface.elements().enumerate() {
        if is_cancelled(task) {
            break;
        }
        for tri in parts {
            let [nx, ny, nz] = e.raw_normal(tri[0]);
            writeln!(out, "  facet normal {} {} {}", nx, ny, nz)?;
            writeln!(out, "    outer loop")?;
            for &v in tri {
                let [x, y, z] = e.raw_vertex(v);
                writeln!(out, "      vertex {} {} {}", x, y, z)?;
            }
            writeln!(out, "    endloop")?;
            writeln!(out, "  endfacet")?;
            written += 1;
        }
        report(task, i + 1, total);
    }
    writeln!(out, "endsolid {}", STL_NAME)?;

    Ok(written)
}
