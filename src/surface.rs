//! FreeSurfer ASCII surface I/O.
//!
//! The surface geometry collaborator sits outside the markup core: it
//! consumes and produces the core's numeric [`Matrix`] model but involves no
//! markup parsing. The file layout, as understood by AFNI SUMA, is a comment
//! header, a `NV NF` counts line, `NV` vertex rows `x y z 0` and `NF` face
//! rows `i j k 0` (the trailing column is written as `0` and ignored on
//! read).
//!
//! ## Examples
//!
//! ```rust
//! use niml::surface::Surface;
//!
//! let s = Surface::from_arrays(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     vec![[0, 1, 2]],
//! );
//! let text = s.to_ascii(Some("# unit triangle"));
//! let back = Surface::parse_str(&text).unwrap();
//! assert_eq!(back.nvertices(), 3);
//! assert_eq!(back.nfaces(), 1);
//! ```

use std::io::{Read, Write};

use crate::element::Matrix;
use crate::error::{NimlError, Result};
use crate::types::NumericData;
use crate::write_all_checked;

/// A triangle mesh: vertex coordinates and face index triples, both stored
/// as the core's numeric matrices (`nvertices x 3` doubles, `nfaces x 3`
/// ints).
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    vertices: Matrix,
    faces: Matrix,
}

impl Surface {
    /// Builds a surface from coordinate triples and face index triples.
    #[must_use]
    pub fn from_arrays(vertices: Vec<[f64; 3]>, faces: Vec<[i32; 3]>) -> Self {
        let nv = vertices.len();
        let nf = faces.len();
        let v_flat: Vec<f64> = vertices.into_iter().flatten().collect();
        let f_flat: Vec<i32> = faces.into_iter().flatten().collect();
        Surface {
            // shapes are rows x 3 by construction
            vertices: Matrix::new(nv, 3, NumericData::Double(v_flat))
                .unwrap_or_else(|_| unreachable!("vertex triples are rows x 3")),
            faces: Matrix::new(nf, 3, NumericData::Int(f_flat))
                .unwrap_or_else(|_| unreachable!("face triples are rows x 3")),
        }
    }

    /// Builds a surface from already-assembled matrices, checking that both
    /// have three columns.
    pub fn new(vertices: Matrix, faces: Matrix) -> Result<Self> {
        for m in [&vertices, &faces] {
            if m.cols() != 3 {
                return Err(NimlError::ColumnCountMismatch {
                    expected: 3,
                    found: m.cols(),
                });
            }
        }
        Ok(Surface { vertices, faces })
    }

    /// Number of vertices.
    #[must_use]
    pub fn nvertices(&self) -> usize {
        self.vertices.rows()
    }

    /// Number of faces.
    #[must_use]
    pub fn nfaces(&self) -> usize {
        self.faces.rows()
    }

    /// The `nvertices x 3` coordinate matrix.
    #[must_use]
    pub fn vertices(&self) -> &Matrix {
        &self.vertices
    }

    /// The `nfaces x 3` face index matrix.
    #[must_use]
    pub fn faces(&self) -> &Matrix {
        &self.faces
    }

    /// Parses a FreeSurfer ASCII surface.
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim_start().starts_with('#'));

        let counts = lines
            .by_ref()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| NimlError::malformed(0, "missing vertex/face counts", String::new()))?;
        let mut it = counts.split_whitespace();
        let nv: usize = it
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| NimlError::invalid_value("vertex count", counts))?;
        let nf: usize = it
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| NimlError::invalid_value("face count", counts))?;

        let mut v_flat = Vec::with_capacity(nv * 3);
        let mut f_flat = Vec::with_capacity(nf * 3);
        let mut rows = 0usize;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split_whitespace().collect();
            if cells.len() < 3 {
                return Err(NimlError::ColumnCountMismatch {
                    expected: 3,
                    found: cells.len(),
                });
            }
            if rows < nv {
                for cell in &cells[..3] {
                    v_flat.push(
                        cell.parse::<f64>()
                            .map_err(|_| NimlError::invalid_value("vertex coordinate", cell))?,
                    );
                }
            } else if rows < nv + nf {
                for cell in &cells[..3] {
                    // faces may be written as floats; truncate like the readers do
                    let value = cell
                        .parse::<i32>()
                        .or_else(|_| cell.parse::<f64>().map(|f| f as i32))
                        .map_err(|_| NimlError::invalid_value("face index", cell))?;
                    f_flat.push(value);
                }
            }
            rows += 1;
        }
        if rows < nv + nf {
            return Err(NimlError::RowCountMismatch {
                expected: nv + nf,
                found: rows,
            });
        }

        Ok(Surface {
            vertices: Matrix::new(nv, 3, NumericData::Double(v_flat))?,
            faces: Matrix::new(nf, 3, NumericData::Int(f_flat))?,
        })
    }

    /// Reads a surface from any reader (the whole input is buffered first).
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text).map_err(NimlError::io)?;
        Self::parse_str(&text)
    }

    /// Renders the surface in FreeSurfer ASCII form with an optional leading
    /// comment line.
    #[must_use]
    pub fn to_ascii(&self, comment: Option<&str>) -> String {
        let mut lines = Vec::with_capacity(2 + self.nvertices() + self.nfaces());
        if let Some(comment) = comment {
            lines.push(comment.to_string());
        }
        lines.push(format!("{} {}", self.nvertices(), self.nfaces()));
        for r in 0..self.nvertices() {
            let d = self.vertices.data();
            lines.push(format!(
                "{} {} {} 0",
                d.format_value(r * 3),
                d.format_value(r * 3 + 1),
                d.format_value(r * 3 + 2)
            ));
        }
        for r in 0..self.nfaces() {
            let d = self.faces.data();
            lines.push(format!(
                "{} {} {} 0",
                d.format_value(r * 3),
                d.format_value(r * 3 + 1),
                d.format_value(r * 3 + 2)
            ));
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// Writes the surface to a writer, reporting `ShortWrite` if fewer bytes
    /// land than were produced.
    pub fn write_to<W: Write>(&self, writer: W, comment: Option<&str>) -> Result<()> {
        write_all_checked(writer, self.to_ascii(comment).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "# created by a test\n4 4\n0 0 0 0\n1 0 0 0\n0 1 0 0\n0 0 1 0\n0 1 2 0\n0 1 3 0\n0 2 3 0\n1 2 3 0\n";

    #[test]
    fn parse_counts_and_shape() {
        let s = Surface::parse_str(TETRA).unwrap();
        assert_eq!(s.nvertices(), 4);
        assert_eq!(s.nfaces(), 4);
        assert_eq!(s.vertices().cols(), 3);
        assert_eq!(s.faces().data(), &NumericData::Int(vec![
            0, 1, 2, 0, 1, 3, 0, 2, 3, 1, 2, 3,
        ]));
    }

    #[test]
    fn ascii_roundtrip() {
        let s = Surface::from_arrays(
            vec![[0.25, -1.5, 3.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        );
        let back = Surface::parse_str(&s.to_ascii(None)).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn truncated_file_fails() {
        let text = "3 1\n0 0 0 0\n1 0 0 0\n";
        assert!(matches!(
            Surface::parse_str(text),
            Err(NimlError::RowCountMismatch { .. })
        ));
    }

    #[test]
    fn non_triple_matrices_rejected() {
        let v = Matrix::new(1, 2, NumericData::Double(vec![0.0, 1.0])).unwrap();
        let f = Matrix::new(0, 3, NumericData::Int(vec![])).unwrap();
        assert!(matches!(
            Surface::new(v, f),
            Err(NimlError::ColumnCountMismatch { expected: 3, found: 2 })
        ));
    }
}
