//! PLY point-cloud parsing
//!
//! Header-driven parser for the vertex element of ascii and
//! binary_little_endian PLY files. Positions come from `x`/`y`/`z` float
//! properties; per-point colors from `red`/`green`/`blue` uchar properties
//! when present. Other scalar vertex properties are skipped by stride;
//! elements after the vertex data (faces, edges) are ignored.

use crate::error::{Result, ViewerError};
use crate::geometry::PointCloud;
use glam::Vec3;

/// Color assigned when the file carries no per-point colors
pub const DEFAULT_COLOR: [u8; 3] = [180, 180, 180];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "char" | "int8" => Self::Char,
            "uchar" | "uint8" => Self::UChar,
            "short" | "int16" => Self::Short,
            "ushort" | "uint16" => Self::UShort,
            "int" | "int32" => Self::Int,
            "uint" | "uint32" => Self::UInt,
            "float" | "float32" => Self::Float,
            "double" | "float64" => Self::Double,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    fn read_le(self, bytes: &[u8]) -> f64 {
        match self {
            Self::Char => bytes[0] as i8 as f64,
            Self::UChar => bytes[0] as f64,
            Self::Short => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::UShort => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::Int => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::UInt => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::Float => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::Double => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }
}

struct Header {
    format: PlyFormat,
    vertex_count: usize,
    properties: Vec<(String, ScalarType)>,
    /// Byte offset of the first vertex datum
    data_offset: usize,
}

/// Parse PLY bytes into a point cloud
pub fn parse_point_cloud(bytes: &[u8]) -> Result<PointCloud> {
    let header = parse_header(bytes)?;
    let data = &bytes[header.data_offset..];
    match header.format {
        PlyFormat::Ascii => parse_ascii_vertices(&header, data),
        PlyFormat::BinaryLittleEndian => parse_binary_vertices(&header, data),
    }
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    let mut format = None;
    let mut vertex_count = None;
    let mut properties = Vec::new();
    // None = outside any element; Some(true) = inside vertex element
    let mut in_vertex_element: Option<bool> = None;

    let mut offset = 0usize;
    let mut first_line = true;

    while offset < bytes.len() {
        let line_end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p)
            .ok_or_else(|| ViewerError::ParseError("header not terminated".to_string()))?;
        let line = std::str::from_utf8(&bytes[offset..line_end])
            .map_err(|_| ViewerError::ParseError("header is not valid ASCII".to_string()))?
            .trim_end_matches('\r')
            .trim();
        offset = line_end + 1;

        if first_line {
            if line != "ply" {
                return Err(ViewerError::ParseError("missing `ply` magic".to_string()));
            }
            first_line = false;
            continue;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("format") => {
                format = Some(match words.next() {
                    Some("ascii") => PlyFormat::Ascii,
                    Some("binary_little_endian") => PlyFormat::BinaryLittleEndian,
                    Some(other) => {
                        return Err(ViewerError::Unsupported(format!("format {}", other)))
                    }
                    None => return Err(ViewerError::ParseError("bare format line".to_string())),
                });
            }
            Some("comment") | Some("obj_info") => {}
            Some("element") => {
                let name = words.next().unwrap_or_default();
                let count: usize = words
                    .next()
                    .and_then(|w| w.parse().ok())
                    .ok_or_else(|| ViewerError::ParseError("bad element count".to_string()))?;
                if name == "vertex" {
                    if vertex_count.is_some() {
                        return Err(ViewerError::ParseError(
                            "duplicate vertex element".to_string(),
                        ));
                    }
                    vertex_count = Some(count);
                    in_vertex_element = Some(true);
                } else {
                    if vertex_count.is_none() {
                        // We locate vertex data by stride from the header end,
                        // so nothing may precede it.
                        return Err(ViewerError::Unsupported(format!(
                            "element `{}` before vertex data",
                            name
                        )));
                    }
                    in_vertex_element = Some(false);
                }
            }
            Some("property") => match in_vertex_element {
                Some(true) => {
                    let kind_word = words
                        .next()
                        .ok_or_else(|| ViewerError::ParseError("bare property".to_string()))?;
                    if kind_word == "list" {
                        return Err(ViewerError::Unsupported(
                            "list property in vertex element".to_string(),
                        ));
                    }
                    let kind = ScalarType::from_keyword(kind_word).ok_or_else(|| {
                        ViewerError::Unsupported(format!("property type {}", kind_word))
                    })?;
                    let name = words
                        .next()
                        .ok_or_else(|| ViewerError::ParseError("unnamed property".to_string()))?;
                    properties.push((name.to_string(), kind));
                }
                Some(false) => {}
                None => {
                    return Err(ViewerError::ParseError(
                        "property outside any element".to_string(),
                    ))
                }
            },
            Some("end_header") => {
                let format = format
                    .ok_or_else(|| ViewerError::ParseError("missing format line".to_string()))?;
                let vertex_count = vertex_count
                    .ok_or_else(|| ViewerError::ParseError("missing vertex element".to_string()))?;
                let header = Header {
                    format,
                    vertex_count,
                    properties,
                    data_offset: offset,
                };
                validate_layout(&header)?;
                return Ok(header);
            }
            Some(other) => {
                return Err(ViewerError::ParseError(format!(
                    "unrecognized header line `{}`",
                    other
                )))
            }
            None => {}
        }
    }

    Err(ViewerError::ParseError("header not terminated".to_string()))
}

fn validate_layout(header: &Header) -> Result<()> {
    for axis in ["x", "y", "z"] {
        match find_property(header, axis) {
            Some((_, ScalarType::Float | ScalarType::Double)) => {}
            Some(_) => {
                return Err(ViewerError::Unsupported(format!(
                    "non-float `{}` coordinate",
                    axis
                )))
            }
            None => {
                return Err(ViewerError::ParseError(format!(
                    "missing `{}` coordinate property",
                    axis
                )))
            }
        }
    }
    Ok(())
}

fn find_property(header: &Header, name: &str) -> Option<(usize, ScalarType)> {
    header
        .properties
        .iter()
        .position(|(n, _)| n == name)
        .map(|i| (i, header.properties[i].1))
}

/// Indices of the color properties, if the file carries uchar RGB
fn color_indices(header: &Header) -> Option<[usize; 3]> {
    let mut indices = [0usize; 3];
    for (slot, name) in ["red", "green", "blue"].iter().enumerate() {
        match find_property(header, name) {
            Some((i, ScalarType::UChar)) => indices[slot] = i,
            _ => return None,
        }
    }
    Some(indices)
}

fn parse_ascii_vertices(header: &Header, data: &[u8]) -> Result<PointCloud> {
    let text = std::str::from_utf8(data)
        .map_err(|_| ViewerError::ParseError("ascii body is not valid UTF-8".to_string()))?;

    let (xi, _) = find_property(header, "x").expect("validated");
    let (yi, _) = find_property(header, "y").expect("validated");
    let (zi, _) = find_property(header, "z").expect("validated");
    let colors_at = color_indices(header);

    let mut cloud = PointCloud::with_capacity(header.vertex_count);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    for row in 0..header.vertex_count {
        let line = lines.next().ok_or_else(|| {
            ViewerError::ParseError(format!(
                "expected {} vertices, found {}",
                header.vertex_count, row
            ))
        })?;
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|w| {
                w.parse::<f64>().map_err(|_| {
                    ViewerError::ParseError(format!("non-numeric value `{}` in vertex {}", w, row))
                })
            })
            .collect::<Result<_>>()?;
        if values.len() < header.properties.len() {
            return Err(ViewerError::ParseError(format!(
                "vertex {} has {} values, expected {}",
                row,
                values.len(),
                header.properties.len()
            )));
        }

        cloud.positions.push(Vec3::new(
            values[xi] as f32,
            values[yi] as f32,
            values[zi] as f32,
        ));
        cloud.colors.push(match colors_at {
            Some([r, g, b]) => [values[r] as u8, values[g] as u8, values[b] as u8],
            None => DEFAULT_COLOR,
        });
    }

    Ok(cloud)
}

fn parse_binary_vertices(header: &Header, data: &[u8]) -> Result<PointCloud> {
    let stride: usize = header.properties.iter().map(|(_, k)| k.size()).sum();
    let needed = stride * header.vertex_count;
    if data.len() < needed {
        return Err(ViewerError::ParseError(format!(
            "truncated vertex data: {} bytes, need {}",
            data.len(),
            needed
        )));
    }

    // Byte offset of each property within one vertex record
    let mut offsets = Vec::with_capacity(header.properties.len());
    let mut at = 0usize;
    for (_, kind) in &header.properties {
        offsets.push(at);
        at += kind.size();
    }

    let read = |record: &[u8], index: usize| -> f64 {
        let (_, kind) = header.properties[index];
        kind.read_le(&record[offsets[index]..])
    };

    let (xi, _) = find_property(header, "x").expect("validated");
    let (yi, _) = find_property(header, "y").expect("validated");
    let (zi, _) = find_property(header, "z").expect("validated");
    let colors_at = color_indices(header);

    let mut cloud = PointCloud::with_capacity(header.vertex_count);
    for row in 0..header.vertex_count {
        let record = &data[row * stride..(row + 1) * stride];
        cloud.positions.push(Vec3::new(
            read(record, xi) as f32,
            read(record, yi) as f32,
            read(record, zi) as f32,
        ));
        cloud.colors.push(match colors_at {
            Some([r, g, b]) => [
                read(record, r) as u8,
                read(record, g) as u8,
                read(record, b) as u8,
            ],
            None => DEFAULT_COLOR,
        });
    }

    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_ply() -> Vec<u8> {
        b"ply\n\
          format ascii 1.0\n\
          comment made by a test\n\
          element vertex 3\n\
          property float x\n\
          property float y\n\
          property float z\n\
          property uchar red\n\
          property uchar green\n\
          property uchar blue\n\
          end_header\n\
          0 0 0 255 0 0\n\
          1 0 0 0 255 0\n\
          0 2 0 0 0 255\n"
            .to_vec()
    }

    fn binary_ply() -> Vec<u8> {
        let mut bytes = b"ply\n\
            format binary_little_endian 1.0\n\
            element vertex 2\n\
            property float x\n\
            property float y\n\
            property float z\n\
            property uchar red\n\
            property uchar green\n\
            property uchar blue\n\
            end_header\n"
            .to_vec();
        for (pos, color) in [
            ([1.0f32, 2.0, 3.0], [10u8, 20, 30]),
            ([-1.0, -2.0, -3.0], [40, 50, 60]),
        ] {
            for v in pos {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            bytes.extend_from_slice(&color);
        }
        bytes
    }

    #[test]
    fn parses_ascii_vertices_and_colors() {
        let cloud = parse_point_cloud(&ascii_ply()).unwrap();
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.positions[1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(cloud.colors[0], [255, 0, 0]);
        assert_eq!(cloud.colors[2], [0, 0, 255]);
    }

    #[test]
    fn parses_binary_little_endian() {
        let cloud = parse_point_cloud(&binary_ply()).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.positions[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cloud.positions[1], Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(cloud.colors[1], [40, 50, 60]);
    }

    #[test]
    fn skips_unknown_scalar_properties_by_stride() {
        let mut bytes = b"ply\n\
            format binary_little_endian 1.0\n\
            element vertex 1\n\
            property float x\n\
            property float confidence\n\
            property float y\n\
            property float z\n\
            end_header\n"
            .to_vec();
        for v in [5.0f32, 0.99, 6.0, 7.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let cloud = parse_point_cloud(&bytes).unwrap();
        assert_eq!(cloud.positions[0], Vec3::new(5.0, 6.0, 7.0));
        assert_eq!(cloud.colors[0], DEFAULT_COLOR);
    }

    #[test]
    fn faces_after_vertices_are_ignored() {
        let mut ply = String::from(
            "ply\nformat ascii 1.0\nelement vertex 1\n\
             property float x\nproperty float y\nproperty float z\n\
             element face 1\nproperty list uchar int vertex_indices\n\
             end_header\n",
        );
        ply.push_str("1 2 3\n");
        ply.push_str("3 0 0 0\n");
        let cloud = parse_point_cloud(ply.as_bytes()).unwrap();
        assert_eq!(cloud.len(), 1);
    }

    #[test]
    fn rejects_missing_magic() {
        let err = parse_point_cloud(b"not a ply\n").unwrap_err();
        assert!(matches!(err, ViewerError::ParseError(_)));
    }

    #[test]
    fn rejects_truncated_binary_body() {
        let mut bytes = binary_ply();
        bytes.truncate(bytes.len() - 5);
        let err = parse_point_cloud(&bytes).unwrap_err();
        assert!(matches!(err, ViewerError::ParseError(_)));
    }

    #[test]
    fn rejects_missing_coordinates() {
        let ply = b"ply\nformat ascii 1.0\nelement vertex 1\n\
            property float x\nproperty float y\nend_header\n1 2\n";
        let err = parse_point_cloud(ply).unwrap_err();
        assert!(matches!(err, ViewerError::ParseError(_)));
    }

    #[test]
    fn rejects_big_endian() {
        let ply = b"ply\nformat binary_big_endian 1.0\nelement vertex 0\n\
            property float x\nproperty float y\nproperty float z\nend_header\n";
        let err = parse_point_cloud(ply).unwrap_err();
        assert!(matches!(err, ViewerError::Unsupported(_)));
    }

    #[test]
    fn rejects_non_numeric_ascii_value() {
        let ply = b"ply\nformat ascii 1.0\nelement vertex 1\n\
            property float x\nproperty float y\nproperty float z\nend_header\n1 oops 3\n";
        let err = parse_point_cloud(ply).unwrap_err();
        assert!(matches!(err, ViewerError::ParseError(_)));
    }
}
