//! Native rasterization: SVG markup to PNG through usvg/resvg, and the
//! small-grid logo sampler used for contrast analysis.

use std::io::Cursor;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tiny_skia::{Pixmap, Transform};

use super::ExportError;
use crate::core::contrast::SAMPLE_GRID;

static FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!("[export] loaded {} font faces", db.len());
    Arc::new(db)
});

fn parse_tree(data: &[u8]) -> Result<usvg::Tree, String> {
    let mut options = usvg::Options::default();
    options.fontdb = FONTS.clone();
    usvg::Tree::from_data(data, &options).map_err(|err| err.to_string())
}

/// Renders `data` scaled to fit a `width` x `height` canvas, centered.
fn render_pixmap(data: &[u8], width: u32, height: u32) -> Result<Pixmap, String> {
    let tree = parse_tree(data)?;
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| format!("invalid canvas {width}x{height}"))?;
    let size = tree.size();
    let scale = (width as f32 / size.width()).min(height as f32 / size.height());
    let dx = (width as f32 - size.width() * scale) / 2.0;
    let dy = (height as f32 - size.height() * scale) / 2.0;
    resvg::render(
        &tree,
        Transform::from_row(scale, 0.0, 0.0, scale, dx, dy),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

fn straight_rgba(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .write_header()
            .map_err(|err| ExportError::Encode(err.to_string()))?
            .write_image_data(rgba)
            .map_err(|err| ExportError::Encode(err.to_string()))?;
    }
    Ok(buffer)
}

/// Rasterizes SVG markup into a PNG of exactly `width` x `height`.
pub fn render_png(svg: &str, width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
    let pixmap = render_pixmap(svg.as_bytes(), width, height).map_err(ExportError::Rasterize)?;
    encode_png(width, height, &straight_rgba(&pixmap))
}

/// Decodes a PNG into straight RGBA8.
fn decode_png(bytes: &[u8]) -> Option<(u32, u32, Vec<u8>)> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().ok()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).ok()?;
    let data = &buf[..info.buffer_size()];
    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => data.to_vec(),
        png::ColorType::Rgb => data.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
        png::ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::GrayscaleAlpha => {
            data.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect()
        }
        png::ColorType::Indexed => return None,
    };
    Some((info.width, info.height, rgba))
}

/// Nearest-neighbour resample of straight RGBA onto a square grid.
fn resample(width: u32, height: u32, rgba: &[u8], side: u32) -> Option<Vec<u8>> {
    if width == 0 || height == 0 || rgba.len() < (width * height * 4) as usize {
        return None;
    }
    let mut out = Vec::with_capacity((side * side * 4) as usize);
    for y in 0..side {
        let sy = (u64::from(y) * u64::from(height) / u64::from(side)) as u32;
        for x in 0..side {
            let sx = (u64::from(x) * u64::from(width) / u64::from(side)) as u32;
            let idx = ((sy * width + sx) * 4) as usize;
            out.extend_from_slice(&rgba[idx..idx + 4]);
        }
    }
    Some(out)
}

/// Logo pixels on the contrast grid; `None` for anything undecodable.
pub fn sample_rgba(bytes: &[u8], is_svg: bool) -> Option<Vec<u8>> {
    if is_svg {
        return match render_pixmap(bytes, SAMPLE_GRID, SAMPLE_GRID) {
            Ok(pixmap) => Some(straight_rgba(&pixmap)),
            Err(err) => {
                tracing::debug!("[contrast] svg logo unreadable: {err}");
                None
            }
        };
    }
    let (width, height, rgba) = decode_png(bytes)?;
    resample(width, height, &rgba, SAMPLE_GRID)
}
