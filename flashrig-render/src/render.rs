use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{Context, Result};
use flashrig_core::{FrameState, SceneMode, StimulusKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect,
    Transform,
};

/// Visual parameters the renderer needs, lifted out of the session config.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub background: [u8; 4],
    pub stimulus_color: [u8; 4],
    pub fixation_color: [u8; 4],
    pub dim_opacity: f32,
    pub photosensor_pos: (f32, f32),
    pub photosensor_size: f32,
    pub status_pos: (f32, f32),
    pub fixation_center: (f32, f32),
    /// Coordinate space the layout geometry was authored in; positions are
    /// scaled from this onto the actual surface.
    pub design_size: (f32, f32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: [0, 0, 0, 255],
            stimulus_color: [255, 255, 255, 255],
            fixation_color: [200, 40, 40, 255],
            dim_opacity: 0.5,
            photosensor_pos: (1230.0, 50.0),
            photosensor_size: 80.0,
            status_pos: (40.0, 40.0),
            fixation_center: (640.0, 360.0),
            design_size: (1280.0, 720.0),
        }
    }
}

const STATUS_FONT_PX: f32 = 24.0;
const PAUSE_FONT_PX: f32 = 96.0;

/// Draws one [`FrameState`] at a time onto an internal pixmap. Glyph and
/// image rasterizations are cached across frames.
pub struct SceneRenderer {
    width: u32,
    height: u32,
    font: FontVec,
    options: RenderOptions,
    canvas: Pixmap,
    text_cache: HashMap<(String, u32), Pixmap>,
    image_cache: HashMap<PathBuf, Option<Pixmap>>,
}

impl SceneRenderer {
    pub fn new(width: u32, height: u32, font_path: &Path, options: RenderOptions) -> Result<Self> {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("cannot read font {}", font_path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("cannot parse font {}", font_path.display()))?;
        let canvas = Pixmap::new(width.max(1), height.max(1)).context("canvas allocation")?;
        Ok(Self {
            width: width.max(1),
            height: height.max(1),
            font,
            options,
            canvas,
            text_cache: HashMap::new(),
            image_cache: HashMap::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.canvas = Pixmap::new(self.width, self.height).expect("canvas allocation");
    }

    /// Render `frame` and copy the pixels into `out` (RGBA, row-major,
    /// surface-sized).
    pub fn render_frame(&mut self, frame: &FrameState, out: &mut [u8]) -> Result<()> {
        self.draw(frame);
        let data = self.canvas.data();
        if out.len() == data.len() {
            out.copy_from_slice(data);
        } else {
            // surface momentarily out of step with the canvas (mid-resize)
            let n = out.len().min(data.len());
            out[..n].copy_from_slice(&data[..n]);
        }
        Ok(())
    }

    /// Render `frame` and save it as a PNG.
    pub fn screenshot(&mut self, frame: &FrameState, path: &Path) -> Result<()> {
        self.draw(frame);
        let img = image::RgbaImage::from_raw(self.width, self.height, self.canvas.data().to_vec())
            .context("canvas to image")?;
        img.save(path)
            .with_context(|| format!("cannot save screenshot {}", path.display()))?;
        log::info!("screenshot saved to {}", path.display());
        Ok(())
    }

    fn scale(&self) -> (f32, f32) {
        (
            self.width as f32 / self.options.design_size.0,
            self.height as f32 / self.options.design_size.1,
        )
    }

    fn draw(&mut self, frame: &FrameState) {
        let (sx, sy) = self.scale();
        let ssize = sx.min(sy);
        let [br, bg, bb, ba] = self.options.background;
        self.canvas.fill(Color::from_rgba8(br, bg, bb, ba));

        for stimulus in frame.stimuli.iter().filter(|s| s.visible) {
            let pos = (stimulus.position.0 * sx, stimulus.position.1 * sy);
            let size = stimulus.size * ssize;
            let opacity = stimulus.opacity(self.options.dim_opacity);
            match &stimulus.kind {
                StimulusKind::Text => {
                    self.blit_text(&stimulus.label, size, pos, opacity);
                }
                StimulusKind::Image { path, .. } => {
                    if self.image_pixmap(path).is_some() {
                        self.blit_image(path.clone(), size, pos, opacity);
                    } else {
                        // fall back to a plain disc when the file is unreadable
                        self.fill_circle(pos, size / 2.0, self.options.stimulus_color, opacity);
                    }
                }
            }
        }

        if frame.show_fixation && frame.mode != SceneMode::Pause {
            let center = (
                self.options.fixation_center.0 * sx,
                self.options.fixation_center.1 * sy,
            );
            self.fill_circle(center, 6.0 * ssize, self.options.fixation_color, 1.0);
        }

        if frame.mode == SceneMode::Flash {
            self.fill_photosensor(sx, sy);
        }

        if frame.mode == SceneMode::Pause {
            let center = (self.width as f32 / 2.0, self.height as f32 / 2.0);
            self.blit_text("PAUSE", PAUSE_FONT_PX * ssize, center, 1.0);
        }

        if !frame.status.is_empty() {
            self.draw_status(&frame.status, sx, sy, ssize);
        }
    }

    fn draw_status(&mut self, status: &str, sx: f32, sy: f32, ssize: f32) {
        let size = STATUS_FONT_PX * ssize;
        let line_height = size * 1.25;
        let origin = (
            self.options.status_pos.0 * sx,
            self.options.status_pos.1 * sy,
        );
        for (i, line) in status.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            // status anchors top-left rather than centered
            let key = self.ensure_text(line, size);
            let pm = &self.text_cache[&key];
            let (w, h) = (pm.width() as f32, pm.height() as f32);
            let pos = (
                origin.0 + w / 2.0,
                origin.1 + i as f32 * line_height + h / 2.0,
            );
            self.blit_text(line, size, pos, 1.0);
        }
    }

    fn fill_photosensor(&mut self, sx: f32, sy: f32) {
        let half = self.options.photosensor_size / 2.0;
        let (cx, cy) = (
            self.options.photosensor_pos.0 * sx,
            self.options.photosensor_pos.1 * sy,
        );
        if let Some(rect) = Rect::from_xywh(
            cx - half * sx,
            cy - half * sy,
            self.options.photosensor_size * sx,
            self.options.photosensor_size * sy,
        ) {
            let mut paint = Paint::default();
            paint.set_color(Color::from_rgba8(255, 255, 255, 255));
            self.canvas
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: [u8; 4], opacity: f32) {
        let mut pb = PathBuilder::new();
        pb.push_circle(center.0, center.1, radius.max(1.0));
        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            let [r, g, b, a] = color;
            paint.set_color(Color::from_rgba8(
                r,
                g,
                b,
                (a as f32 * opacity).clamp(0.0, 255.0) as u8,
            ));
            paint.anti_alias = true;
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn blit_text(&mut self, text: &str, size: f32, center: (f32, f32), opacity: f32) {
        let key = self.ensure_text(text, size);
        let pm = &self.text_cache[&key];
        let x = center.0 as i32 - pm.width() as i32 / 2;
        let y = center.1 as i32 - pm.height() as i32 / 2;
        let paint = PixmapPaint {
            opacity,
            ..PixmapPaint::default()
        };
        self.canvas
            .draw_pixmap(x, y, pm.as_ref(), &paint, Transform::identity(), None);
    }

    fn blit_image(&mut self, path: PathBuf, size: f32, center: (f32, f32), opacity: f32) {
        let Some(Some(pm)) = self.image_cache.get(&path) else {
            return;
        };
        let longest = pm.width().max(pm.height()) as f32;
        let scale = if longest > 0.0 { size / longest } else { 1.0 };
        let (w, h) = (pm.width() as f32 * scale, pm.height() as f32 * scale);
        let transform = Transform::from_scale(scale, scale)
            .post_translate(center.0 - w / 2.0, center.1 - h / 2.0);
        let paint = PixmapPaint {
            opacity,
            ..PixmapPaint::default()
        };
        self.canvas
            .draw_pixmap(0, 0, pm.as_ref(), &paint, transform, None);
    }

    fn ensure_text(&mut self, text: &str, size: f32) -> (String, u32) {
        let key = (text.to_string(), size.round() as u32);
        if !self.text_cache.contains_key(&key) {
            let pm = render_text_pixmap(text, size, &self.font, self.options.stimulus_color);
            self.text_cache.insert(key.clone(), pm);
        }
        key
    }

    fn image_pixmap(&mut self, path: &Path) -> Option<&Pixmap> {
        if !self.image_cache.contains_key(path) {
            let loaded = match image::open(path) {
                Ok(img) => {
                    let rgba = img.into_rgba8();
                    let (w, h) = rgba.dimensions();
                    let mut data = rgba.into_raw();
                    // tiny-skia blits premultiplied alpha
                    for px in data.chunks_exact_mut(4) {
                        let a = px[3] as u16;
                        px[0] = (px[0] as u16 * a / 255) as u8;
                        px[1] = (px[1] as u16 * a / 255) as u8;
                        px[2] = (px[2] as u16 * a / 255) as u8;
                    }
                    tiny_skia::IntSize::from_wh(w, h)
                        .and_then(|size| Pixmap::from_vec(data, size))
                }
                Err(e) => {
                    log::warn!("cannot load stimulus image {}: {e}", path.display());
                    None
                }
            };
            self.image_cache.insert(path.to_path_buf(), loaded);
        }
        self.image_cache.get(path).and_then(Option::as_ref)
    }
}

/// Rasterize a line of text into a tight transparent pixmap.
fn render_text_pixmap(text: &str, font_size: f32, font: &FontVec, color: [u8; 4]) -> Pixmap {
    let scale = PxScale::from(font_size.max(1.0));
    let scaled = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += scaled.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, scaled.ascent()),
        });
        pen_x += scaled.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(outlined) = font.outline_glyph(g.clone()) {
            let b = outlined.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        return Pixmap::new(1, 1).expect("pixmap");
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h).expect("pixmap");
    let stride = pm.width() as usize;
    let pixels = pm.pixels_mut();

    for g in &glyphs {
        if let Some(outlined) = font.outline_glyph(g.clone()) {
            let b = outlined.px_bounds();
            outlined.draw(|x, y, coverage| {
                if coverage <= f32::EPSILON {
                    return;
                }
                let fx = x as f32 + b.min.x - min_x;
                let fy = y as f32 + b.min.y - min_y;
                let ix = fx.floor() as i32;
                let iy = fy.floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;

                let alpha = (coverage * color[3] as f32).clamp(0.0, 255.0) as u8;
                if alpha <= pixels[i].alpha() {
                    return;
                }
                let pr = (color[0] as u16 * alpha as u16 / 255) as u8;
                let pg = (color[1] as u16 * alpha as u16 / 255) as u8;
                let pb = (color[2] as u16 * alpha as u16 / 255) as u8;
                if let Some(px) = PremultipliedColorU8::from_rgba(pr, pg, pb, alpha) {
                    pixels[i] = px;
                }
            });
        }
    }

    pm
}
