/// Locates and decodes a QR payload in an 8-bit grayscale buffer.
pub trait Decoder: Send + Sync + 'static {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String>;
}

/// `rqrr`-backed decoder. One pass per frame; inverted (light-on-dark)
/// codes are not searched for.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl Decoder for RqrrDecoder {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String> {
        let (w, h) = (width as usize, height as usize);
        if w == 0 || h == 0 || pixels.len() < w * h {
            return None;
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| pixels[y * w + x]);
        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| grid.decode().ok())
            .map(|(_meta, content)| content)
            .filter(|content| !content.is_empty())
    }
}
