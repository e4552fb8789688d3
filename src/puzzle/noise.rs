use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic scalar field in `[0, 1]` driving tab/blank choices.
///
/// Both the authority and every replica must build the same field, either
/// from the same noise image or from the same seed.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseField {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl NoiseField {
    /// Red channel of an RGBA image, row-major.
    #[must_use]
    pub fn from_image(image: &RgbaImage) -> Self {
        let values = image
            .pixels()
            .map(|pixel| f64::from(pixel.0[0]) / 255.0)
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            values,
        }
    }

    /// Uniform white noise from a seeded `StdRng`.
    #[must_use]
    pub fn generate(seed: u64, width: u32, height: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let len = (width as usize) * (height as usize);
        let values = (0..len).map(|_| rng.random::<f64>()).collect();
        Self {
            width,
            height,
            values,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Value at `index`, wrapping around the field. An empty field reads as 0.
    #[must_use]
    pub fn sample(&self, index: usize) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values[index % self.values.len()]
    }
}
