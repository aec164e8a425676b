// THEORY (single-pixel heuristics):
// The `Pixel` module is the smallest unit of the engine: one pixel's channel samples
// plus the few metrics that can be computed from that pixel alone. Anything that
// needs neighbours (gradients, suppression, tracing) lives in the stage modules.
//
// What lives here:
// - Raw channels (RGBA). Three-channel rasters are widened with a fully opaque
//   alpha, so every later stage can treat opacity the same way.
// - Luminance: the Rec. 601 weighted sum (0.299, 0.587, 0.114). The weights sum to
//   one, so a grey pixel keeps its value and the result stays in 0..=255.
// - Foreground test: the segmentation collaborator zeroes every non-hand pixel, so a
//   pixel belongs to the hand when any colour channel is non-zero.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Luminance = f64;

    const OPAQUE: Channel = 255;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (opacity) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// Luminance rounded back to a channel value.
        pub fn grey(&self) -> Channel {
            self.luminance().round().clamp(0.0, 255.0) as Channel
        }

        /// True when any colour channel carries signal. Alpha is ignored.
        pub fn is_foreground(&self) -> bool {
            self.red != 0 || self.green != 0 || self.blue != 0
        }

        /// The same colour with opacity forced to fully opaque.
        pub fn opaque(self) -> Self {
            Pixel {
                alpha: OPAQUE,
                ..self
            }
        }
    }

    impl From<&[Byte]> for Pixel {
        /// Builds a pixel from 3 (RGB) or 4 (RGBA) samples.
        ///
        /// Callers validate the channel depth up front; see `RasterBuffer::new`.
        fn from(bytes: &[Byte]) -> Self {
            match bytes {
                [r, g, b] => Pixel::new(*r, *g, *b, OPAQUE),
                [r, g, b, a, ..] => Pixel::new(*r, *g, *b, *a),
                _ => Pixel::default(),
            }
        }
    }

    impl From<Pixel> for [Byte; 4] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn luminance_weights_sum_to_one() {
            let grey = Pixel::new(77, 77, 77, 255);
            assert_eq!(grey.grey(), 77);
            assert_eq!(Pixel::new(255, 255, 255, 0).grey(), 255);
        }

        #[test]
        fn three_channel_samples_become_opaque() {
            let pixel = Pixel::from(&[1u8, 2, 3][..]);
            assert_eq!(pixel.alpha, 255);
            let rgba = Pixel::from(&[1u8, 2, 3, 4][..]);
            assert_eq!(rgba.alpha, 4);
            assert_eq!(rgba.opaque().alpha, 255);
        }

        #[test]
        fn alpha_alone_is_not_foreground() {
            assert!(!Pixel::new(0, 0, 0, 255).is_foreground());
            assert!(Pixel::new(0, 1, 0, 0).is_foreground());
        }
    }
}
