use hand_geometry::RasterBuffer;

pub const WIDTH: u32 = 100;
pub const HEIGHT: u32 = 120;

const SKIN: [u8; 3] = [205, 150, 125];

/// Palm pixels: x in [30, 70), y in [60, 100).
pub fn in_palm(x: u32, y: u32) -> bool {
    (30..70).contains(&x) && (60..100).contains(&y)
}

/// Two upright fingers separated by a gap over x in [42, 58).
pub fn in_finger(x: u32, y: u32) -> bool {
    let column = (32..42).contains(&x) || (58..68).contains(&x);
    column && (25..60).contains(&y)
}

pub fn in_hand(x: u32, y: u32) -> bool {
    in_palm(x, y) || in_finger(x, y)
}

/// A segmented "V sign": everything but the hand is zeroed. A one-pixel speck in
/// the corner stands in for segmentation noise.
pub fn v_sign_rgb() -> RasterBuffer {
    let mut data = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if in_hand(x, y) || (x == 3 && y == 3) {
                let i = ((y * WIDTH + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&SKIN);
            }
        }
    }
    RasterBuffer::packed(WIDTH, HEIGHT, 3, data).expect("synthetic raster is valid")
}
