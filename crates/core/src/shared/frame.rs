use ndarray::ArrayView3;

/// Bytes per pixel of a decoded frame (packed RGB24).
pub const CHANNELS: usize = 3;

/// One decoded video frame: packed RGB24, row-major, no row padding.
///
/// `index` is the 0-based position of the frame in decode order, which is
/// what frame sampling and gap tolerance are measured against.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// `[height, width, channel]` view over the pixel buffer.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }
}
