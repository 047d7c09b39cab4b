//! 图像预处理
//!
//! 把已经缩放到目标尺寸的 RGB 图像转换为通道优先的 `[1, 3, H, W]` 张量。
//! 解码和缩放不在这里完成。

use serde::{Deserialize, Serialize};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreprocessError {
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
    #[error("Image is {actual_width}x{actual_height}, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("Invalid normalization: {0}")]
    InvalidNormalization(String),
}

/// 交错存储的 8 位 RGB 图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, PreprocessError> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(PreprocessError::BufferLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: rgb.iter().copied().cycle().take(count * 3).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTensor {
    pub name: String,
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl InputTensor {
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image: &RgbImage, width: u32, height: u32) -> Result<InputTensor, PreprocessError>;
}

/// 按通道做 `(v / 255 - mean) / std` 归一化
#[derive(Debug, Clone, PartialEq)]
pub struct StandardNormalizer {
    input_name: String,
    mean: [f32; 3],
    std: [f32; 3],
}

impl StandardNormalizer {
    pub fn new(input_name: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    pub fn with_statistics(mut self, mean: [f32; 3], std: [f32; 3]) -> Result<Self, PreprocessError> {
        if std.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
            return Err(PreprocessError::InvalidNormalization(format!(
                "standard deviation must be positive, got {:?}",
                std
            )));
        }
        self.mean = mean;
        self.std = std;
        Ok(self)
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }
}

impl ImagePreprocessor for StandardNormalizer {
    fn preprocess(&self, image: &RgbImage, width: u32, height: u32) -> Result<InputTensor, PreprocessError> {
        if image.width != width || image.height != height {
            return Err(PreprocessError::SizeMismatch {
                width,
                height,
                actual_width: image.width,
                actual_height: image.height,
            });
        }

        let plane = width as usize * height as usize;
        let mut data = vec![0.0f32; plane * 3];

        for (i, rgb) in image.pixels.chunks_exact(3).enumerate() {
            for channel in 0..3 {
                let value = rgb[channel] as f32 / 255.0;
                data[channel * plane + i] = (value - self.mean[channel]) / self.std[channel];
            }
        }

        Ok(InputTensor {
            name: self.input_name.clone(),
            shape: [1, 3, height as usize, width as usize],
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_shape_and_layout() {
        let mut pixels = Vec::new();
        // 2x1: 红色, 蓝色
        pixels.extend_from_slice(&[255, 0, 0]);
        pixels.extend_from_slice(&[0, 0, 255]);
        let image = RgbImage::new(2, 1, pixels).unwrap();

        let tensor = StandardNormalizer::new("data").preprocess(&image, 2, 1).unwrap();

        assert_eq!(tensor.name, "data");
        assert_eq!(tensor.shape, [1, 3, 1, 2]);
        assert_eq!(tensor.data.len(), tensor.element_count());
        // R 平面
        assert!(approx(tensor.data[0], (1.0 - 0.485) / 0.229));
        assert!(approx(tensor.data[1], (0.0 - 0.485) / 0.229));
        // B 平面
        assert!(approx(tensor.data[4], (0.0 - 0.406) / 0.225));
        assert!(approx(tensor.data[5], (1.0 - 0.406) / 0.225));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let image = RgbImage::filled(10, 10, [0, 0, 0]);
        let err = StandardNormalizer::new("data").preprocess(&image, 224, 224).unwrap_err();
        assert!(matches!(err, PreprocessError::SizeMismatch { actual_width: 10, .. }));
    }

    #[test]
    fn test_buffer_length_validated() {
        let err = RgbImage::new(2, 2, vec![0; 11]).unwrap_err();
        assert_eq!(err, PreprocessError::BufferLength { expected: 12, actual: 11 });
    }

    #[test]
    fn test_custom_statistics() {
        let normalizer = StandardNormalizer::new("input")
            .with_statistics([0.5, 0.5, 0.5], [0.5, 0.5, 0.5])
            .unwrap();
        let image = RgbImage::filled(1, 1, [255, 255, 0]);

        let tensor = normalizer.preprocess(&image, 1, 1).unwrap();
        assert!(approx(tensor.data[0], 1.0));
        assert!(approx(tensor.data[2], -1.0));

        assert!(StandardNormalizer::new("input")
            .with_statistics([0.0; 3], [1.0, 0.0, 1.0])
            .is_err());
    }

    #[test]
    fn test_filled_image() {
        let image = RgbImage::filled(3, 2, [1, 2, 3]);
        assert_eq!(image.pixels.len(), 18);
        assert!(image.pixels.chunks_exact(3).all(|p| p == [1, 2, 3]));
    }
}
