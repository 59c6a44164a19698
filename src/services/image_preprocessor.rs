//! 图像预处理服务 - 业务能力层
//!
//! 把截图变成更适合 OCR 的灰度图。纯函数，不做任何 I/O。
//!
//! 固定顺序：
//! 1. 转灰度
//! 2. 宽度不足时放大到下限（Lanczos3）
//! 3. 对比度增强
//! 4. 亮度增强
//! 5. 锐化
//!
//! 先放大再做对比度/锐化，边缘梯度保留得更多，顺序不能调换。

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use serde::Deserialize;
use tracing::debug;

/// 预处理参数
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// 宽度下限（像素），小于该值时放大
    pub min_width: u32,
    /// 对比度系数，2.0 ~ 3.0
    pub contrast: f32,
    /// 亮度系数，抵消对比度增强带来的变暗
    pub brightness: f32,
    /// 锐化系数，2.0 ~ 4.0
    pub sharpness: f32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            min_width: 1920,
            contrast: 2.5,
            brightness: 1.2,
            sharpness: 2.0,
        }
    }
}

impl PreprocessSettings {
    /// 把各系数限制在有效范围内
    pub fn clamped(self) -> Self {
        Self {
            min_width: self.min_width.max(1),
            contrast: clamp_or(self.contrast, 2.0, 3.0, 2.5),
            brightness: clamp_or(self.brightness, 1.0, 1.5, 1.2),
            sharpness: clamp_or(self.sharpness, 2.0, 4.0, 2.0),
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// 图像预处理器
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    settings: PreprocessSettings,
}

impl ImagePreprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self {
            settings: settings.clamped(),
        }
    }

    /// 执行完整的预处理流程
    pub fn enhance(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let (orig_w, orig_h) = gray.dimensions();

        let gray = self.upscale_to_floor(gray);
        let gray = adjust_contrast(&gray, self.settings.contrast);
        let gray = adjust_brightness(&gray, self.settings.brightness);
        let gray = sharpen(&gray, self.settings.sharpness);

        debug!(
            "图像预处理完成: {}x{} -> {}x{}",
            orig_w,
            orig_h,
            gray.width(),
            gray.height()
        );
        gray
    }

    fn upscale_to_floor(&self, gray: GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        let floor = self.settings.min_width;
        if width == 0 || height == 0 || width >= floor {
            return gray;
        }
        let scale = floor as f64 / width as f64;
        let new_height = ((height as f64 * scale).round() as u32).max(1);
        image::imageops::resize(&gray, floor, new_height, FilterType::Lanczos3)
    }
}

/// 围绕平均灰度拉伸：out = mean + factor * (px - mean)
fn adjust_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let pixel_count = (gray.width() as u64) * (gray.height() as u64);
    if pixel_count == 0 {
        return gray.clone();
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    let mean = sum as f32 / pixel_count as f32;

    map_pixels(gray, |v| mean + factor * (v - mean))
}

/// 线性提亮：out = px * factor
fn adjust_brightness(gray: &GrayImage, factor: f32) -> GrayImage {
    map_pixels(gray, |v| v * factor)
}

/// 与平滑图混合：out = smooth + factor * (px - smooth)
///
/// 平滑核为 [1 1 1; 1 5 1; 1 1 1] / 13，边缘一圈像素保持原值。
fn sharpen(gray: &GrayImage, factor: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return gray.clone();
    }

    let mut out = gray.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = 0.0f32;
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5.0 } else { 1.0 };
                    acc += weight * gray.get_pixel(x + dx - 1, y + dy - 1)[0] as f32;
                }
            }
            let smooth = acc / 13.0;
            let original = gray.get_pixel(x, y)[0] as f32;
            out.put_pixel(x, y, Luma([to_u8(smooth + factor * (original - smooth))]));
        }
    }
    out
}

fn map_pixels(gray: &GrayImage, f: impl Fn(f32) -> f32) -> GrayImage {
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = to_u8(f(pixel[0] as f32));
    }
    out
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
