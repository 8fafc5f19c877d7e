//! Image to normalized f32 tensor.
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::errors::{PrepError, PrepResult};
use crate::layout::{AxisOrder, Layout};
use crate::profile::NormalizationProfile;

/// Normalize every pixel of `image` with `profile` and lay the result out
/// according to `layout`.
///
/// The tensor shape is `layout.shape(width, height)`. Values are computed in
/// f32 and never clamped.
pub fn to_tensor(
    image: &RgbImage,
    profile: &NormalizationProfile,
    layout: &Layout,
) -> PrepResult<Tensor> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PrepError::shape(format!("cannot convert empty {width}x{height} image")));
    }
    layout.check()?;
    profile.validate()?;

    let (w, h) = (width as usize, height as usize);
    let raw = image.as_raw();
    let value = |x: usize, y: usize, c: usize| profile.normalize(c, raw[(y * w + x) * 3 + c]);

    let tensor: Tensor = match layout.order {
        AxisOrder::Chw => {
            tract_ndarray::Array3::from_shape_fn((3, h, w), |(c, y, x)| value(x, y, c))
                .into_dyn()
                .into()
        }
        AxisOrder::Ncwh => {
            tract_ndarray::Array4::from_shape_fn((1, 3, w, h), |(_, c, x, y)| value(x, y, c))
                .into_dyn()
                .into()
        }
        AxisOrder::Nchw => {
            tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| value(x, y, c))
                .into_dyn()
                .into()
        }
        AxisOrder::Nhwc => {
            tract_ndarray::Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| value(x, y, c))
                .into_dyn()
                .into()
        }
    };
    trace!("Tensor {:?} from {width}x{height} image", tensor.shape());
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PixelRange;
    use approx::assert_abs_diff_eq;
    use image::Rgb;
    use proptest::prelude::*;

    fn checker(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8 * 10, y as u8 * 20, (x + y) as u8]))
    }

    fn arb_image() -> impl Strategy<Value = RgbImage> {
        (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
            proptest::collection::vec(any::<u8>(), (w * h * 3) as usize)
                .prop_map(move |raw| RgbImage::from_raw(w, h, raw).unwrap())
        })
    }

    fn arb_layout() -> impl Strategy<Value = Layout> {
        prop_oneof![
            Just(Layout::chw()),
            Just(Layout::ncwh()),
            Just(Layout::nchw()),
            Just(Layout::nhwc())
        ]
    }

    fn at(layout: &Layout, x: usize, y: usize, c: usize) -> Vec<usize> {
        match layout.order {
            AxisOrder::Chw => vec![c, y, x],
            AxisOrder::Ncwh => vec![0, c, x, y],
            AxisOrder::Nchw => vec![0, c, y, x],
            AxisOrder::Nhwc => vec![0, y, x, c],
        }
    }

    #[test]
    fn shape_follows_layout() {
        let image = checker(4, 3);
        for layout in [Layout::chw(), Layout::ncwh(), Layout::nchw(), Layout::nhwc()] {
            let t = to_tensor(&image, &NormalizationProfile::identity(), &layout).unwrap();
            assert_eq!(t.shape(), &*layout.shape(4, 3));
            assert_eq!(t.datum_type(), f32::datum_type());
        }
    }

    #[test]
    fn ncwh_is_indexed_by_x_then_y() {
        let image = checker(4, 3);
        let t = to_tensor(&image, &NormalizationProfile::identity(), &Layout::ncwh()).unwrap();
        let view = t.to_array_view::<f32>().unwrap();
        assert_eq!(view[[0, 0, 3, 1]], 30.0);
        assert_eq!(view[[0, 1, 3, 1]], 20.0);
        assert_eq!(view[[0, 2, 3, 2]], 5.0);
    }

    #[test]
    fn black_scaled_unit_is_all_zeros() {
        let image = RgbImage::new(2, 2);
        let resized = crate::resample::resize(&image, 2, 2).unwrap();
        let profile = NormalizationProfile::new([0.0; 3], [1.0; 3], PixelRange::Scaled);
        let t = to_tensor(&resized, &profile, &Layout::ncwh()).unwrap();
        assert!(t.as_slice::<f32>().unwrap().iter().all(|&v| v == 0.0));
        assert_eq!(t.len(), 12);
    }

    #[test]
    fn imagenet_values() {
        let image = RgbImage::from_pixel(1, 1, Rgb([255, 0, 128]));
        let t = to_tensor(&image, &NormalizationProfile::imagenet(), &Layout::chw()).unwrap();
        let v = t.as_slice::<f32>().unwrap();
        assert_abs_diff_eq!(v[0], (1.0 - 0.485) / 0.229, epsilon = 1e-6);
        assert_abs_diff_eq!(v[1], (0.0 - 0.456) / 0.224, epsilon = 1e-6);
        assert_abs_diff_eq!(v[2], (128.0 / 255.0 - 0.406) / 0.225, epsilon = 1e-6);
    }

    #[test]
    fn four_channel_layout_is_rejected() {
        let layout = Layout { order: AxisOrder::Nchw, channels: 4 };
        let err = to_tensor(&checker(2, 2), &NormalizationProfile::identity(), &layout);
        assert!(matches!(err, Err(PrepError::ShapeMismatch(_))));
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = to_tensor(&RgbImage::new(3, 0), &NormalizationProfile::identity(), &Layout::chw());
        assert!(matches!(err, Err(PrepError::ShapeMismatch(_))));
    }

    proptest! {
        #[test]
        fn identity_profile_copies_bytes(image in arb_image(), layout in arb_layout()) {
            let t = to_tensor(&image, &NormalizationProfile::identity(), &layout).unwrap();
            let view = t.to_array_view::<f32>().unwrap();
            for (x, y, px) in image.enumerate_pixels() {
                for c in 0..3 {
                    prop_assert_eq!(view[&*at(&layout, x as usize, y as usize, c)], px[c] as f32);
                }
            }
        }

        #[test]
        fn denormalize_recovers_pixels(image in arb_image(), layout in arb_layout()) {
            for profile in [NormalizationProfile::imagenet(), NormalizationProfile::caffe2_means()] {
                let t = to_tensor(&image, &profile, &layout).unwrap();
                let view = t.to_array_view::<f32>().unwrap();
                for (x, y, px) in image.enumerate_pixels() {
                    for c in 0..3 {
                        let v = view[&*at(&layout, x as usize, y as usize, c)];
                        prop_assert!((profile.denormalize(c, v) - px[c] as f32).abs() < 1e-3);
                    }
                }
            }
        }
    }
}
