//! Cross-module properties of the calculator on seeded random inputs.

use approx::assert_abs_diff_eq;
use image_metrics::metrics::ssim::{self, SsimConfig};
use image_metrics::{
    CalculatorConfig, Error, ImageMetricCalculator, ImageTensor, MetricConfig, Shape, ssim_and_l2,
    ssim_and_l2_with,
};
use imgref::ImgVec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rgb::RGB;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_tensor(rng: &mut StdRng, shape: Shape, lo: f32, hi: f32) -> ImageTensor {
    let data = (0..shape.len()).map(|_| rng.random_range(lo..hi)).collect();
    ImageTensor::new(shape, data).unwrap()
}

#[test]
fn identity_gives_perfect_scores() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(7);
    for shape in [Shape::new(4, 4, 3), Shape::new(16, 24, 3), Shape::new(9, 9, 1)] {
        let x = random_tensor(&mut rng, shape, -1.0, 1.0);
        let (ssim, l2) = ssim_and_l2(&x, &x).unwrap();
        assert_abs_diff_eq!(ssim, 1.0, epsilon = 1e-6);
        assert_eq!(l2, 0.0);
    }
}

#[test]
fn scores_are_symmetric() {
    let mut rng = StdRng::seed_from_u64(11);
    let shape = Shape::new(20, 20, 3);
    for _ in 0..5 {
        let x = random_tensor(&mut rng, shape, -1.0, 1.0);
        let y = random_tensor(&mut rng, shape, -1.0, 1.0);
        let (s_xy, l_xy) = ssim_and_l2(&x, &y).unwrap();
        let (s_yx, l_yx) = ssim_and_l2(&y, &x).unwrap();
        assert_abs_diff_eq!(s_xy, s_yx, epsilon = 1e-12);
        assert_abs_diff_eq!(l_xy, l_yx, epsilon = 1e-12);
    }
}

#[test]
fn scores_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(23);
    let configs = [
        CalculatorConfig::default(),
        CalculatorConfig {
            ssim: SsimConfig::gaussian(),
            ..CalculatorConfig::default()
        },
        CalculatorConfig {
            ssim: SsimConfig::builder().window_size(3).build().unwrap(),
            ..CalculatorConfig::default()
        },
    ];
    for config in &configs {
        for _ in 0..5 {
            let shape = Shape::new(rng.random_range(4..24), rng.random_range(4..24), 3);
            let x = random_tensor(&mut rng, shape, -1.2, 1.2);
            let y = random_tensor(&mut rng, shape, -1.2, 1.2);
            let (ssim, l2) = ssim_and_l2_with(&x, &y, config).unwrap();
            assert!((-1.0..=1.0).contains(&ssim), "ssim {ssim} out of range");
            assert!(l2 >= 0.0);
        }
    }
}

#[test]
fn noise_lowers_similarity_monotonically() {
    let mut rng = StdRng::seed_from_u64(31);
    let shape = Shape::new(32, 32, 3);
    let target = ImageTensor::from_fn(shape, |y, x, c| {
        ((x as f32 * 0.2 + c as f32).sin() * (y as f32 * 0.15).cos()) * 0.8
    })
    .unwrap();
    let noise = random_tensor(&mut rng, shape, -1.0, 1.0);

    let mut last_ssim = f64::INFINITY;
    let mut last_l2 = -1.0;
    for amount in [0.0f32, 0.05, 0.2, 0.5] {
        let noisy = ImageTensor::new(
            shape,
            target
                .as_slice()
                .iter()
                .zip(noise.as_slice())
                .map(|(t, n)| t + amount * n)
                .collect(),
        )
        .unwrap();
        let (ssim, l2) = ssim_and_l2(&noisy, &target).unwrap();
        assert!(ssim < last_ssim || amount == 0.0);
        assert!(l2 > last_l2);
        last_ssim = ssim;
        last_l2 = l2;
    }
}

#[test]
fn clamping_precedes_every_metric() {
    let mut rng = StdRng::seed_from_u64(47);
    let shape = Shape::new(12, 12, 3);
    let base = random_tensor(&mut rng, shape, -1.0, 1.0);
    // Push a third of the elements far out of range, then compare to the
    // same tensor with those elements pinned to the range bounds.
    let wild: Vec<f32> = base
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, &v)| match i % 3 {
            0 => 1.5,
            1 => -1.5,
            _ => v,
        })
        .collect();
    let pinned: Vec<f32> = wild.iter().map(|v| v.clamp(-1.0, 1.0)).collect();
    let wild = ImageTensor::new(shape, wild).unwrap();
    let pinned = ImageTensor::new(shape, pinned).unwrap();

    let target = random_tensor(&mut rng, shape, -1.0, 1.0);
    let result_wild = ImageMetricCalculator::default().evaluate(&wild, &target).unwrap();
    let result_pinned = ImageMetricCalculator::default().evaluate(&pinned, &target).unwrap();
    assert_eq!(result_wild.ssim, result_pinned.ssim);
    assert_eq!(result_wild.l2_norm, result_pinned.l2_norm);
    assert_eq!(result_wild.clamped_generated, shape.len() / 3 * 2);
    assert_eq!(result_pinned.clamped_generated, 0);

    let l2_unclamped = wild
        .as_slice()
        .iter()
        .zip(target.as_slice())
        .map(|(a, b)| f64::from((a + 1.0) * 0.5 - (b + 1.0) * 0.5).powi(2))
        .sum::<f64>()
        .sqrt();
    assert!(l2_unclamped > result_wild.l2_norm);
}

#[test]
fn shape_mismatch_computes_nothing() {
    let a = ImageTensor::filled(Shape::new(8, 8, 3), 0.0).unwrap();
    let b = ImageTensor::filled(Shape::new(8, 7, 3), 0.0).unwrap();
    match ssim_and_l2(&a, &b) {
        Err(Error::ShapeMismatch { expected, actual }) => {
            assert_eq!(expected, Shape::new(8, 8, 3));
            assert_eq!(actual, Shape::new(8, 7, 3));
        }
        other => panic!("expected shape mismatch, got {other:?}"),
    }
}

#[test]
fn all_zero_4x4x3_reference_case() {
    let t = ImageTensor::filled(Shape::new(4, 4, 3), 0.0).unwrap();
    let (ssim, l2) = ssim_and_l2(&t, &t.clone()).unwrap();
    assert_abs_diff_eq!(ssim, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(l2, 0.0, epsilon = 1e-12);
}

#[test]
fn multichannel_mean_matches_channel_average() {
    let mut rng = StdRng::seed_from_u64(59);
    let shape = Shape::new(14, 14, 3);
    let x = random_tensor(&mut rng, shape, 0.0, 1.0);
    let y = random_tensor(&mut rng, shape, 0.0, 1.0);
    let config = SsimConfig::default();
    let score = ssim::structural_similarity(&x, &y, &config).unwrap();

    let mut total = 0.0;
    for c in 0..3 {
        let plane = |t: &ImageTensor| {
            let data = t.channel_plane(c).into_iter().map(|v| v as f32).collect();
            ImageTensor::new(Shape::new(14, 14, 1), data).unwrap()
        };
        let single = ssim::structural_similarity(&plane(&x), &plane(&y), &config).unwrap();
        assert_abs_diff_eq!(single.mean, score.per_channel[c], epsilon = 1e-12);
        total += single.mean;
    }
    assert_abs_diff_eq!(score.mean, total / 3.0, epsilon = 1e-12);
}

#[test]
fn imgref_input_matches_raw_tensor() {
    let pixels: Vec<RGB<f32>> = (0..36)
        .map(|i| {
            let v = (i as f32 / 35.0) * 2.0 - 1.0;
            RGB::new(v, -v, v * 0.5)
        })
        .collect();
    let img = ImgVec::new(pixels.clone(), 6, 6);
    let from_img = ImageTensor::from_rgb_f32(img.as_ref()).unwrap();
    let raw = ImageTensor::new(
        Shape::new(6, 6, 3),
        pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect(),
    )
    .unwrap();
    assert_eq!(from_img, raw);
}

#[test]
fn psnr_tracks_l2() {
    let mut rng = StdRng::seed_from_u64(71);
    let shape = Shape::new(10, 10, 3);
    let x = random_tensor(&mut rng, shape, -1.0, 1.0);
    let y = random_tensor(&mut rng, shape, -1.0, 1.0);
    let config = CalculatorConfig {
        metrics: MetricConfig {
            psnr: true,
            dssim: false,
        },
        ..CalculatorConfig::default()
    };
    let result = ImageMetricCalculator::new(config).unwrap().evaluate(&x, &y).unwrap();
    let mse = result.l2_norm.powi(2) / shape.len() as f64;
    assert_abs_diff_eq!(result.psnr.unwrap(), -10.0 * mse.log10(), epsilon = 1e-9);
}

#[cfg(feature = "dssim")]
#[test]
fn dssim_agrees_with_ssim_ordering() {
    let mut rng = StdRng::seed_from_u64(83);
    let shape = Shape::new(64, 64, 3);
    let target = random_tensor(&mut rng, shape, -0.8, 0.8);
    let noise = random_tensor(&mut rng, shape, -1.0, 1.0);
    let perturb = |amount: f32| {
        ImageTensor::new(
            shape,
            target
                .as_slice()
                .iter()
                .zip(noise.as_slice())
                .map(|(t, n)| t + amount * n)
                .collect(),
        )
        .unwrap()
    };
    let calculator = ImageMetricCalculator::new(CalculatorConfig {
        metrics: MetricConfig::all(),
        ..CalculatorConfig::default()
    })
    .unwrap();
    let mild = calculator.evaluate(&perturb(0.05), &target).unwrap();
    let heavy = calculator.evaluate(&perturb(0.4), &target).unwrap();
    assert!(mild.ssim > heavy.ssim);
    assert!(mild.dssim.unwrap() < heavy.dssim.unwrap());
}
