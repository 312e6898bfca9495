mod common;

use common::synthetic_image::{crops_as_frames, full_resolution_tiers, shaded_checkerboard};
use map_stitcher::{FrameSet, StitchError, Stitcher, StitcherParams};

/// Three 200×200 crops of one checkerboard scene, 60 px (30 %) overlap
/// between neighbours. The pipeline must keep all three, recover the 140 px
/// horizontal steps, and produce a panorama close to the scene itself.
#[test]
fn three_overlapping_crops_stitch_into_the_scene() {
    let _ = env_logger::builder().is_test(true).try_init();

    let scene = shaded_checkerboard(480, 200, 10, 7);
    let offsets = [(0usize, 0usize), (140, 0), (280, 0)];
    let frames = crops_as_frames(&scene, &offsets, 200, 200);

    let stitcher = Stitcher::new(StitcherParams::default()).unwrap();
    let output = stitcher.stitch(frames).expect("stitch must succeed");

    assert_eq!(output.report.kept_indices, vec![0, 1, 2]);

    // Confidence is symmetric and adjacent pairs clear the threshold.
    let conf = &output.report.confidence_matrix;
    for i in 0..3 {
        for j in 0..3 {
            assert!((conf[i][j] - conf[j][i]).abs() < 1e-12);
        }
    }
    assert!(conf[0][1] >= 1.0, "adjacent confidence {:.3}", conf[0][1]);
    assert!(conf[1][2] >= 1.0, "adjacent confidence {:.3}", conf[1][2]);

    // Recovered camera translations step by 140 px between neighbours.
    let cams = &output.geometry.cameras;
    for k in 0..2 {
        let dx = cams[k + 1].transform[(0, 2)] - cams[k].transform[(0, 2)];
        let dy = cams[k + 1].transform[(1, 2)] - cams[k].transform[(1, 2)];
        assert!((dx - 140.0).abs() < 1.5, "x step {k}: {dx:.2}");
        assert!(dy.abs() < 1.5, "y step {k}: {dy:.2}");
    }

    // The cropped panorama covers nearly the whole 480×200 union footprint.
    let size = output.panorama.size();
    assert!(
        (470..=482).contains(&size.w) && (192..=202).contains(&size.h),
        "unexpected panorama size {size:?}"
    );
    assert_eq!(
        output.panorama.mask.count_valid(),
        (size.w * size.h) as usize,
        "cropped panorama must have full coverage"
    );

    // Pixels reproduce the scene. Panorama coordinates differ from scene
    // coordinates by the crop origin and the first camera's translation.
    let crop = output.report.crop_rect.expect("cropping is on by default");
    let off_x = crop.x as f64 - cams[0].transform[(0, 2)];
    let off_y = crop.y as f64 - cams[0].transform[(1, 2)];
    let mut bad = 0usize;
    let mut total = 0usize;
    for y in 2..output.panorama.image.h - 2 {
        for x in 2..output.panorama.image.w - 2 {
            let sx = (x as f64 + off_x).round() as i64;
            let sy = (y as f64 + off_y).round() as i64;
            if sx < 0 || sy < 0 || sx >= scene.w as i64 || sy >= scene.h as i64 {
                continue;
            }
            total += 1;
            let expected = scene.get(sx as usize, sy as usize);
            if (output.panorama.image.get(x, y) - expected).abs() > 0.1 {
                bad += 1;
            }
        }
    }
    assert!(total > 0, "no comparable pixels");
    assert!(
        (bad as f64) < 0.05 * total as f64,
        "{bad} of {total} pixels deviate from the scene"
    );
}

/// Two checkerboards with unrelated shading share no content; no camera
/// relationship may be fabricated between them.
#[test]
fn disjoint_images_fail_with_insufficient_overlap() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Different cell pitches keep even the board periodicity uncorrelated.
    let a = shaded_checkerboard(200, 200, 10, 1);
    let b = shaded_checkerboard(200, 200, 13, 2);
    let frames = FrameSet::from_images(
        vec![("a".into(), a), ("b".into(), b)],
        &full_resolution_tiers(),
    )
    .unwrap();

    let stitcher = Stitcher::new(StitcherParams::default()).unwrap();
    let err = stitcher.stitch(frames).unwrap_err();
    assert!(
        matches!(err, StitchError::InsufficientOverlap(_)),
        "expected InsufficientOverlap, got {err}"
    );
}

#[test]
fn single_image_is_insufficient() {
    let scene = shaded_checkerboard(200, 200, 10, 5);
    let frames = crops_as_frames(&scene, &[(0, 0)], 200, 200);
    let stitcher = Stitcher::new(StitcherParams::default()).unwrap();
    assert!(matches!(
        stitcher.stitch(frames).unwrap_err(),
        StitchError::InsufficientOverlap(_)
    ));
}

/// Two overlapping crops plus one unrelated image: the outsider must be
/// dropped, the pair stitched.
#[test]
fn weak_pairs_are_pruned_but_the_core_stitches() {
    let _ = env_logger::builder().is_test(true).try_init();

    let scene = shaded_checkerboard(340, 200, 10, 11);
    let outsider = shaded_checkerboard(200, 200, 13, 99);
    let frames = FrameSet::from_images(
        vec![
            ("crop0".into(), scene.crop(0, 0, 200, 200)),
            ("crop1".into(), scene.crop(140, 0, 200, 200)),
            ("outsider".into(), outsider),
        ],
        &full_resolution_tiers(),
    )
    .unwrap();

    let stitcher = Stitcher::new(StitcherParams::default()).unwrap();
    let output = stitcher.stitch(frames).expect("core pair must stitch");
    assert_eq!(output.report.kept_indices, vec![0, 1]);
    assert_eq!(output.geometry.num_frames, 2);
}
