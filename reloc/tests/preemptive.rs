use reloc::{
    generate_candidates, score_candidates, sort_candidates, PreemptiveRansac, RelocError,
    RelocSettings, Relocaliser, Tracker, TrackingResult,
};
use reloc_core::{
    nalgebra::{Matrix3, Point3, Rotation3, Vector3},
    CameraToWorld, DenseImage, FrameError, Mode, PatchFeature, Pose, PredictedFrame, Prediction,
};

const SIDE: usize = 64;

fn true_pose() -> CameraToWorld {
    CameraToWorld::from_parts(Vector3::new(0.6, -0.4, 0.25), Rotation3::identity())
}

fn camera_point(x: usize, y: usize) -> Point3<f64> {
    Point3::new(
        (x as f64 - 32.0) * 0.05,
        (y as f64 - 32.0) * 0.05,
        2.0 + 0.1 * ((x + 2 * y) % 4) as f64,
    )
}

fn colour(x: usize, y: usize) -> [u8; 3] {
    [(x * 4) as u8, (y * 4) as u8, 128]
}

/// A frame seen from `true_pose` where every usable pixel predicts the right mode and a
/// distractor, in varying order. A few pixels have no depth.
fn scene(side: usize) -> PredictedFrame {
    let features = DenseImage::from_fn(side, side, |x, y| {
        if (x * y) % 17 == 0 {
            PatchFeature::invalid()
        } else {
            PatchFeature::new(camera_point(x, y), colour(x, y))
        }
    });
    let predictions = DenseImage::from_fn(side, side, |x, y| {
        let mean = true_pose().transform(camera_point(x, y));
        let offset = Vector3::new(
            ((x * 7 + y * 13) % 11) as f64 * 0.3 - 1.5,
            ((x * 5 + y * 3) % 7) as f64 * 0.4 - 1.2,
            0.5,
        );
        let covariance = Matrix3::identity() * 0.02 * 0.02;
        let right = Mode::new(mean, covariance, colour(x, y), 20).unwrap();
        let wrong = Mode::new(mean + offset, covariance, colour(x, y), 10).unwrap();
        if (x + y) % 2 == 0 {
            Prediction::new([right, wrong])
        } else {
            Prediction::new([wrong, right])
        }
    });
    PredictedFrame::new(features, predictions).unwrap()
}

fn settings() -> RelocSettings {
    RelocSettings {
        initial_candidates: 128,
        trim_threshold: 16,
        batch_size: 64,
        seed: 7,
        ..Default::default()
    }
}

#[derive(Default)]
struct MockTracker {
    poses: Vec<CameraToWorld>,
    tracks: usize,
}

impl Tracker for MockTracker {
    fn set_pose(&mut self, pose: CameraToWorld) {
        self.poses.push(pose);
    }

    fn track(&mut self) -> TrackingResult {
        self.tracks += 1;
        TrackingResult::Poor
    }
}

fn assert_close_to_true_pose(pose: CameraToWorld) {
    let translation = (pose.0.translation.vector - true_pose().0.translation.vector).norm();
    let angle = pose.0.rotation.angle_to(&true_pose().0.rotation);
    assert!(translation < 1e-3, "translation is off by {}", translation);
    assert!(angle < 1e-3, "rotation is off by {}", angle);
}

#[test]
fn recovers_translation() {
    let _ = pretty_env_logger::try_init_timed();
    let frame = scene(SIDE);
    let relocalisation = PreemptiveRansac::new(settings())
        .unwrap()
        .estimate_pose(&frame)
        .unwrap();
    assert_close_to_true_pose(relocalisation.pose());
    assert!(relocalisation.initial_candidates > 16);
    assert!(relocalisation.initial_candidates <= 128);
    assert!(!relocalisation.candidate.correspondences.is_empty());
}

#[test]
fn single_mode_subset_gives_exact_translation() {
    // Only every fourth pixel in each direction has depth, and it predicts the one right mode.
    let usable = |x: usize, y: usize| x % 4 == 1 && y % 4 == 1;
    let features = DenseImage::from_fn(SIDE, SIDE, |x, y| {
        if usable(x, y) {
            PatchFeature::new(camera_point(x, y), colour(x, y))
        } else {
            PatchFeature::invalid()
        }
    });
    let predictions = DenseImage::from_fn(SIDE, SIDE, |x, y| {
        if usable(x, y) {
            let mean = true_pose().transform(camera_point(x, y));
            let covariance = Matrix3::identity() * 0.01 * 0.01;
            Prediction::new([Mode::new(mean, covariance, colour(x, y), 5).unwrap()])
        } else {
            Prediction::default()
        }
    });
    let frame = PredictedFrame::new(features, predictions).unwrap();
    let settings = RelocSettings {
        initial_candidates: 64,
        ..settings()
    };
    let relocalisation = PreemptiveRansac::new(settings)
        .unwrap()
        .estimate_pose(&frame)
        .unwrap();
    let pose = relocalisation.pose();
    assert!((pose.0.translation.vector - true_pose().0.translation.vector).norm() < 1e-9);
    assert!(pose.0.rotation.angle() < 1e-9);
}

#[test]
fn recovers_translation_with_refinement() {
    let _ = pretty_env_logger::try_init_timed();
    let frame = scene(SIDE);
    let settings = RelocSettings {
        refine_poses: true,
        ..settings()
    };
    let relocalisation = PreemptiveRansac::new(settings)
        .unwrap()
        .estimate_pose(&frame)
        .unwrap();
    assert_close_to_true_pose(relocalisation.pose());
}

#[test]
fn pool_halves_every_round() {
    let frame = scene(SIDE);
    let relocalisation = PreemptiveRansac::new(settings())
        .unwrap()
        .estimate_pose(&frame)
        .unwrap();
    let sizes = &relocalisation.pool_sizes;
    assert_eq!(sizes[0], 16);
    assert_eq!(*sizes.last().unwrap(), 1);
    assert!(sizes.windows(2).all(|w| w[1] == w[0] / 2));
    let rounds = sizes.len() - 1;
    let bound = (sizes[0] as f64).log2().ceil() as usize;
    assert!(rounds <= bound, "{} rounds for {} candidates", rounds, sizes[0]);
}

#[test]
fn attempts_are_deterministic() {
    let frame = scene(SIDE);
    let ransac = PreemptiveRansac::new(settings()).unwrap();
    assert_eq!(
        ransac.estimate_pose(&frame).unwrap(),
        ransac.estimate_pose(&frame).unwrap()
    );
}

#[test]
fn scored_candidates_are_sorted() {
    let frame = scene(SIDE);
    let settings = settings();
    let mut candidates = generate_candidates(&frame, &settings);
    assert!(!candidates.is_empty());
    assert!(candidates
        .iter()
        .all(|c| c.correspondences.len() == settings.minimal_set_size));
    score_candidates(&mut candidates, &frame, settings.energy_floor);
    sort_candidates(&mut candidates);
    assert!(candidates.windows(2).all(|w| w[0].energy <= w[1].energy));
}

#[test]
fn insufficient_data_leaves_tracker_alone() {
    let frame = scene(8);
    let ransac = PreemptiveRansac::new(RelocSettings::default()).unwrap();
    let valid = frame.valid_features();
    assert_eq!(
        ransac.estimate_pose(&frame),
        Err(RelocError::InsufficientData {
            valid,
            required: 500
        })
    );

    let relocaliser = Relocaliser::new(RelocSettings::default()).unwrap();
    let mut tracker = MockTracker::default();
    assert_eq!(
        relocaliser.process(TrackingResult::Failed, &frame, &mut tracker),
        TrackingResult::Failed
    );
    assert!(tracker.poses.is_empty());
    assert_eq!(tracker.tracks, 0);
}

#[test]
fn relocaliser_hands_pose_to_tracker() {
    let frame = scene(SIDE);
    let relocaliser = Relocaliser::new(settings()).unwrap();
    let mut tracker = MockTracker::default();

    assert_eq!(
        relocaliser.process(TrackingResult::Good, &frame, &mut tracker),
        TrackingResult::Good
    );
    assert!(tracker.poses.is_empty());

    assert_eq!(
        relocaliser.process(TrackingResult::Failed, &frame, &mut tracker),
        TrackingResult::Poor
    );
    assert_eq!(tracker.poses.len(), 1);
    assert_eq!(tracker.tracks, 1);
    assert_close_to_true_pose(tracker.poses[0]);
}

#[test]
fn no_candidates_is_an_error() {
    // No feature colour is anywhere near its modes, so no hypothesis can start.
    let features = DenseImage::from_fn(8, 8, |x, y| {
        PatchFeature::new(camera_point(x, y), [255, 255, 255])
    });
    let predictions = DenseImage::from_fn(8, 8, |x, y| {
        let mode = Mode::new(camera_point(x, y), Matrix3::identity(), [0; 3], 1).unwrap();
        Prediction::new([mode])
    });
    let frame = PredictedFrame::new(features, predictions).unwrap();
    let settings = RelocSettings {
        initial_candidates: 8,
        batch_size: 16,
        max_sample_iterations: 50,
        max_hypothesis_retries: 2,
        ..Default::default()
    };
    assert_eq!(
        PreemptiveRansac::new(settings).unwrap().estimate_pose(&frame),
        Err(RelocError::NoPoseFound)
    );
}

#[test]
fn mismatched_images_are_rejected() {
    let features = DenseImage::from_fn(4, 4, |_, _| PatchFeature::invalid());
    let predictions = DenseImage::from_fn(4, 2, |_, _| Prediction::default());
    assert_eq!(
        PreemptiveRansac::new(settings())
            .unwrap()
            .estimate_pose_from_images(features, predictions),
        Err(RelocError::Frame(FrameError::DimensionMismatch {
            features: (4, 4),
            predictions: (4, 2),
        }))
    );
}

#[test]
fn invalid_settings_are_rejected() {
    let settings = RelocSettings {
        batch_size: 0,
        ..settings()
    };
    assert!(matches!(
        PreemptiveRansac::new(settings),
        Err(RelocError::InvalidSettings(_))
    ));
}
