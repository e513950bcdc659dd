pub(crate) mod birdseye;
pub(crate) mod homography;
