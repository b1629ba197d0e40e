//! Course profiles: distance along the x axis to elevation and slope.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::PacingError;
use crate::terrain::{TerrainGenerator, TerrainParams};

/// A cycling course on a given day.
///
/// Distances are measured along the x axis, not along the road surface. Slope is
/// rise over run (0.05 = 5% grade).
pub trait Course: Send + Sync {
    /// Course length in meters. Fixed for the lifetime of the course.
    fn length(&self) -> f64;

    /// Elevation in meters at `distance`.
    fn elevation(&self, distance: f64) -> f64;

    /// Slope at `distance`.
    fn slope(&self, distance: f64) -> f64;
}

impl<C: Course + ?Sized> Course for Box<C> {
    fn length(&self) -> f64 {
        (**self).length()
    }

    fn elevation(&self, distance: f64) -> f64 {
        (**self).elevation(distance)
    }

    fn slope(&self, distance: f64) -> f64 {
        (**self).slope(distance)
    }
}

fn check_length(length: f64) -> Result<(), PacingError> {
    if length.is_finite() && length > 0.0 {
        Ok(())
    } else {
        Err(PacingError::InvalidCourse(format!(
            "course length must be positive, got {length}"
        )))
    }
}

pub type ProfileFn = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Half-width of the central difference used when no slope function is given.
const SLOPE_STEP: f64 = 1e-3;

/// A course defined by closed-form functions of distance.
pub struct IdealCourse {
    length: f64,
    elevation: ProfileFn,
    slope: Option<ProfileFn>,
}

impl IdealCourse {
    /// Creates a course from an elevation function. Slopes are approximated by
    /// central differences unless [`IdealCourse::with_slope`] supplies the derivative.
    pub fn new<F>(length: f64, elevation: F) -> Result<Self, PacingError>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        check_length(length)?;
        Ok(Self {
            length,
            elevation: Box::new(elevation),
            slope: None,
        })
    }

    /// Sets the exact slope function.
    pub fn with_slope<F>(mut self, slope: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.slope = Some(Box::new(slope));
        self
    }
}

impl fmt::Debug for IdealCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdealCourse")
            .field("length", &self.length)
            .field("exact_slope", &self.slope.is_some())
            .finish()
    }
}

impl Course for IdealCourse {
    fn length(&self) -> f64 {
        self.length
    }

    fn elevation(&self, distance: f64) -> f64 {
        (self.elevation)(distance)
    }

    fn slope(&self, distance: f64) -> f64 {
        match &self.slope {
            Some(slope) => slope(distance),
            None => {
                let ahead = (self.elevation)(distance + SLOPE_STEP);
                let behind = (self.elevation)(distance - SLOPE_STEP);
                (ahead - behind) / (2.0 * SLOPE_STEP)
            }
        }
    }
}

/// An idealized hill which starts flat and steepens linearly to `end_percentage`
/// percent at the finish, so elevation grows quadratically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticHill {
    length: f64,
    end_percentage: f64,
}

impl QuadraticHill {
    pub fn new(length: f64, end_percentage: f64) -> Result<Self, PacingError> {
        check_length(length)?;
        if !end_percentage.is_finite() {
            return Err(PacingError::InvalidCourse(format!(
                "end percentage must be finite, got {end_percentage}"
            )));
        }
        Ok(Self {
            length,
            end_percentage,
        })
    }

    pub fn end_percentage(&self) -> f64 {
        self.end_percentage
    }
}

impl Course for QuadraticHill {
    fn length(&self) -> f64 {
        self.length
    }

    fn elevation(&self, distance: f64) -> f64 {
        self.end_percentage * distance * distance / (200.0 * self.length)
    }

    fn slope(&self, distance: f64) -> f64 {
        self.end_percentage * distance / (100.0 * self.length)
    }
}

/// A course with no elevation change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCourse {
    length: f64,
}

impl FlatCourse {
    pub fn new(length: f64) -> Result<Self, PacingError> {
        check_length(length)?;
        Ok(Self { length })
    }
}

impl Course for FlatCourse {
    fn length(&self) -> f64 {
        self.length
    }

    fn elevation(&self, _distance: f64) -> f64 {
        0.0
    }

    fn slope(&self, _distance: f64) -> f64 {
        0.0
    }
}

/// A course defined by sampled `(distance, elevation)` points.
///
/// Elevation is linearly interpolated between samples and the slope is the
/// gradient of the segment containing the distance. Before the first and past
/// the last sample the course is treated as flat at the endpoint elevation.
#[derive(Debug, Clone, PartialEq)]
pub struct PointwiseCourse {
    points: Vec<(f64, f64)>,
}

impl PointwiseCourse {
    /// Creates a course from points sorted by strictly increasing distance,
    /// starting at distance 0. The last point's distance is the course length.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, PacingError> {
        if points.len() < 2 {
            return Err(PacingError::InvalidCourse(
                "a pointwise course needs at least two points".to_string(),
            ));
        }
        if points.iter().any(|(d, e)| !d.is_finite() || !e.is_finite()) {
            return Err(PacingError::InvalidCourse(
                "course points must be finite".to_string(),
            ));
        }
        if points[0].0 != 0.0 {
            return Err(PacingError::InvalidCourse(format!(
                "first point must be at distance 0, got {}",
                points[0].0
            )));
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(PacingError::InvalidCourse(
                "point distances must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// Generates a rolling course by sampling noise terrain every `spacing` meters.
    pub fn rolling(length: f64, spacing: f64, terrain: TerrainParams) -> Result<Self, PacingError> {
        check_length(length)?;
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(PacingError::InvalidCourse(format!(
                "sample spacing must be positive, got {spacing}"
            )));
        }
        Self::new(TerrainGenerator::new(terrain).profile(length, spacing))
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Index of the segment `(i - 1, i)` containing `distance`, or `None` outside the samples.
    fn segment(&self, distance: f64) -> Option<usize> {
        let idx = self.points.partition_point(|(d, _)| *d <= distance);
        (idx > 0 && idx < self.points.len()).then_some(idx)
    }
}

impl Course for PointwiseCourse {
    fn length(&self) -> f64 {
        self.points[self.points.len() - 1].0
    }

    fn elevation(&self, distance: f64) -> f64 {
        match self.segment(distance) {
            Some(i) => {
                let (d0, e0) = self.points[i - 1];
                let (d1, e1) = self.points[i];
                e0 + (e1 - e0) * (distance - d0) / (d1 - d0)
            }
            None if distance < self.points[0].0 => self.points[0].1,
            None => self.points[self.points.len() - 1].1,
        }
    }

    fn slope(&self, distance: f64) -> f64 {
        match self.segment(distance) {
            Some(i) => {
                let (d0, e0) = self.points[i - 1];
                let (d1, e1) = self.points[i];
                (e1 - e0) / (d1 - d0)
            }
            None => 0.0,
        }
    }
}

/// Serializable description of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CourseConfig {
    QuadraticHill { length: f64, end_percentage: f64 },
    Flat { length: f64 },
    Points { points: Vec<(f64, f64)> },
    Rolling {
        length: f64,
        spacing: f64,
        terrain: TerrainParams,
    },
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self::QuadraticHill {
            length: 500.0,
            end_percentage: 11.0,
        }
    }
}

impl CourseConfig {
    pub fn build(&self) -> Result<Box<dyn Course>, PacingError> {
        Ok(match self {
            Self::QuadraticHill {
                length,
                end_percentage,
            } => Box::new(QuadraticHill::new(*length, *end_percentage)?),
            Self::Flat { length } => Box::new(FlatCourse::new(*length)?),
            Self::Points { points } => Box::new(PointwiseCourse::new(points.clone())?),
            Self::Rolling {
                length,
                spacing,
                terrain,
            } => Box::new(PointwiseCourse::rolling(*length, *spacing, *terrain)?),
        })
    }
}
