use crate::models::{Detection, Verdict};

const STONE_PATTERN: &str = "kidney-stone";
const NORMAL_PATTERN: &str = "normal kidney";

/// Classes that take part in the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KidneyClass {
    Stone,
    Normal,
}

impl KidneyClass {
    /// Case-insensitive substring match; stone wins when both patterns occur
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains(STONE_PATTERN) {
            Some(KidneyClass::Stone)
        } else if name.contains(NORMAL_PATTERN) {
            Some(KidneyClass::Normal)
        } else {
            None
        }
    }
}

/// Running confidence sum and count for one class
#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    sum: f64,
    count: u32,
}

impl Bucket {
    fn push(&mut self, confidence: f32) {
        self.sum += confidence as f64;
        self.count += 1;
    }

    fn mean(&self) -> Option<f32> {
        if self.count == 0 {
            None
        } else {
            Some((self.sum / self.count as f64) as f32)
        }
    }
}

/// Accumulates per-class confidences and produces the verdict
#[derive(Debug, Default, Clone)]
pub struct VerdictAccumulator {
    stone: Bucket,
    normal: Bucket,
}

impl VerdictAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one detection; returns the class it was counted under, if any
    pub fn push(&mut self, detection: &Detection) -> Option<KidneyClass> {
        let class = KidneyClass::from_name(&detection.class_name)?;
        match class {
            KidneyClass::Stone => self.stone.push(detection.confidence),
            KidneyClass::Normal => self.normal.push(detection.confidence),
        }
        Some(class)
    }

    pub fn stone_count(&self) -> u32 {
        self.stone.count
    }

    pub fn normal_count(&self) -> u32 {
        self.normal.count
    }

    pub fn verdict(&self) -> Verdict {
        if let Some(average_confidence) = self.stone.mean() {
            Verdict::StoneDetected { average_confidence }
        } else if let Some(average_confidence) = self.normal.mean() {
            Verdict::NormalKidney { average_confidence }
        } else {
            Verdict::NoneDetected
        }
    }
}

/// Verdict for a detection set without drawing anything.
///
/// Detections that fail [`Detection::validate`] are ignored. Image bounds are
/// not known here, so a box lying entirely outside the image still counts;
/// use [`aggregate_in_image`] to get the verdict the annotation pass produces.
pub fn aggregate(detections: &[Detection]) -> Verdict {
    let mut acc = VerdictAccumulator::new();
    for detection in detections.iter().filter(|d| d.validate().is_ok()) {
        acc.push(detection);
    }
    acc.verdict()
}

/// Verdict for detections on a `width` x `height` image, skipping the same
/// detections the annotation pass skips
pub fn aggregate_in_image(detections: &[Detection], width: u32, height: u32) -> Verdict {
    let mut acc = VerdictAccumulator::new();
    for detection in detections.iter().filter(|d| d.pixel_box(width, height).is_ok()) {
        acc.push(detection);
    }
    acc.verdict()
}
