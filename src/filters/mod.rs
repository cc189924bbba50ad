pub mod background;
pub mod basic;
pub mod face;
pub mod gradient;
pub mod overlay;

use std::{fmt, sync::Arc};

use crate::{config::AppConfig, error::FilterError, types::Frame};

use self::{
    background::KnnBackgroundSubtractor,
    basic::{ChannelSwap, Grayscale, HorizontalFlip, Negative, Pixelate, VerticalFlip},
    face::FaceDetector,
    gradient::{CannyEdges, Sobel},
    overlay::Timestamp,
};

/// Single-method frame transform.
///
/// Implementations must accept both gray and color frames and return a frame
/// with the same width and height; the channel count may change. Stateful
/// implementations keep their state behind a lock and are non-reentrant per
/// instance: concurrent callers are serialized.
pub trait Transform: Send + Sync + 'static {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterId {
    Grayscale,
    VerticalFlip,
    HorizontalFlip,
    Negative,
    ChannelSwap,
    Timestamp,
    FaceDetection,
    SubtractBackground,
    Sobel,
    Pixelated,
    Edges,
}

impl FilterId {
    pub const ALL: [FilterId; 11] = [
        FilterId::Grayscale,
        FilterId::VerticalFlip,
        FilterId::HorizontalFlip,
        FilterId::Negative,
        FilterId::ChannelSwap,
        FilterId::Timestamp,
        FilterId::FaceDetection,
        FilterId::SubtractBackground,
        FilterId::Sobel,
        FilterId::Pixelated,
        FilterId::Edges,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterId::Grayscale => "Grayscale",
            FilterId::VerticalFlip => "Vertical Flip",
            FilterId::HorizontalFlip => "Horizontal Flip",
            FilterId::Negative => "Negative",
            FilterId::ChannelSwap => "BGR",
            FilterId::Timestamp => "Timestamp",
            FilterId::FaceDetection => "Face Detection",
            FilterId::SubtractBackground => "Subtract background",
            FilterId::Sobel => "Sobel",
            FilterId::Pixelated => "Pixelated",
            FilterId::Edges => "Edges",
        }
    }
}

struct FilterInner {
    id: FilterId,
    transform: Box<dyn Transform>,
}

/// Shared handle to one registered transform.
///
/// Cloning is cheap and equality is identity: two handles are equal only if
/// they point at the same registry entry.
#[derive(Clone)]
pub struct Filter {
    inner: Arc<FilterInner>,
}

impl Filter {
    pub fn new<T: Transform>(id: FilterId, transform: T) -> Self {
        Self {
            inner: Arc::new(FilterInner {
                id,
                transform: Box::new(transform),
            }),
        }
    }

    pub fn id(&self) -> FilterId {
        self.inner.id
    }

    pub fn label(&self) -> &'static str {
        self.inner.id.label()
    }

    pub fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        self.inner.transform.apply(frame)
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Filter {}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The fixed catalog of filters, built once per process.
pub struct FilterRegistry {
    filters: Vec<Filter>,
}

impl FilterRegistry {
    pub fn new(config: &AppConfig) -> Self {
        let filters = FilterId::ALL
            .iter()
            .map(|&id| match id {
                FilterId::Grayscale => Filter::new(id, Grayscale),
                FilterId::VerticalFlip => Filter::new(id, VerticalFlip),
                FilterId::HorizontalFlip => Filter::new(id, HorizontalFlip),
                FilterId::Negative => Filter::new(id, Negative),
                FilterId::ChannelSwap => Filter::new(id, ChannelSwap),
                FilterId::Timestamp => Filter::new(id, Timestamp::default()),
                FilterId::FaceDetection => Filter::new(
                    id,
                    FaceDetector::load(&config.face_model_path, config.face.clone()),
                ),
                FilterId::SubtractBackground => Filter::new(
                    id,
                    KnnBackgroundSubtractor::new(config.background.clone()),
                ),
                FilterId::Sobel => Filter::new(id, Sobel),
                FilterId::Pixelated => Filter::new(id, Pixelate::default()),
                FilterId::Edges => Filter::new(id, CannyEdges::default()),
            })
            .collect::<Vec<_>>();

        log::info!("filter registry ready with {} filters", filters.len());
        Self { filters }
    }

    /// Every registered filter, always in the same order.
    pub fn get_all_filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn find(&self, id: FilterId) -> Option<Filter> {
        self.filters.iter().find(|f| f.id() == id).cloned()
    }
}

/// Registry whose face model path never resolves, so tests stay offline.
#[cfg(test)]
pub(crate) fn test_registry() -> FilterRegistry {
    let config = AppConfig {
        face_model_path: std::path::PathBuf::from("does-not-exist/face.onnx"),
        ..AppConfig::default()
    };
    FilterRegistry::new(&config)
}
